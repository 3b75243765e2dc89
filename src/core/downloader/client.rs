use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::events::{Notice, Progress, Reporter};
use crate::core::http::build_http_client;

/// Bytes written (and reported) per step.
pub const CHUNK_SIZE: usize = 4096;

/// One payload to fetch.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub dest: PathBuf,
    /// Size recorded by the pre-flight size request, 0 when unknown. A file already
    /// at `dest` with exactly this size is reused.
    pub expected_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Succeeded { bytes: u64 },
    Failed(String),
    Cancelled,
}

/// Streams a single file to disk with chunked progress and cooperative
/// cancellation.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> InstallerResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Downloads `request.url` into `request.dest`.
    ///
    /// A progress event follows every chunk written. Cancellation is checked
    /// between chunks and leaves the partial file where it is.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        reporter: &Reporter,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        if let Some(bytes) = already_present(&request.dest, request.expected_size) {
            info!("{:?} already downloaded ({} bytes)", request.dest, bytes);
            reporter.notice(Notice::DownloadSkipped {
                file: request.dest.clone(),
            });
            return DownloadOutcome::Succeeded { bytes };
        }

        reporter.notice(Notice::DownloadStarted {
            file: request.dest.clone(),
        });

        match self.stream_to_file(request, reporter, cancel).await {
            Ok(bytes) => {
                info!("Downloaded: {} -> {:?} ({} bytes)", request.url, request.dest, bytes);
                reporter.notice(Notice::DownloadCompleted {
                    file: request.dest.clone(),
                });
                DownloadOutcome::Succeeded { bytes }
            }
            Err(InstallerError::Cancelled) => {
                warn!("Download of {} cancelled", request.url);
                reporter.notice(Notice::DownloadCancelled);
                DownloadOutcome::Cancelled
            }
            Err(e) => {
                error!("Download of {} failed: {}", request.url, e);
                let reason = e.to_string();
                reporter.notice(Notice::DownloadFailed {
                    reason: reason.clone(),
                });
                DownloadOutcome::Failed(reason)
            }
        }
    }

    async fn stream_to_file(
        &self,
        request: &DownloadRequest,
        reporter: &Reporter,
        cancel: &CancellationToken,
    ) -> InstallerResult<u64> {
        if let Some(parent) = request.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::io(parent, e))?;
        }

        let response = self.client.get(&request.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        debug!("GET {} -> {} ({:?} bytes)", request.url, status, total);

        let dest = request.dest.as_path();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InstallerError::io(dest, e))?;

        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE * 2);
        let mut done: u64 = 0;
        let mut exhausted = false;

        loop {
            // Network reads arrive in arbitrary sizes; flush whole chunks.
            while pending.len() >= CHUNK_SIZE || (exhausted && !pending.is_empty()) {
                if cancel.is_cancelled() {
                    file.flush().await.map_err(|e| InstallerError::io(dest, e))?;
                    return Err(InstallerError::Cancelled);
                }
                let len = pending.len().min(CHUNK_SIZE);
                file.write_all(&pending[..len])
                    .await
                    .map_err(|e| InstallerError::io(dest, e))?;
                pending.drain(..len);
                done += len as u64;
                reporter.progress(Progress::Bytes { done, total });
            }

            if exhausted {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    file.flush().await.map_err(|e| InstallerError::io(dest, e))?;
                    return Err(InstallerError::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(piece) => pending.extend_from_slice(&piece?),
                None => exhausted = true,
            }
        }

        file.flush().await.map_err(|e| InstallerError::io(dest, e))?;
        drop(file);

        if done == 0 {
            return Err(InstallerError::EmptyBody(request.url.clone()));
        }
        Ok(done)
    }
}

/// Size of `dest` when it already holds the expected payload.
fn already_present(dest: &Path, expected_size: u64) -> Option<u64> {
    if expected_size == 0 {
        return None;
    }
    let len = std::fs::metadata(dest).ok().filter(|m| m.is_file())?.len();
    (len == expected_size).then_some(len)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::core::events::{drain, InstallEvent};

    fn progress_of(events: &[InstallEvent]) -> Vec<(u64, Option<u64>)> {
        events
            .iter()
            .filter_map(|event| match event {
                InstallEvent::Progress(Progress::Bytes { done, total }) => Some((*done, *total)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn reports_one_event_per_chunk() {
        let body: Vec<u8> = (0..10 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/client.jar")
            .with_status(200)
            .with_body(body.clone())
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/client.jar", server.url()),
            dest: tmp.path().join("client.jar"),
            expected_size: 0,
        };
        let (reporter, mut rx) = Reporter::channel();
        let downloader = Downloader::new().unwrap();

        let outcome = downloader
            .download(&request, &reporter, &CancellationToken::new())
            .await;
        mock.assert_async().await;
        assert_eq!(outcome, DownloadOutcome::Succeeded { bytes: 10_485_760 });

        let progress = progress_of(&drain(&mut rx));
        assert_eq!(progress.len(), 2560);
        assert!(progress.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(
            progress.last().copied(),
            Some((10_485_760, Some(10_485_760)))
        );
        assert_eq!(std::fs::read(&request.dest).unwrap(), body);
    }

    #[tokio::test]
    async fn last_chunk_may_be_short() {
        let body = vec![1u8; CHUNK_SIZE + 100];
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/a.bin")
            .with_body(body)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/a.bin", server.url()),
            dest: tmp.path().join("nested").join("a.bin"),
            expected_size: 0,
        };
        let (reporter, mut rx) = Reporter::channel();
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &CancellationToken::new())
            .await;

        assert_eq!(outcome, DownloadOutcome::Succeeded { bytes: 4196 });
        let done: Vec<u64> = progress_of(&drain(&mut rx)).iter().map(|p| p.0).collect();
        assert_eq!(done, vec![4096, 4196]);
    }

    #[tokio::test]
    async fn existing_file_of_expected_size_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("client.jar");
        std::fs::write(&dest, vec![0u8; 1234]).unwrap();

        let request = DownloadRequest {
            // Nothing listens here; any request would fail.
            url: "http://127.0.0.1:9/client.jar".into(),
            dest: dest.clone(),
            expected_size: 1234,
        };
        let (reporter, mut rx) = Reporter::channel();
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &CancellationToken::new())
            .await;

        assert_eq!(outcome, DownloadOutcome::Succeeded { bytes: 1234 });
        let events = drain(&mut rx);
        assert!(progress_of(&events).is_empty());
        assert!(events.contains(&InstallEvent::Notice(Notice::DownloadSkipped { file: dest })));
    }

    #[tokio::test]
    async fn size_mismatch_downloads_again() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/client.jar")
            .with_body(vec![9u8; 10])
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("client.jar");
        std::fs::write(&dest, b"old").unwrap();

        let request = DownloadRequest {
            url: format!("{}/client.jar", server.url()),
            dest: dest.clone(),
            expected_size: 10,
        };
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &Reporter::silent(), &CancellationToken::new())
            .await;

        mock.assert_async().await;
        assert_eq!(outcome, DownloadOutcome::Succeeded { bytes: 10 });
        assert_eq!(std::fs::read(&dest).unwrap(), vec![9u8; 10]);
    }

    #[tokio::test]
    async fn error_status_fails_with_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jar")
            .with_status(404)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/missing.jar", server.url()),
            dest: tmp.path().join("missing.jar"),
            expected_size: 0,
        };
        let (reporter, mut rx) = Reporter::channel();
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &CancellationToken::new())
            .await;

        match outcome {
            DownloadOutcome::Failed(reason) => assert!(reason.contains("404")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!request.dest.exists());
        assert!(progress_of(&drain(&mut rx)).is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_first_chunk() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/client.jar")
            .with_body(vec![0u8; 3 * CHUNK_SIZE])
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/client.jar", server.url()),
            dest: tmp.path().join("client.jar"),
            expected_size: 0,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (reporter, mut rx) = Reporter::channel();
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &cancel)
            .await;

        assert_eq!(outcome, DownloadOutcome::Cancelled);
        let events = drain(&mut rx);
        assert!(progress_of(&events).is_empty());
        assert!(events.contains(&InstallEvent::Notice(Notice::DownloadCancelled)));
        // The partial (here empty) file stays behind.
        assert!(request.dest.exists());
    }

    #[tokio::test]
    async fn chunked_response_reports_unknown_total() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/client.jar")
            .with_chunked_body(|w| {
                w.write_all(&[3u8; 6000])?;
                w.write_all(&[4u8; 4000])
            })
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/client.jar", server.url()),
            dest: tmp.path().join("client.jar"),
            expected_size: 0,
        };
        let (reporter, mut rx) = Reporter::channel();
        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &CancellationToken::new())
            .await;

        assert_eq!(outcome, DownloadOutcome::Succeeded { bytes: 10_000 });
        assert_eq!(
            progress_of(&drain(&mut rx)),
            vec![(4096, None), (8192, None), (10_000, None)]
        );
        assert_eq!(std::fs::metadata(&request.dest).unwrap().len(), 10_000);
    }

    #[tokio::test]
    async fn cancelling_mid_stream_keeps_partial_file() {
        let body = vec![5u8; 256 * CHUNK_SIZE];
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/client.jar")
            .with_body(body)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            url: format!("{}/client.jar", server.url()),
            dest: tmp.path().join("client.jar"),
            expected_size: 0,
        };
        let cancel = CancellationToken::new();
        let (reporter, mut rx) = Reporter::channel();

        // Cancel as soon as the first chunk is reported, like a user would.
        let listener = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(event) = rx.recv().await {
                    if matches!(event, InstallEvent::Progress(_)) {
                        cancel.cancel();
                    }
                    seen.push(event);
                }
                seen
            })
        };

        let outcome = Downloader::new()
            .unwrap()
            .download(&request, &reporter, &cancel)
            .await;
        drop(reporter);
        let events = listener.await.unwrap();

        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert!(events.contains(&InstallEvent::Notice(Notice::DownloadCancelled)));

        let progress = progress_of(&events);
        let (written, _) = *progress.last().unwrap();
        assert!(written >= CHUNK_SIZE as u64);
        assert!(written < (256 * CHUNK_SIZE) as u64);
        assert_eq!(std::fs::metadata(&request.dest).unwrap().len(), written);
    }
}
