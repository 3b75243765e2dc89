use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, error};

use crate::core::error::{InstallerError, InstallerResult};

/// Upper bound for the `chmod` helper.
pub const CHMOD_TIMEOUT: Duration = Duration::from_secs(10);

/// Copies `source` into `destination`, creating every directory before its
/// contents and replacing files that already exist. Permission bits travel
/// with each file.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> InstallerResult<()> {
    std::fs::create_dir_all(destination)
        .map_err(|source_err| InstallerError::io(destination, source_err))?;

    for entry in
        std::fs::read_dir(source).map_err(|source_err| InstallerError::io(source, source_err))?
    {
        let entry = entry.map_err(|source_err| InstallerError::io(source, source_err))?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|source_err| InstallerError::io(&src_path, source_err))?;

        if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            if dst_path.is_dir() {
                delete_dir_recursive(&dst_path)?;
            }
            std::fs::copy(&src_path, &dst_path)
                .map_err(|source_err| InstallerError::io(&dst_path, source_err))?;
        }
    }

    Ok(())
}

/// Deletes a directory tree depth-first: files on the way down, each
/// directory once it is empty.
pub fn delete_dir_recursive(path: &Path) -> InstallerResult<()> {
    for entry in std::fs::read_dir(path).map_err(|e| InstallerError::io(path, e))? {
        let entry = entry.map_err(|e| InstallerError::io(path, e))?;
        let child = entry.path();
        let file_type = entry.file_type().map_err(|e| InstallerError::io(&child, e))?;

        // Symlinks are removed, never followed.
        if file_type.is_dir() {
            delete_dir_recursive(&child)?;
        } else {
            std::fs::remove_file(&child).map_err(|e| InstallerError::io(&child, e))?;
        }
    }

    std::fs::remove_dir(path).map_err(|e| InstallerError::io(path, e))
}

/// Whether `path` is a macOS-style bundle directory.
pub fn is_bundle(path: &Path) -> bool {
    path.is_dir()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("app"))
            .unwrap_or(false)
}

/// Removes a shortcut: bundles recursively, anything else as a single file.
pub fn remove_shortcut(path: &Path) -> InstallerResult<()> {
    if is_bundle(path) {
        delete_dir_recursive(path)
    } else {
        std::fs::remove_file(path).map_err(|e| InstallerError::io(path, e))
    }
}

/// Copies a bundled resource into `target_dir` under `file_name`.
pub fn copy_resource(resource: &Path, target_dir: &Path, file_name: &str) -> InstallerResult<PathBuf> {
    if !resource.is_file() {
        error!("Resource not found: {:?}", resource);
        return Err(InstallerError::MissingResource(resource.to_path_buf()));
    }

    let target = target_dir.join(file_name);
    std::fs::copy(resource, &target).map_err(|e| InstallerError::io(&target, e))?;
    debug!("Copied resource {:?} -> {:?}", resource, target);
    Ok(target)
}

/// Writes a rendered script or desktop entry.
pub fn write_file(dir: &Path, file_name: &str, content: &str) -> InstallerResult<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, content).map_err(|e| InstallerError::io(&path, e))?;
    debug!("Created script: {:?}", path);
    Ok(path)
}

/// Free bytes on the disk holding `path`, picked by the longest matching
/// mount point. `None` when no disk matches.
pub fn available_space(path: &Path) -> Option<u64> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }
    available
}

/// Sets `rwxr-xr-x` directly, without spawning a helper.
#[cfg(unix)]
pub fn set_executable_mode(path: &Path) -> InstallerResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| InstallerError::io(path, e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| InstallerError::io(path, e))
}

#[cfg(not(unix))]
pub fn set_executable_mode(_path: &Path) -> InstallerResult<()> {
    Ok(())
}

/// Runs `chmod +x <path>` with [`CHMOD_TIMEOUT`].
pub async fn make_executable(path: &Path) -> InstallerResult<()> {
    debug!("Attempting to make script executable: {:?}", path);
    let path_arg = path.to_string_lossy();
    run_with_timeout("chmod", &["+x", path_arg.as_ref()], CHMOD_TIMEOUT).await?;
    debug!("Script made executable: {:?}", path);
    Ok(())
}

/// Runs a helper program and waits at most `limit` for it.
///
/// On timeout the child is killed. A non-zero exit yields its captured
/// stderr.
pub async fn run_with_timeout(program: &str, args: &[&str], limit: Duration) -> InstallerResult<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| InstallerError::ProcessFailed {
            program: program.to_string(),
            code: -1,
            stderr: e.to_string(),
        })?;

    let mut stderr_pipe = child.stderr.take();

    let status = match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => status.map_err(|e| InstallerError::ProcessFailed {
            program: program.to_string(),
            code: -1,
            stderr: e.to_string(),
        })?,
        Err(_) => {
            error!("{} process timed out", program);
            let _ = child.kill().await;
            return Err(InstallerError::ProcessTimeout {
                program: program.to_string(),
                seconds: limit.as_secs(),
            });
        }
    };

    if status.success() {
        return Ok(());
    }

    let mut stderr = String::new();
    if let Some(pipe) = stderr_pipe.as_mut() {
        let _ = pipe.read_to_string(&mut stderr).await;
    }
    let code = status.code().unwrap_or(-1);
    error!("{} failed with exit code {}: {}", program, code, stderr.trim());
    Err(InstallerError::ProcessFailed {
        program: program.to_string(),
        code,
        stderr: stderr.trim().to_string(),
    })
}
