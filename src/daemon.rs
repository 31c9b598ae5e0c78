//! Daemon mode.
//!
//! Double fork, new session, standard streams to `/dev/null`, then drop to
//! the configured unprivileged user when started as root. Must run before the
//! tokio runtime is built.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, info, warn};

use crate::config::GeneralConfig;
use crate::error::{Error, Result};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to PID file.
    pub pid_file: Option<PathBuf>,
    /// Working directory.
    pub work_dir: PathBuf,
    /// User to switch to when started as root.
    pub user: Option<String>,
    /// Umask for created files.
    pub umask: Option<u32>,
    /// Redirect standard streams to `/dev/null`.
    pub close_fds: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: None,
            work_dir: PathBuf::from("/"),
            user: None,
            umask: Some(0o027),
            close_fds: true,
        }
    }
}

impl DaemonConfig {
    pub fn from_general(general: &GeneralConfig) -> Self {
        Self {
            pid_file: general.pid_file.clone(),
            user: (!general.user.is_empty()).then(|| general.user.clone()),
            ..Default::default()
        }
    }
}

/// Refuse to start over a live PID file; clear a stale one.
pub fn check_pid_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if let Some(pid) = fs::read_to_string(path)
        .ok()
        .and_then(|content| content.trim().parse::<i32>().ok())
    {
        if pid as u32 != process::id() && is_process_running(pid) {
            return Err(Error::Config(format!(
                "Gateway already running with PID {} (from {})",
                pid,
                path.display()
            )));
        }
    }
    warn!("Removing stale PID file {}", path.display());
    if let Err(e) = fs::remove_file(path) {
        warn!("Could not remove stale PID file {}: {}", path.display(), e);
    }
    Ok(())
}

/// Daemonize the current process.
///
/// The PID file is written as the starting user, before privileges are
/// dropped, and handed over to the configured user.
#[cfg(unix)]
pub fn daemonize(config: &DaemonConfig) -> Result<Option<PidFileGuard>> {
    use nix::sys::stat;
    use nix::unistd::{chdir, fork, setsid, ForkResult};
    use std::os::unix::io::AsRawFd;

    if let Some(ref pid_file) = config.pid_file {
        check_pid_file(pid_file)?;
    }

    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(Error::Config(format!("Couldn't fork(): {}", e))),
    }

    setsid().map_err(|e| Error::Config(format!("Couldn't setsid(): {}", e)))?;

    // Second fork so the session can never reacquire a terminal.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(Error::Config(format!("Couldn't fork(): {}", e))),
    }

    if let Some(mask) = config.umask {
        stat::umask(stat::Mode::from_bits_truncate(mask as libc::mode_t));
    }

    chdir(&config.work_dir).map_err(|e| Error::Config(format!("Couldn't cd /: {}", e)))?;

    if config.close_fds {
        let devnull = File::open("/dev/null")
            .map_err(|e| Error::Config(format!("Failed to open /dev/null: {}", e)))?;
        let fd = devnull.as_raw_fd();

        unsafe {
            libc::dup2(fd, 0);
            libc::dup2(fd, 1);
            libc::dup2(fd, 2);
        }
    }

    let pid_file = create_pid_file(config)?;

    if let Some(ref user) = config.user {
        drop_privileges(user, pid_file.as_ref().map(PidFileGuard::path))?;
    }

    info!("Daemonized (PID: {})", process::id());
    Ok(pid_file)
}

#[cfg(not(unix))]
pub fn daemonize(_config: &DaemonConfig) -> Result<Option<PidFileGuard>> {
    Err(Error::Config(
        "Daemon mode is not supported on this platform".into(),
    ))
}

/// Write the configured PID file, if any.
pub fn create_pid_file(config: &DaemonConfig) -> Result<Option<PidFileGuard>> {
    config.pid_file.as_ref().map(PidFileGuard::new).transpose()
}

/// Switch to `user` if running as root; a no-op otherwise.
///
/// `pid_file` is chowned to the user first so it stays writable.
#[cfg(unix)]
fn drop_privileges(user: &str, pid_file: Option<&Path>) -> Result<()> {
    use nix::unistd::{chown, setgid, setuid, Uid, User};

    if !Uid::effective().is_root() {
        return Ok(());
    }

    let account = User::from_name(user)
        .map_err(|e| Error::Config(format!("Could not look up user {}: {}", user, e)))?
        .ok_or_else(|| Error::Config(format!("Could not get the {} user", user)))?;

    if let Some(path) = pid_file {
        chown(path, Some(account.uid), Some(account.gid)).map_err(|e| {
            Error::Config(format!("Could not chown {} to {}: {}", path.display(), user, e))
        })?;
    }

    // Group first: it can't be changed once the user is dropped.
    setgid(account.gid).map_err(|e| Error::Config(format!("Could not set {} GID: {}", user, e)))?;
    setuid(account.uid).map_err(|e| Error::Config(format!("Could not set {} UID: {}", user, e)))?;

    if setuid(Uid::from_raw(0)).is_ok() {
        return Err(Error::Config(
            "It's possible to regain root - something is wrong!".into(),
        ));
    }

    info!("Running as {} (uid={}, gid={})", user, account.uid, account.gid);
    Ok(())
}

/// Write the current PID to a file.
pub fn write_pid_file(path: &Path) -> Result<()> {
    let pid = process::id();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create PID file directory: {}", e)))?;
    }

    let mut file = File::create(path)
        .map_err(|e| Error::Config(format!("Failed to create PID file: {}", e)))?;

    writeln!(file, "{}", pid)
        .map_err(|e| Error::Config(format!("Failed to write PID file: {}", e)))?;

    debug!("Wrote PID {} to {}", pid, path.display());
    Ok(())
}

/// Remove the PID file.
pub fn remove_pid_file(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| Error::Config(format!("Failed to remove PID file: {}", e)))?;
        debug!("Removed PID file {}", path.display());
    }
    Ok(())
}

#[cfg(unix)]
fn is_process_running(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    pid > 0 && kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn is_process_running(_pid: i32) -> bool {
    false
}

/// PID file that is removed again on drop.
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        write_pid_file(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if let Err(e) = remove_pid_file(&self.path) {
            warn!("Failed to remove PID file: {}", e);
        }
    }
}
