//! Signal handling.
//!
//! - SIGTERM/SIGINT stop the gateway loop
//! - SIGHUP re-reads the DMR ID table

use std::future::Future;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::lookup::IdLookup;

/// Signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Terminate signal (SIGTERM).
    Terminate,
    /// Interrupt signal (SIGINT).
    Interrupt,
    /// Hangup signal (SIGHUP).
    Hangup,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Terminate => write!(f, "SIGTERM"),
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Hangup => write!(f, "SIGHUP"),
        }
    }
}

/// Turns process signals into a shutdown request or an ID table reload.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    shutdown: watch::Sender<bool>,
    lookup: Option<IdLookup>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            lookup: None,
        }
    }

    /// Reload `lookup` on SIGHUP.
    pub fn with_lookup(mut self, lookup: IdLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Completes once shutdown has been requested.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown.subscribe();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }

    async fn handle_signal(&self, signal: Signal) {
        info!("Received signal: {}", signal);

        match signal {
            Signal::Terminate | Signal::Interrupt => self.request_shutdown(),
            Signal::Hangup => match &self.lookup {
                Some(lookup) => match lookup.reload().await {
                    Ok(count) => info!("Reloaded {} DMR IDs", count),
                    Err(e) => warn!("DMR ID reload failed, keeping previous table: {}", e),
                },
                None => info!("No DMR ID file to reload"),
            },
        }
    }

    /// Listen until a termination signal arrives.
    #[cfg(unix)]
    pub async fn listen(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let streams = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        );
        let (mut term, mut int, mut hup) = match streams {
            (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                error!("Failed to register signal handlers: {}", e);
                return;
            }
        };

        loop {
            let signal = tokio::select! {
                _ = term.recv() => Signal::Terminate,
                _ = int.recv() => Signal::Interrupt,
                _ = hup.recv() => Signal::Hangup,
            };
            self.handle_signal(signal).await;
            if signal != Signal::Hangup {
                break;
            }
        }
    }

    #[cfg(not(unix))]
    pub async fn listen(&self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => self.handle_signal(Signal::Interrupt).await,
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_signal_display() {
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
        assert_eq!(Signal::Hangup.to_string(), "SIGHUP");
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let handler = SignalHandler::new();
        let shutdown = handler.shutdown_signal();
        assert!(!handler.is_shutdown());

        let remote = handler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.handle_signal(Signal::Terminate).await;
        });

        tokio::time::timeout(Duration::from_millis(500), shutdown)
            .await
            .expect("shutdown should complete");
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn test_hangup_reloads_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1234567 G4KLX").unwrap();
        let lookup = IdLookup::load(file.path()).unwrap();
        let handler = SignalHandler::new().with_lookup(lookup.clone());

        writeln!(file, "2345678 M1ABC").unwrap();
        file.flush().unwrap();
        handler.handle_signal(Signal::Hangup).await;

        assert_eq!(lookup.len(), 2);
        assert!(!handler.is_shutdown());
    }
}
