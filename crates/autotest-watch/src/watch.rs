use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use autotest_notify::{DesktopNotifier, Notifier};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::WatchConfig;
use crate::event::ChangeEvent;
use crate::reactor::{ChangeReactor, RunReport};
use crate::runner::{CommandRunner, RunnerError};

/// Everything the loop thread waits on.
#[derive(Debug)]
pub enum Signal {
    Fs(notify::Result<notify::Event>),
    Interrupt,
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to watch {}: {source}", .path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("file watcher failed: {0}")]
    Failed(#[source] notify::Error),
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Stops a [`WatchLoop`] from another thread, e.g. a Ctrl-C handler.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: Sender<Signal>,
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Signal::Interrupt);
    }
}

/// Keeps a reactor subscribed to a recursive watch of the project root,
/// rebuilding both whenever the watch dies, until interrupted.
///
/// The notifier is resolved once and shared by every rebuilt reactor.
pub struct WatchLoop<N = DesktopNotifier> {
    config: WatchConfig,
    notifier: N,
    interrupted: Arc<AtomicBool>,
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
}

impl WatchLoop {
    pub fn new(config: WatchConfig) -> Self {
        let notifier = if config.notifications {
            DesktopNotifier::detect()
        } else {
            DesktopNotifier::disabled()
        };
        Self::with_notifier(config, notifier)
    }
}

impl<N: Notifier + Clone> WatchLoop<N> {
    pub fn with_notifier(config: WatchConfig, notifier: N) -> Self {
        let (tx, rx) = channel();
        Self {
            config,
            notifier,
            interrupted: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            tx: self.tx.clone(),
            flag: Arc::clone(&self.interrupted),
        }
    }

    /// Block until interrupted. `on_report` sees every notified run.
    ///
    /// Watch failures restart the loop with a fresh reactor; only a test
    /// command that cannot be launched ends it with an error.
    pub fn run<F: FnMut(&RunReport)>(&self, mut on_report: F) -> Result<(), RunnerError> {
        loop {
            let reactor = ChangeReactor::new(
                &self.config,
                self.notifier.clone(),
                CommandRunner::from_config(&self.config),
            )
            .with_interrupt_flag(Arc::clone(&self.interrupted));
            if let Some(report) = reactor.run(None)? {
                on_report(&report);
            }

            match self.watch(&reactor, &mut on_report) {
                Ok(()) => return Ok(()),
                Err(WatchError::Runner(e)) => return Err(e),
                Err(e) => {
                    tracing::error!("{e}; restarting watch");
                    std::thread::sleep(self.config.restart_delay);
                    if self.drain_stale() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Subscribe `reactor` and dispatch events one at a time. Returns `Ok`
    /// on interrupt; the watcher is dropped on every exit path.
    fn watch<F: FnMut(&RunReport)>(
        &self,
        reactor: &ChangeReactor<N>,
        on_report: &mut F,
    ) -> Result<(), WatchError> {
        let tx = self.tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = tx.send(Signal::Fs(res));
            },
            notify::Config::default(),
        )
        .map_err(WatchError::Create)?;
        watcher
            .watch(&self.config.root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Subscribe {
                path: self.config.root.clone(),
                source,
            })?;
        tracing::info!("Watching {}", self.config.root.display());

        loop {
            match self.rx.recv() {
                Ok(Signal::Interrupt) | Err(_) => {
                    tracing::info!("Stopping watch");
                    return Ok(());
                }
                Ok(Signal::Fs(Ok(event))) => {
                    let Some(change) = ChangeEvent::from_notify(&event) else {
                        continue;
                    };
                    if let Some(report) = reactor.react(&change)? {
                        on_report(&report);
                    }
                }
                Ok(Signal::Fs(Err(e))) => return Err(WatchError::Failed(e)),
            }
        }
    }

    /// Discard events left over from a dead watcher. Returns `true` if an
    /// interrupt was among them.
    fn drain_stale(&self) -> bool {
        let mut interrupted = false;
        while let Ok(signal) = self.rx.try_recv() {
            if matches!(signal, Signal::Interrupt) {
                interrupted = true;
            }
        }
        interrupted
    }
}
