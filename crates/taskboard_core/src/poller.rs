use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Fixed-interval background timer. The tick closure runs on a worker
/// thread every `period` until the handle is stopped or dropped.
pub struct Poller {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Replaces whatever poller currently occupies `slot`, stopping it
    /// first, so an application instance never runs stacked timers.
    pub fn restart<F>(slot: &mut Option<Poller>, period: Duration, tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        *slot = Some(Self::start(period, tick));
    }

    /// Signals the worker and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
