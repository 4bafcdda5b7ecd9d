use std::{
    sync::{mpsc::RecvTimeoutError, Arc, Condvar, Mutex},
    time::Duration,
};

use rand::{thread_rng, Rng};

use crate::{fetcher::FlagFetcher, Error, Result};

/// A background thread that periodically refreshes the flag cache.
///
/// Use [`Client::start_poller_thread`](crate::Client::start_poller_thread) to get an instance of
/// it. The thread runs for as long as this handle is alive: dropping the handle stops it at the
/// next tick.
pub struct PollerThread {
    join_handle: std::thread::JoinHandle<()>,

    /// Used to send a stop command to the poller thread.
    stop_sender: std::sync::mpsc::Sender<()>,

    /// Holds `None` until the first refresh attempt completes, then the outcome of the latest
    /// attempt.
    result: Arc<(Mutex<Option<Result<()>>>, Condvar)>,
}

/// Default interval between refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

impl PollerThread {
    pub(crate) fn start(fetcher: Arc<FlagFetcher>, interval: Duration) -> Result<PollerThread> {
        let (stop_sender, stop_receiver) = std::sync::mpsc::channel::<()>();

        let result = Arc::new((Mutex::new(None), Condvar::new()));

        let join_handle = {
            // Cloning Arc for move into thread
            let result = Arc::clone(&result);
            let update_result = move |value| {
                if let Ok(mut slot) = result.0.lock() {
                    *slot = Some(value);
                }
                result.1.notify_all();
            };

            std::thread::Builder::new()
                .name("setbit-poller".to_owned())
                .spawn(move || loop {
                    let timeout = jitter(interval);
                    match stop_receiver.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {
                            // Timed out. Fall through to refresh.
                        }
                        Ok(()) => {
                            log::debug!(target: "setbit", "poller thread received stop command");
                            // The other end asked us to stop the poller thread.
                            return;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            // The PollerThread handle was dropped without stopping the thread.
                            // Nobody can stop or observe us anymore, so exit and release the
                            // fetcher.
                            log::debug!(target: "setbit", "poller thread handle dropped, stopping");
                            return;
                        }
                    }

                    log::debug!(target: "setbit", "refreshing flags");
                    match fetcher.load() {
                        Ok(_) => update_result(Ok(())),
                        Err(Error::Unauthorized) => {
                            log::warn!(target: "setbit", "client is not authorized, stopping poller thread");
                            update_result(Err(Error::Unauthorized));
                            // Unauthorized means that API key is not valid and thus is not
                            // recoverable. Stop the poller thread.
                            return;
                        }
                        Err(err) => {
                            // Keep serving the previous snapshot; we'll try again later.
                            log::warn!(target: "setbit", "failed to refresh flags, keeping previous flag set: {}", err);
                            update_result(Err(err));
                        }
                    }
                })?
        };

        Ok(PollerThread {
            join_handle,
            stop_sender,
            result,
        })
    }

    /// Block until the first refresh attempt has finished, then return the latest outcome.
    ///
    /// Once any refresh has been attempted, this returns the stored outcome without waiting.
    pub fn wait_for_refresh(&self) -> Result<()> {
        let mut lock = self
            .result
            .0
            .lock()
            .map_err(|_| Error::PollerThreadPanicked)?;
        loop {
            match &*lock {
                Some(result) => return result.clone(),
                None => {
                    lock = self
                        .result
                        .1
                        .wait(lock)
                        .map_err(|_| Error::PollerThreadPanicked)?;
                }
            }
        }
    }

    /// Returns `true` once the thread has exited (stopped, or gave up on an invalid API key).
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Stop the poller thread.
    ///
    /// This function does not wait for the thread to actually stop.
    pub fn stop(&self) {
        // Error means that the receiver was dropped (thread exited). Ignoring it as there's nothing
        // useful we can do.
        let _ = self.stop_sender.send(());
    }

    /// Stop the poller thread and block waiting for it to exit.
    ///
    /// If you don't need to wait for the thread to exit, use [`PollerThread::stop`] instead.
    pub fn shutdown(self) -> Result<()> {
        // Send stop signal in case it wasn't sent before.
        self.stop();

        // Error means that the thread has panicked and there's nothing useful we can do in that
        // case.
        self.join_handle
            .join()
            .map_err(|_| Error::PollerThreadPanicked)?;

        Ok(())
    }
}

/// Apply a random jitter of up to 10% to `interval`.
fn jitter(interval: Duration) -> Duration {
    let max_jitter = interval / 10;
    if max_jitter.is_zero() {
        return interval;
    }
    interval + thread_rng().gen_range(Duration::ZERO..max_jitter)
}
