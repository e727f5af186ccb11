//! Debounced background flushing.
//!
//! Every successful write pushes a deadline `interval` into the future.
//! A worker thread sleeps on a condvar until the deadline passes without
//! another write, then runs the flush callback.
//!
//! ```text
//!   touch ─┐   touch ─┐        (quiet for `interval`)
//!          ▼          ▼                   ▼
//!   ───────●──────────●───────────────────■ flush
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::common::Result;

#[derive(Debug, Default)]
struct FlushState {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<FlushState>,
    wake: Condvar,
}

/// Background flusher owning one worker thread.
///
/// # Thread Safety
/// [`touch`](Flusher::touch) may be called from any thread. Dropping the
/// flusher stops the worker without a final flush.
#[derive(Debug)]
pub(crate) struct Flusher {
    shared: Arc<Shared>,
    interval: Duration,
    worker: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Start the worker thread.
    pub(crate) fn spawn<F>(interval: Duration, flush: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("tabledb-flusher".into())
            .spawn(move || run(&worker_shared, flush))?;

        Ok(Self {
            shared,
            interval,
            worker: Some(worker),
        })
    }

    /// Record a write, pushing the flush deadline back.
    pub(crate) fn touch(&self) {
        let mut state = self.shared.state.lock();
        state.deadline = Some(Instant::now() + self.interval);
        self.shared.wake.notify_one();
    }

    /// Stop the worker and wait for it to exit.
    pub(crate) fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.wake.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("flusher thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<F>(shared: &Shared, flush: F)
where
    F: Fn() -> Result<()>,
{
    let mut state = shared.state.lock();
    while !state.shutdown {
        match state.deadline {
            None => shared.wake.wait(&mut state),
            Some(deadline) if Instant::now() < deadline => {
                shared.wake.wait_until(&mut state, deadline);
            }
            Some(_) => {
                state.deadline = None;
                MutexGuard::unlocked(&mut state, || match flush() {
                    Ok(()) => debug!("background flush complete"),
                    Err(e) => error!(error = %e, "background flush failed"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(interval: Duration) -> (Flusher, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let flusher = Flusher::spawn(interval, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        (flusher, count)
    }

    #[test]
    fn test_flushes_after_quiet_period() {
        let (flusher, count) = counting(Duration::from_millis(20));
        flusher.touch();

        let start = Instant::now();
        while count.load(Ordering::SeqCst) == 0 && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_writes_coalesce() {
        let (flusher, count) = counting(Duration::from_millis(200));
        for _ in 0..5 {
            flusher.touch();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        thread::sleep(Duration::from_millis(600));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idle_flusher_never_flushes() {
        let (mut flusher, count) = counting(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(30));
        flusher.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
