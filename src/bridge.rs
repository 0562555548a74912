//! Synchronous calls into the single owner context.
//!
//! World state may only be touched from one thread. Caller threads package
//! their work as a closure, push it onto a FIFO queue with an [`OwnerHandle`],
//! and block on a [`PendingCall`] until the owner has run it. The owner side
//! is either a dedicated [`OwnerThread`] or a host loop that pumps an
//! [`OwnerQueue`] itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};

use crate::error::{panic_message, AppError};

type Job<W> = Box<dyn FnOnce(&mut W) + Send>;

// ── Result cell ─────────────────────────────────────────────────

enum Slot<T> {
    Empty,
    Ready(T),
    Taken,
}

/// Single-assignment result cell shared between a caller and the owner.
///
/// Only the first `fulfill` is stored; later ones are ignored.
pub struct PendingCall<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> PendingCall<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            ready: Condvar::new(),
        }
    }

    /// Store `value` if nothing was stored yet. Returns whether it was stored.
    pub fn fulfill(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return false;
        }
        *slot = Slot::Ready(value);
        self.ready.notify_all();
        true
    }

    /// Block until a value arrives or `timeout` elapses. `None` waits forever.
    /// The value can be taken once; a second wait sees nothing.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<T> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slot = self.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(value) => return Some(value),
                Slot::Taken => return None,
                Slot::Empty => *slot = Slot::Empty,
            }
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut slot, deadline).timed_out() {
                        return match std::mem::replace(&mut *slot, Slot::Taken) {
                            Slot::Ready(value) => Some(value),
                            // Leave the slot open so the owner can still
                            // fulfill it; the late value is simply dropped.
                            Slot::Empty => {
                                *slot = Slot::Empty;
                                None
                            }
                            Slot::Taken => None,
                        };
                    }
                }
                None => self.ready.wait(&mut slot),
            }
        }
    }
}

impl<T> Default for PendingCall<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fulfills the cell with `OwnerUnavailable` if a job is dropped unrun
/// (queue torn down, owner shut down).
struct CompletionGuard<T> {
    cell: Arc<PendingCall<Result<T, AppError>>>,
}

impl<T> CompletionGuard<T> {
    fn complete(self, value: Result<T, AppError>) {
        self.cell.fulfill(value);
    }
}

impl<T> Drop for CompletionGuard<T> {
    fn drop(&mut self) {
        self.cell.fulfill(Err(AppError::OwnerUnavailable));
    }
}

// ── Queue and handle ────────────────────────────────────────────

/// Create a connected handle/queue pair.
pub fn owner_channel<W: 'static>(default_timeout: Option<Duration>) -> (OwnerHandle<W>, OwnerQueue<W>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        OwnerHandle {
            tx,
            default_timeout,
        },
        OwnerQueue { rx },
    )
}

/// Caller-side handle. Cheap to clone; one per connection is fine.
pub struct OwnerHandle<W> {
    tx: Sender<Job<W>>,
    default_timeout: Option<Duration>,
}

impl<W> Clone for OwnerHandle<W> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

impl<W: 'static> OwnerHandle<W> {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Run `f` on the owner and block for its result using the default timeout.
    pub fn call<T, F>(&self, operation: &str, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut W) -> T + Send + 'static,
    {
        self.submit_and_wait(operation, f, self.default_timeout)
    }

    /// Enqueue `f` on the owner queue and block until it has run or
    /// `timeout` elapses (`None` waits forever).
    ///
    /// A panic inside `f` is caught on the owner and returned as
    /// [`AppError::OwnerFault`]. After a timeout the job still runs; its
    /// result is discarded.
    pub fn submit_and_wait<T, F>(
        &self,
        operation: &str,
        f: F,
        timeout: Option<Duration>,
    ) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut W) -> T + Send + 'static,
    {
        let cell = Arc::new(PendingCall::<Result<T, AppError>>::new());
        let guard = CompletionGuard {
            cell: Arc::clone(&cell),
        };
        let op = operation.to_string();

        let job: Job<W> = Box::new(move |world: &mut W| {
            let outcome = catch_unwind(AssertUnwindSafe(|| f(world)));
            let result = outcome.map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(operation = %op, %message, "owner task panicked");
                AppError::OwnerFault {
                    operation: op.clone(),
                    message,
                }
            });
            guard.complete(result);
        });

        if self.tx.send(job).is_err() {
            // Receiver gone; the returned job was dropped and its guard fired.
            return Err(AppError::OwnerUnavailable);
        }

        match cell.wait(timeout) {
            Some(result) => result,
            None => {
                let timeout_ms = timeout
                    .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                    .unwrap_or(u64::MAX);
                tracing::warn!(operation, timeout_ms, "owner call timed out");
                Err(AppError::BridgeTimeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}

/// Owner-side end of the queue.
pub struct OwnerQueue<W> {
    rx: Receiver<Job<W>>,
}

impl<W> OwnerQueue<W> {
    /// Run every job queued right now. Returns how many ran.
    pub fn drain(&self, world: &mut W) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job(world);
            ran += 1;
        }
        ran
    }

    /// Like [`drain`](Self::drain) but stops starting new jobs once `budget`
    /// has elapsed. At least one queued job always runs.
    pub fn drain_with_budget(&self, world: &mut W, budget: Duration) -> usize {
        let start = Instant::now();
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(job) => {
                    job(world);
                    ran += 1;
                    if start.elapsed() >= budget {
                        break;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Block for the next job and run it. Returns `false` once every handle
    /// has been dropped.
    pub fn run_one(&self, world: &mut W) -> bool {
        match self.rx.recv() {
            Ok(job) => {
                job(world);
                true
            }
            Err(_) => false,
        }
    }
}

// ── Dedicated owner thread ──────────────────────────────────────

/// A thread that owns `W` and runs queued jobs one at a time in FIFO order.
pub struct OwnerThread {
    shutdown: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl OwnerThread {
    pub fn spawn<W: Send + 'static>(
        mut world: W,
        default_timeout: Option<Duration>,
    ) -> Result<(OwnerHandle<W>, OwnerThread), AppError> {
        let (handle, queue) = owner_channel(default_timeout);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let join = std::thread::Builder::new()
            .name("owner".into())
            .spawn(move || {
                tracing::debug!("owner thread started");
                loop {
                    crossbeam_channel::select! {
                        recv(queue.rx) -> msg => match msg {
                            Ok(job) => job(&mut world),
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                // Dropping `queue` here drops any jobs still queued, which
                // fulfills their callers with OwnerUnavailable.
                tracing::debug!(dropped = queue.pending(), "owner thread stopped");
            })?;

        Ok((
            handle,
            OwnerThread {
                shutdown: shutdown_tx,
                join: Some(join),
            },
        ))
    }

    /// Stop after the job currently running and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("owner thread terminated abnormally");
            }
        }
    }
}

impl Drop for OwnerThread {
    fn drop(&mut self) {
        self.stop();
    }
}
