use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Single-permit gate in front of the upstream connector.
///
/// At most one caller holds the permit at any instant; everyone else queues
/// in strict FIFO order and is admitted oldest-first. Acquisition is
/// non-reentrant: a task that acquires twice without dropping its permit
/// deadlocks itself.
#[derive(Clone)]
pub struct UpstreamGate {
    inner: Arc<Mutex<GateState>>,
}

struct GateState {
    held: bool,
    waiters: VecDeque<oneshot::Sender<GatePermit>>,
}

/// Proof of admission through the gate. Dropping it hands the permit to the
/// longest-waiting caller, or clears the gate if nobody is queued. Release
/// happens on every exit path, including cancellation and panics.
pub struct GatePermit {
    inner: Arc<Mutex<GateState>>,
    armed: bool,
}

impl UpstreamGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateState {
                held: false,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Suspends until the caller holds the permit.
    ///
    /// Cancel-safe: a waiter whose future is dropped loses its queue slot
    /// and the permit moves on to the next waiter.
    pub async fn acquire(&self) -> GatePermit {
        let rx = {
            let mut state = self.lock();

            if !state.held {
                state.held = true;
                return GatePermit {
                    inner: self.inner.clone(),
                    armed: true,
                };
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        // The sender side lives in the waiter queue and is only consumed by
        // a release, which either delivers a permit or skips us if we are
        // already gone. A recv error would mean the queue entry vanished
        // without a release, which release() never does.
        rx.await.expect("gate waiter dropped without release")
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    #[cfg(test)]
    fn is_held(&self) -> bool {
        self.lock().held
    }
}

impl Default for UpstreamGate {
    fn default() -> Self {
        Self::new()
    }
}

fn release(inner: &Arc<Mutex<GateState>>) {
    let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
    debug_assert!(state.held, "gate released without a held permit");

    while let Some(tx) = state.waiters.pop_front() {
        let permit = GatePermit {
            inner: inner.clone(),
            armed: true,
        };
        match tx.send(permit) {
            // Handed to the longest waiter; the gate stays held.
            Ok(()) => return,
            Err(mut unsent) => {
                // Waiter cancelled before admission. Disarm the returned
                // permit so its Drop doesn't re-enter release under the
                // lock, and try the next waiter.
                unsent.armed = false;
            }
        }
    }

    state.held = false;
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if self.armed {
            release(&self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[tokio::test]
    async fn test_acquire_and_release() {
        let gate = UpstreamGate::new();
        assert!(!gate.is_held());

        let permit = gate.acquire().await;
        assert!(gate.is_held());

        drop(permit);
        assert!(!gate.is_held());
    }

    #[tokio::test]
    async fn test_never_admits_two_callers() {
        let gate = UpstreamGate::new();
        let active = Arc::new(AtomicI32::new(0));
        let max_seen = Arc::new(AtomicI32::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let gate = gate.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fifo_admission_order() {
        let gate = UpstreamGate::new();
        let holder = gate.acquire().await;

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        for i in 0..10usize {
            let gate_clone = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate_clone.acquire().await;
                order.lock().unwrap().push(i);
            }));

            // Wait until this waiter is actually queued before spawning the
            // next one, so arrival order is deterministic.
            while gate.pending() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        drop(holder);
        for handle in handles {
            handle.await.unwrap();
        }

        let admitted = order.lock().unwrap().clone();
        assert_eq!(admitted, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_is_skipped() {
        let gate = UpstreamGate::new();
        let holder = gate.acquire().await;

        let cancelled = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
            })
        };
        while gate.pending() < 1 {
            tokio::task::yield_now().await;
        }

        let (second, second_admitted) = {
            let gate = gate.clone();
            let admitted = Arc::new(AtomicI32::new(0));
            let flag = admitted.clone();
            let handle = tokio::spawn(async move {
                let _permit = gate.acquire().await;
                flag.store(1, Ordering::SeqCst);
            });
            (handle, admitted)
        };
        while gate.pending() < 2 {
            tokio::task::yield_now().await;
        }

        cancelled.abort();
        let _ = cancelled.await;

        drop(holder);
        second.await.unwrap();

        assert_eq!(second_admitted.load(Ordering::SeqCst), 1);
        assert!(!gate.is_held());
    }
}
