// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-flight execution: at most one instance of an operation runs at a
// time and every concurrent caller receives its outcome.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Coalesces concurrent calls into one shared in-flight future.
///
/// The slot is cleared once the flight resolves, so the next call after that
/// starts a fresh one.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<Flight<T>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Join the flight in progress, or start one with `start`.
    ///
    /// `start` is only called when no flight is in progress.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(flight) => flight.clone(),
                None => {
                    let flight = start().boxed().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        outcome
    }

    /// Wait for the flight in progress, if any, without starting one.
    pub async fn wait(&self) {
        let flight = self.lock().clone();
        if let Some(flight) = flight {
            flight.await;
        }
    }

    pub fn in_flight(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Flight<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let flight = Arc::new(SingleFlight::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let runs = Arc::clone(&runs);
                tokio::spawn(async move {
                    flight
                        .run(move || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            7
                        })
                        .await
                })
            })
            .collect();

        for caller in callers {
            assert_eq!(caller.await.unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flight.in_flight());
    }

    #[tokio::test]
    async fn slot_clears_after_completion() {
        let flight = SingleFlight::<u32>::new();
        assert_eq!(flight.run(|| async { 1 }).await, 1);
        assert_eq!(flight.run(|| async { 2 }).await, 2);
    }

    #[tokio::test]
    async fn wait_blocks_until_flight_resolves() {
        let flight = Arc::new(SingleFlight::<u32>::new());
        let done = Arc::new(AtomicUsize::new(0));

        let runner = {
            let flight = Arc::clone(&flight);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                flight
                    .run(move || async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        done.store(1, Ordering::SeqCst);
                        1
                    })
                    .await
            })
        };

        while !flight.in_flight() {
            tokio::task::yield_now().await;
        }
        flight.wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn wait_without_flight_returns_immediately() {
        SingleFlight::<u32>::new().wait().await;
    }
}
