// SPDX-License-Identifier: MIT
// Copyright (c) 2026 anonctl Contributors

//! Compensation stack (spec §9, "Signal-driven cleanup → scoped-acquisition
//! discipline"): every resource the orchestrator acquires is paired with an
//! inverse pushed here after the step succeeds; on abort the stack unwinds
//! in strict reverse order of acquisition.

use std::future::Future;
use std::pin::Pin;

type Compensation = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// A LIFO stack of inverse actions, one pushed per successfully completed
/// pipeline step.
#[derive(Default)]
pub struct CompensationStack {
    actions: Vec<(&'static str, Compensation)>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `label`'s inverse action. Call this immediately after the
    /// forward step it compensates for succeeds.
    pub fn push<F, Fut>(&mut self, label: &'static str, inverse: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.actions.push((label, Box::new(move || Box::pin(inverse()))));
    }

    /// Run every recorded inverse action, most-recently-pushed first.
    pub async fn unwind(mut self) {
        while let Some((label, inverse)) = self.actions.pop() {
            tracing::warn!(step = label, "compensating failed pipeline step");
            inverse().await;
        }
    }

    /// Discard the stack without unwinding — used when the pipeline
    /// completes successfully and every acquired resource should remain
    /// live (spec §4.5).
    pub fn commit(self) {
        drop(self);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn unwinds_in_reverse_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut stack = CompensationStack::new();

        for i in 0..3 {
            let order = order.clone();
            stack.push("step", move || async move {
                order.lock().push(i);
            });
        }

        stack.unwind().await;
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn commit_never_runs_inverses() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut stack = CompensationStack::new();
        let ran_clone = ran.clone();
        stack.push("step", move || async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        stack.commit();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
