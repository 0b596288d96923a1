//! Work deferred until after the current turn of the event loop.
//!
//! A terminal transition tears the view down inline and defers what the user
//! should see afterwards (the failure dialog, the navigation). Deferral is an
//! explicit queue flushed after yielding to the scheduler once, rather than a
//! timer with an arbitrary delay.

use crate::navigator::NavigationPlan;
use crate::notification::JobFailure;
use std::collections::VecDeque;

/// A task scheduled to run after the current turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    ShowFailure(JobFailure),
    Navigate(NavigationPlan),
}

/// FIFO queue of deferred tasks.
#[derive(Debug, Default)]
pub struct AfterTurn {
    tasks: VecDeque<Deferred>,
}

impl AfterTurn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: Deferred) {
        tracing::trace!(?task, "Deferred until after current turn");
        self.tasks.push_back(task);
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Let the current turn finish, then hand back every task in scheduling order.
    pub async fn flush(&mut self) -> Vec<Deferred> {
        tokio::task::yield_now().await;
        self.tasks.drain(..).collect()
    }
}
