//! Two-way race with a fixed tie-break.

use std::future::Future;

/// Which side of a [`race`] completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Winner<A, B> {
    First(A),
    Second(B),
}

/// Await whichever future completes first and drop the other.
///
/// Polling is biased: when both are ready in the same turn, `first` wins.
/// The monitor passes the notification stream as `first` and the timer as
/// `second`, so a terminal notification always beats a concurrent timeout.
/// Both futures must be cancel-safe, since the loser is dropped mid-flight.
pub async fn race<A, B>(first: A, second: B) -> Winner<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    tokio::select! {
        biased;
        a = first => Winner::First(a),
        b = second => Winner::Second(b),
    }
}
