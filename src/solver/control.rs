//! Search control: budgets, cancellation and progress reporting.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Termination criteria for the exact search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    /// Stop after this much wall-clock time.
    pub time_limit: Duration,
    /// Stop after visiting this many decision points.
    pub node_limit: Option<u64>,
}

impl SearchBudget {
    /// Creates a budget from a millisecond time limit.
    pub fn from_millis(time_limit_ms: u64) -> Self {
        Self {
            time_limit: Duration::from_millis(time_limit_ms),
            node_limit: None,
        }
    }

    /// Adds a node limit.
    pub fn with_node_limit(mut self, node_limit: Option<u64>) -> Self {
        self.node_limit = node_limit;
        self
    }
}

/// Why a search stopped before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// The caller cancelled.
    Cancelled,
    /// The time limit elapsed.
    TimeBudget,
    /// The node limit was reached.
    NodeBudget,
}

/// Budget and cancellation state of one running search.
#[derive(Debug)]
pub struct SearchControl {
    deadline: Instant,
    node_limit: Option<u64>,
    cancel: CancellationToken,
    nodes: u64,
}

impl SearchControl {
    /// Starts the clock.
    pub fn start(budget: SearchBudget, cancel: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(budget.time_limit).unwrap_or(now),
            node_limit: budget.node_limit,
            cancel,
            nodes: 0,
        }
    }

    /// Counts one decision point and reports whether the search must stop.
    ///
    /// Cancellation takes precedence over the budgets.
    pub fn tick(&mut self) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            return Some(StopReason::NodeBudget);
        }
        if Instant::now() >= self.deadline {
            return Some(StopReason::TimeBudget);
        }
        self.nodes += 1;
        None
    }

    /// Whether the caller has cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Decision points visited so far.
    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }
}

/// Receives coarse integer progress percentages.
///
/// Delivery is best-effort: a sink whose receiver is gone simply drops
/// reports.
pub trait ProgressSink: Send {
    /// Reports progress in percent (0-100).
    fn report(&mut self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8) + Send,
{
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

impl ProgressSink for mpsc::UnboundedSender<u8> {
    fn report(&mut self, percent: u8) {
        let _ = self.send(percent);
    }
}

impl ProgressSink for watch::Sender<u8> {
    fn report(&mut self, percent: u8) {
        self.send_replace(percent);
    }
}

/// Forwards only increasing percentages to an optional sink.
pub struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn ProgressSink>,
    last: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    /// Wraps a sink.
    pub fn new(sink: Option<&'a mut dyn ProgressSink>) -> Self {
        Self { sink, last: None }
    }

    /// A reporter that discards everything.
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Reports `percent` (clamped to 100) if it is higher than anything
    /// reported before.
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(sink) = self.sink.as_mut() {
            sink.report(percent);
        }
    }

    /// Reports `done / total` mapped linearly onto `from..=to`.
    pub fn report_fraction(&mut self, done: usize, total: usize, from: u8, to: u8) {
        let span = u64::from(to.saturating_sub(from));
        let scaled = if total == 0 {
            span
        } else {
            span * done.min(total) as u64 / total as u64
        };
        self.report(from.saturating_add(scaled as u8));
    }

    /// Highest percentage reported so far.
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("attached", &self.sink.is_some())
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_budget() {
        let mut control = SearchControl::start(
            SearchBudget::from_millis(60_000).with_node_limit(Some(3)),
            CancellationToken::new(),
        );
        assert_eq!(control.tick(), None);
        assert_eq!(control.tick(), None);
        assert_eq!(control.tick(), None);
        assert_eq!(control.tick(), Some(StopReason::NodeBudget));
        assert_eq!(control.nodes(), 3);
    }

    #[test]
    fn test_time_budget() {
        let mut control =
            SearchControl::start(SearchBudget::from_millis(0), CancellationToken::new());
        assert_eq!(control.tick(), Some(StopReason::TimeBudget));
    }

    #[test]
    fn test_cancel_wins() {
        let token = CancellationToken::new();
        let mut control = SearchControl::start(
            SearchBudget::from_millis(0).with_node_limit(Some(0)),
            token.clone(),
        );
        token.cancel();
        assert!(control.is_cancelled());
        assert_eq!(control.tick(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_reporter_is_monotonic() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            let mut reporter = ProgressReporter::new(Some(&mut sink));
            reporter.report(0);
            reporter.report(10);
            reporter.report(5);
            reporter.report(10);
            reporter.report(250);
            assert_eq!(reporter.last(), Some(100));
        }
        assert_eq!(seen, vec![0, 10, 100]);
    }

    #[test]
    fn test_report_fraction() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: u8| seen.push(p);
            let mut reporter = ProgressReporter::new(Some(&mut sink));
            reporter.report_fraction(0, 4, 80, 100);
            reporter.report_fraction(2, 4, 80, 100);
            reporter.report_fraction(4, 4, 80, 100);
        }
        assert_eq!(seen, vec![80, 90, 100]);
    }

    #[test]
    fn test_channel_sinks_ignore_closed_receivers() {
        let (tx, rx) = mpsc::unbounded_channel::<u8>();
        drop(rx);
        let mut tx = tx;
        tx.report(50);

        let (wtx, wrx) = watch::channel(0u8);
        let mut wtx = wtx;
        wtx.report(42);
        assert_eq!(*wrx.borrow(), 42);
        drop(wrx);
        wtx.report(43);
    }
}
