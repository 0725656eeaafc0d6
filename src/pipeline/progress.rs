use std::sync::Mutex;

/// A progress notification
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Operation name (`"compress"`, `"decompress"`, `"verify"`)
    pub operation: &'static str,
    /// Row group of the unit that just completed; `None` when not applicable
    pub row_group: Option<usize>,
    /// Row groups in the file
    pub total_row_groups: usize,
    /// Completed share of all units, 0-100
    pub percent: f64,
}

/// Receives progress from worker threads.
///
/// Calls are serialized by the pipeline. Returning `false` cancels the
/// operation: no new units are dispatched, in-flight units finish, and the
/// operation fails with a cancellation error.
pub trait ProgressObserver: Send + Sync {
    /// Handle one notification; return `false` to cancel
    fn on_progress(&self, progress: &Progress) -> bool;
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) -> bool + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) -> bool {
        self(progress)
    }
}

/// Observer that never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: &Progress) -> bool {
        true
    }
}

/// Counts completed units and forwards notifications to the observer
pub(crate) struct ProgressTracker<'a> {
    observer: &'a dyn ProgressObserver,
    operation: &'static str,
    total_units: usize,
    total_row_groups: usize,
    completed: Mutex<usize>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(
        observer: &'a dyn ProgressObserver,
        operation: &'static str,
        total_units: usize,
        total_row_groups: usize,
    ) -> Self {
        Self {
            observer,
            operation,
            total_units,
            total_row_groups,
            completed: Mutex::new(0),
        }
    }

    pub(crate) fn operation(&self) -> &'static str {
        self.operation
    }

    /// Record one finished unit; returns the observer's continue flag
    pub(crate) fn unit_done(&self, row_group: Option<usize>) -> bool {
        let mut completed = match self.completed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *completed += 1;
        let percent = if self.total_units == 0 {
            100.0
        } else {
            (*completed as f64 / self.total_units as f64) * 100.0
        };
        self.observer.on_progress(&Progress {
            operation: self.operation,
            row_group,
            total_row_groups: self.total_row_groups,
            percent,
        })
    }
}
