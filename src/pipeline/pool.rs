//! Fixed-size worker pool with index-addressed result slots.
//!
//! ```text
//! ┌──────────┐  all units up front  ┌──────────┐   slot[i] (written once)
//! │ producer │ ───── channel ─────▶ │ worker 0 │ ──▶ ┌───┬───┬───┬───┐
//! └──────────┘                      │ worker N │ ──▶ │ 0 │ 1 │ 2 │ … │
//!                                   └──────────┘     └───┴───┴───┴───┘
//! ```
//!
//! Output order is the slot order, never the completion order. A shared stop
//! flag halts dispatch after the first failure (fail-fast mode) or an
//! observer cancellation; units already picked up by a worker run to
//! completion.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use crossbeam_channel::unbounded;
use log::{debug, warn};

use crate::error::{InfParquetError, Result, UnitId};

use super::progress::ProgressTracker;

/// Upper bound on explicitly requested workers
pub const MAX_WORKERS: usize = 1024;

/// Something the pool can schedule
pub(crate) trait WorkUnit: Send {
    fn id(&self) -> UnitId;
}

/// Whether one unit failure halts dispatch of the rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureMode {
    FailFast,
    CollectAll,
}

/// Why a batch stopped before every unit ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// Slot index of the first failing unit
    Failed(usize),
    Cancelled,
}

/// Results of one batch: `slots[i]` is `None` if unit `i` was never run
pub(crate) struct BatchOutcome<T> {
    pub slots: Vec<Option<Result<T>>>,
    pub stop: Option<StopReason>,
}

impl<T> BatchOutcome<T> {
    /// Turn a stopped batch into its error, or return all unit results
    pub(crate) fn into_results(self, operation: &str) -> Result<Vec<T>> {
        let mut slots = self.slots;
        match self.stop {
            Some(StopReason::Cancelled) => Err(InfParquetError::Cancelled(operation.to_string())),
            Some(StopReason::Failed(i)) => match slots.get_mut(i).and_then(Option::take) {
                Some(Err(e)) => Err(e),
                _ => Err(InfParquetError::ParallelProcessing(format!(
                    "failure recorded for unit {} but no error stored",
                    i
                ))),
            },
            None => slots
                .into_iter()
                .enumerate()
                .map(|(i, slot)| {
                    slot.unwrap_or_else(|| {
                        Err(InfParquetError::ParallelProcessing(format!(
                            "unit {} was never processed",
                            i
                        )))
                    })
                })
                .collect(),
        }
    }
}

/// Resolve a requested worker count; 0 means available parallelism
pub(crate) fn resolve_workers(requested: usize) -> Result<usize> {
    if requested > MAX_WORKERS {
        return Err(InfParquetError::InvalidParameter(format!(
            "worker count {} exceeds maximum of {}",
            requested, MAX_WORKERS
        )));
    }
    if requested > 0 {
        return Ok(requested);
    }
    Ok(std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1))
}

/// Run `work` over every unit on `workers` threads.
pub(crate) fn run_batch<U, T, F>(
    workers: usize,
    units: Vec<U>,
    mode: FailureMode,
    tracker: &ProgressTracker<'_>,
    work: F,
) -> Result<BatchOutcome<T>>
where
    U: WorkUnit,
    T: Send + Sync,
    F: Fn(&U) -> Result<T> + Sync,
{
    let total = units.len();
    let slots: Vec<OnceLock<Result<T>>> = (0..total).map(|_| OnceLock::new()).collect();
    let stop_flag = AtomicBool::new(false);
    let stop_reason: Mutex<Option<StopReason>> = Mutex::new(None);

    let record_stop = |reason: StopReason| {
        let mut guard = match stop_reason.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            *guard = Some(reason);
        }
        stop_flag.store(true, Ordering::SeqCst);
    };

    let (sender, receiver) = unbounded::<(usize, U)>();
    for item in units.into_iter().enumerate() {
        // The receiver is alive, so sending cannot fail
        let _ = sender.send(item);
    }
    drop(sender);

    let threads = workers.clamp(1, total.max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("infparquet-worker-{}", i))
        .build()
        .map_err(|e| {
            InfParquetError::ParallelProcessing(format!("failed to build worker pool: {}", e))
        })?;

    debug!(
        "{}: dispatching {} units on {} workers",
        tracker.operation(),
        total,
        threads
    );

    pool.scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|_| {
                while !stop_flag.load(Ordering::SeqCst) {
                    let Ok((index, unit)) = receiver.recv() else {
                        break;
                    };
                    let id = unit.id();
                    let result = catch_unwind(AssertUnwindSafe(|| work(&unit)))
                        .unwrap_or_else(|_| {
                            Err(InfParquetError::ParallelProcessing(format!(
                                "worker panicked while processing {}",
                                id
                            )))
                        });

                    let failed = result.is_err();
                    if let Err(ref e) = result {
                        warn!("{}: {} failed: {}", tracker.operation(), id, e);
                    }
                    let _ = slots[index].set(result);

                    if failed && mode == FailureMode::FailFast {
                        record_stop(StopReason::Failed(index));
                    }
                    let row_group = id.chunk().map(|(rg, _)| rg);
                    if !tracker.unit_done(row_group) {
                        record_stop(StopReason::Cancelled);
                    }
                }
            });
        }
    });

    let stop = match stop_reason.into_inner() {
        Ok(reason) => reason,
        Err(poisoned) => poisoned.into_inner(),
    };
    Ok(BatchOutcome {
        slots: slots.into_iter().map(OnceLock::into_inner).collect(),
        stop,
    })
}
