// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the filesystem:
//
//   checkpoint.rs - Saving and loading model weights
//                   (Burn's CompactRecorder) plus the run
//                   config as JSON so `eval` can rebuild it.
//
//   tracker.rs    - The experiment tracker: a run directory of
//                   hyperparameters, step scalars, watch
//                   summaries, artifacts and a source snapshot.
//
//   metrics.rs    - Epoch-level metrics appended to a CSV file.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Offline experiment-run tracker
pub mod tracker;

/// Training metrics CSV logger
pub mod metrics;
