// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Everything that runs tensors:
//
//   model.rs    - The 784 → 64 → ReLU → 10 classifier
//   metrics.rs  - Macro accuracy / precision / recall state
//   task.rs     - The training module: loss, metrics, step
//                 functions and optimizer configuration
//   trainer.rs  - The explicit epoch / batch loop with
//                 mid-epoch validation and checkpointing
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Two-layer fully-connected classifier
pub mod model;

/// Running classification metrics
pub mod metrics;

/// Training / validation step definitions
pub mod task;

/// Full training loop with validation and checkpointing
pub mod trainer;
