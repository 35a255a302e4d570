// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the public QMNIST archive to tensor batches.
//
//   QMNIST archive (HTTPS)
//       │
//       ▼
//   QmnistCache      → downloads once, caches under qmnist/data
//       │
//       ▼
//   idx              → decodes gzip IDX image/label files
//       │
//       ▼
//   QmnistDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher     → stacks samples into [N, 1, 28, 28] tensors
//       │
//       ▼
//   DataLoader       → worker threads feed batches to the loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Downloads and caches the QMNIST archive files
pub mod download;

/// Parses the IDX binary format used by QMNIST
pub mod idx;

/// Implements Burn's Dataset trait over one split
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Builds the shuffled train / sequential validation loaders
pub mod loader;
