// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits describing the core concepts
// of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// A labelled 28x28 digit and the dataset split it belongs to
pub mod image;

// Parameter / gradient statistics recorded while watching a model
pub mod watch;

// Core abstractions (traits) that other layers implement
pub mod traits;
