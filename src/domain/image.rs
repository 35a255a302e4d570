// ============================================================
// Layer 3 - Digit Image Domain Type
// ============================================================
// One labelled QMNIST sample: a 28x28 grid of grey-level
// intensities stored row-major, plus the digit it shows.
//
// Pixels stay as raw u8 here. Scaling to [0, 1] happens in the
// batcher, right before the tensors are built.

use serde::{Deserialize, Serialize};

/// Height and width of every QMNIST image
pub const IMAGE_SIDE: usize = 28;

/// Number of pixels in one flattened image (28 * 28)
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Number of digit classes (0..=9)
pub const NUM_CLASSES: usize = 10;

/// A single labelled handwritten digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitImage {
    /// Row-major pixel intensities, exactly IMAGE_PIXELS long
    pub pixels: Vec<u8>,

    /// The digit class, always below NUM_CLASSES
    pub label: u8,
}

impl DigitImage {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        Self { pixels, label }
    }

    /// An all-black image, handy for smoke tests and synthetic batches
    pub fn blank(label: u8) -> Self {
        Self::new(vec![0; IMAGE_PIXELS], label)
    }
}

/// Which half of QMNIST to read.
///
/// `Train` is the 60k training split, `Test` the 60k test split
/// that doubles as the validation set during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// The prefix used by the QMNIST archive file names
    pub fn file_stem(&self) -> &'static str {
        match self {
            Split::Train => "qmnist-train",
            Split::Test => "qmnist-test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}
