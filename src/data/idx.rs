// ============================================================
// Layer 4 - IDX File Reader
// ============================================================
// QMNIST ships in the IDX format used by the original MNIST:
//
//   magic (u32, big-endian)   - 0x00 0x00 <type> <ndims>
//   ndims x dimension (u32)   - big-endian sizes
//   payload                   - the values, row-major
//
// Two variants appear in the archive:
//   images: type 0x08 (u8),  dims [N, 28, 28]   -> magic 2051
//   labels: type 0x0C (i32), dims [N, 8]        -> magic 3074
//
// QMNIST labels carry eight columns per sample (class, NIST
// writer id, hsf and so on). Only column 0, the digit class, is kept.
//
// All files are gzip-compressed on disk.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::{
    error, fmt,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::domain::image::{DigitImage, IMAGE_SIDE, NUM_CLASSES};

pub const IMAGE_FILE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_FILE_MAGIC: u32 = 0x0000_0C02;

/// Number of i32 columns per QMNIST label record
pub const LABEL_COLUMNS: usize = 8;

/// Upper bound on up-front allocation; the header count is untrusted
const MAX_PREALLOCATED_ITEMS: usize = 65_536;

#[derive(Debug, PartialEq, Eq)]
pub enum IdxError {
    InvalidHeaderMagic { expected: u32, found: u32 },
    UnexpectedImageSize { rows: u32, columns: u32 },
    UnexpectedLabelColumns(u32),
    LabelOutOfRange { index: usize, label: i32 },
    CountMismatch { images: usize, labels: usize },
}

impl fmt::Display for IdxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IdxError::InvalidHeaderMagic { expected, found } => {
                write!(f, "Invalid magic: expected {expected:#010x}, found {found:#010x}")
            }
            IdxError::UnexpectedImageSize { rows, columns } => {
                write!(f, "Expected {IMAGE_SIDE}x{IMAGE_SIDE} images, found {rows}x{columns}")
            }
            IdxError::UnexpectedLabelColumns(cols) => {
                write!(f, "Expected {LABEL_COLUMNS} label columns, found {cols}")
            }
            IdxError::LabelOutOfRange { index, label } => {
                write!(f, "Label {label} at index {index} is not a digit class")
            }
            IdxError::CountMismatch { images, labels } => {
                write!(f, "{images} images but {labels} labels")
            }
        }
    }
}

impl error::Error for IdxError {}

fn read_u32_be<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn expect_magic<R: Read>(reader: &mut R, expected: u32) -> Result<()> {
    let found = read_u32_be(reader)?;
    if found != expected {
        return Err(IdxError::InvalidHeaderMagic { expected, found }.into());
    }
    Ok(())
}

/// Parse an uncompressed IDX image stream into raw pixel grids
pub fn parse_images<R: Read>(mut reader: R) -> Result<Vec<Vec<u8>>> {
    expect_magic(&mut reader, IMAGE_FILE_MAGIC)?;

    let num_items = read_u32_be(&mut reader)?;
    let rows      = read_u32_be(&mut reader)?;
    let columns   = read_u32_be(&mut reader)?;
    if rows as usize != IMAGE_SIDE || columns as usize != IMAGE_SIDE {
        return Err(IdxError::UnexpectedImageSize { rows, columns }.into());
    }

    let pixels_per_image = (rows * columns) as usize;
    let mut images = Vec::with_capacity((num_items as usize).min(MAX_PREALLOCATED_ITEMS));
    for _ in 0..num_items {
        let mut pixels = vec![0u8; pixels_per_image];
        reader.read_exact(&mut pixels)?;
        images.push(pixels);
    }
    Ok(images)
}

/// Parse an uncompressed QMNIST label stream, keeping the class column
pub fn parse_labels<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    expect_magic(&mut reader, LABEL_FILE_MAGIC)?;

    let num_items = read_u32_be(&mut reader)? as usize;
    let columns   = read_u32_be(&mut reader)?;
    if columns as usize != LABEL_COLUMNS {
        return Err(IdxError::UnexpectedLabelColumns(columns).into());
    }

    let mut record = [0u8; LABEL_COLUMNS * 4];
    let mut labels = Vec::with_capacity(num_items.min(MAX_PREALLOCATED_ITEMS));
    for index in 0..num_items {
        reader.read_exact(&mut record)?;
        let class = i32::from_be_bytes([record[0], record[1], record[2], record[3]]);
        if !(0..NUM_CLASSES as i32).contains(&class) {
            return Err(IdxError::LabelOutOfRange { index, label: class }.into());
        }
        labels.push(class as u8);
    }
    Ok(labels)
}

/// Zip parsed images and labels into samples, checking the counts agree
pub fn pair_samples(images: Vec<Vec<u8>>, labels: Vec<u8>) -> Result<Vec<DigitImage>> {
    if images.len() != labels.len() {
        return Err(IdxError::CountMismatch { images: images.len(), labels: labels.len() }.into());
    }
    Ok(images
        .into_iter()
        .zip(labels)
        .map(|(pixels, label)| DigitImage::new(pixels, label))
        .collect())
}

fn open_gz(path: &Path) -> Result<BufReader<GzDecoder<File>>> {
    let f = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    Ok(BufReader::new(GzDecoder::new(f)))
}

/// Read a gzip-compressed image/label file pair from disk
pub fn read_split(images_path: &Path, labels_path: &Path) -> Result<Vec<DigitImage>> {
    let images = parse_images(open_gz(images_path)?)
        .with_context(|| format!("Malformed image file '{}'", images_path.display()))?;
    let labels = parse_labels(open_gz(labels_path)?)
        .with_context(|| format!("Malformed label file '{}'", labels_path.display()))?;
    pair_samples(images, labels)
}


// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::domain::image::IMAGE_PIXELS;

    fn sample_images() -> Vec<Vec<u8>> {
        vec![vec![0u8; IMAGE_PIXELS], (0..IMAGE_PIXELS).map(|i| (i % 256) as u8).collect()]
    }

    #[test]
    fn test_parse_images() {
        let images = parse_images(encode_images(&sample_images()).as_slice()).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[1][255], 255);
        assert_eq!(images[1][256], 0);
    }

    #[test]
    fn test_parse_labels_keeps_class_column() {
        let labels = parse_labels(encode_labels(&[7, 0, 9]).as_slice()).unwrap();
        assert_eq!(labels, vec![7, 0, 9]);
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        // An image header handed to the label parser
        let err = parse_labels(encode_images(&sample_images()).as_slice()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdxError>(),
            Some(&IdxError::InvalidHeaderMagic { expected: LABEL_FILE_MAGIC, found: IMAGE_FILE_MAGIC })
        );
    }

    #[test]
    fn test_label_out_of_range() {
        let err = parse_labels(encode_labels(&[3, 12]).as_slice()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdxError>(),
            Some(&IdxError::LabelOutOfRange { index: 1, label: 12 })
        );
    }

    #[test]
    fn test_truncated_stream_fails() {
        let mut bytes = encode_images(&sample_images());
        bytes.truncate(bytes.len() - 10);
        assert!(parse_images(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_oversized_header_count_fails_cleanly() {
        let mut images = encode_images(&sample_images());
        images[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(parse_images(images.as_slice()).is_err());

        let mut labels = encode_labels(&[1, 2]);
        labels[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(parse_labels(labels.as_slice()).is_err());
    }

    #[test]
    fn test_count_mismatch() {
        let err = pair_samples(sample_images(), vec![1]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<IdxError>(),
            Some(&IdxError::CountMismatch { images: 2, labels: 1 })
        );
    }

    #[test]
    fn test_read_split_from_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let images_path = dir.path().join("images.gz");
        let labels_path = dir.path().join("labels.gz");
        std::fs::write(&images_path, gzip(&encode_images(&sample_images()))).unwrap();
        std::fs::write(&labels_path, gzip(&encode_labels(&[4, 2]))).unwrap();

        let samples = read_split(&images_path, &labels_path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, 4);
        assert_eq!(samples[1].label, 2);
        assert_eq!(samples[1].pixels.len(), IMAGE_PIXELS);
    }
}
