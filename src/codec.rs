//! Byte and file encoding of annotated arrays
//!
//! A frame is laid out as
//!  * `b"RRES"` magic number,
//!  * format version,
//!  * payload element tag (real or complex),
//!  * [ResultKind] tag,
//!  * SHA-256 digest of the header and of the body,
//!  * body: lz4 compressed bincode encoding of the payload and of the attributes.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{
    data::{AnnotatedArray, if64},
    results::ResultKind,
};

const MAGIC: &[u8; 4] = b"RRES";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 7;
const DIGEST_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DeserializationError {
    #[error("expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("not a rotor results frame")]
    Magic,
    #[error("unsupported format version {0}")]
    Version(u8),
    #[error("found a {found} payload, expected a {expected} payload")]
    ElementType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown result kind tag {0}")]
    Kind(u8),
    #[error("found {found} results, expected {expected} results")]
    UnexpectedKind {
        expected: ResultKind,
        found: ResultKind,
    },
    #[error("results checksum mismatch")]
    Checksum,
    #[error("failed to decompress results")]
    Decompress(#[from] lz4_flex::block::DecompressError),
    #[error("failed to decode results")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("{0} trailing bytes after results")]
    TrailingBytes(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(r#"found data file extension: "{0}", expected a native results file"#)]
    DataFileExtension(String),
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
    #[error("failed to encode results")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to access results file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize results to pickle file")]
    SerPkl(#[from] serde_pickle::Error),
}

/// Payload element types that can be framed
pub trait Element: Clone + Serialize + DeserializeOwned {
    const TAG: u8;
    const NAME: &'static str;
}
impl Element for f64 {
    const TAG: u8 = 0;
    const NAME: &'static str = "real";
}
impl Element for if64 {
    const TAG: u8 = 1;
    const NAME: &'static str = "complex";
}

fn element_name(tag: u8) -> &'static str {
    if tag == f64::TAG {
        f64::NAME
    } else if tag == if64::TAG {
        if64::NAME
    } else {
        "unknown"
    }
}

/// Validated frame header
pub(crate) struct Header<'a> {
    pub(crate) element: u8,
    pub(crate) kind: ResultKind,
    body: &'a [u8],
}

fn digest(header: &[u8], body: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::new()
        .chain_update(header)
        .chain_update(body)
        .finalize()
        .into()
}

/// Encodes `array` into a frame tagged with `kind`
pub(crate) fn encode<T: Element>(
    kind: ResultKind,
    array: &AnnotatedArray<T>,
) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serde::encode_to_vec(array, bincode::config::standard())?;
    let compressed = lz4_flex::compress_prepend_size(&body);
    let header = [
        MAGIC[0],
        MAGIC[1],
        MAGIC[2],
        MAGIC[3],
        VERSION,
        T::TAG,
        kind.tag(),
    ];
    let digest = digest(&header, &compressed);
    let mut bytes = Vec::with_capacity(HEADER_LEN + DIGEST_LEN + compressed.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&digest);
    bytes.extend_from_slice(&compressed);
    log::debug!(
        "encoded {kind} results: {} bytes, {} compressed",
        body.len(),
        compressed.len()
    );
    Ok(bytes)
}

/// Checks the frame header and digest
pub(crate) fn read_header(bytes: &[u8]) -> Result<Header<'_>, DeserializationError> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(DeserializationError::Truncated {
            expected: HEADER_LEN + DIGEST_LEN,
            found: bytes.len(),
        });
    }
    let (header, rest) = bytes.split_at(HEADER_LEN);
    let (expected_digest, body) = rest.split_at(DIGEST_LEN);
    if &header[..4] != MAGIC {
        return Err(DeserializationError::Magic);
    }
    if header[4] != VERSION {
        return Err(DeserializationError::Version(header[4]));
    }
    let kind = ResultKind::from_tag(header[6]).ok_or(DeserializationError::Kind(header[6]))?;
    if digest(header, body) != expected_digest {
        return Err(DeserializationError::Checksum);
    }
    Ok(Header {
        element: header[5],
        kind,
        body,
    })
}

/// Decodes the body of a validated frame
pub(crate) fn decode_body<T: Element>(
    header: &Header<'_>,
) -> Result<AnnotatedArray<T>, DeserializationError> {
    if header.element != T::TAG {
        return Err(DeserializationError::ElementType {
            expected: T::NAME,
            found: element_name(header.element),
        });
    }
    let body = lz4_flex::decompress_size_prepended(header.body)?;
    let (array, read): (AnnotatedArray<T>, usize) =
        bincode::serde::decode_from_slice(&body, bincode::config::standard())?;
    if read != body.len() {
        return Err(DeserializationError::TrailingBytes(body.len() - read));
    }
    Ok(array)
}

/// Writes an array to `path`
///
/// A `pkl` extension writes a Python pickle, any other extension a native frame
pub(crate) fn save_as<T: Element>(
    kind: ResultKind,
    array: &AnnotatedArray<T>,
    path: impl AsRef<Path>,
) -> Result<(), CodecError> {
    let path = path.as_ref();
    match path.extension() {
        Some(ext) if ext == "pkl" => {
            let mut file = BufWriter::new(File::create(path)?);
            serde_pickle::to_writer(&mut file, array, Default::default())?;
            file.flush()?;
        }
        _ => {
            let bytes = encode(kind, array)?;
            let mut file = File::create(path)?;
            file.write_all(&bytes)?;
        }
    }
    log::info!("{kind} results saved to {path:?}");
    Ok(())
}

/// Reads the content of a native results file
pub(crate) fn read_frame(path: impl AsRef<Path>) -> Result<Vec<u8>, CodecError> {
    let path = path.as_ref();
    match path.extension() {
        Some(ext) if ext == "pkl" => Err(CodecError::DataFileExtension(
            ext.to_string_lossy().into_owned(),
        )),
        _ => {
            let bytes = std::fs::read(path)?;
            log::info!("loaded {} bytes from {path:?}", bytes.len());
            Ok(bytes)
        }
    }
}

impl<T: Element> AnnotatedArray<T> {
    /// Encodes the payload and the attributes into a self-describing byte sequence
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(ResultKind::Generic, self)
    }
    /// Decodes an array from bytes produced by [AnnotatedArray::to_bytes]
    ///
    /// Frames of any [ResultKind] are accepted as long as the payload element type matches
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        decode_body(&read_header(bytes)?)
    }
    /// Saves the array to `path`, see [AnnotatedArray::to_bytes]
    ///
    /// A `pkl` extension writes a Python pickle instead
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        save_as(ResultKind::Generic, self, path)
    }
    /// Loads an array saved with [AnnotatedArray::save]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let bytes = read_frame(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3, array};

    use super::*;
    use crate::data::{Attribute, Attributes};

    fn annotated() -> AnnotatedArray {
        let payload = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| {
            (i as f64 + 0.1 * j as f64) * (k as f64 - 1.5) / 7.
        });
        let attributes = Attributes::new()
            .with("frequency_range", vec![0., 0.1, 1. / 3., 1e9])
            .with("speed", 523.599)
            .with("nodes", vec![0usize, 1, 2])
            .with("color", "tab:blue")
            .with("converged", true)
            .with("root", if64::new(-0.5, 12.25))
            .with("nothing", Attribute::Null)
            .with("grid", Array2::from_elem((2, 2), -1.25))
            .with(
                "disks",
                vec![Attribute::Record(
                    Attributes::new().with("n", 2usize).with("m", 32.59),
                )],
            );
        AnnotatedArray::new(payload, attributes)
    }

    #[test]
    fn round_trip() {
        let results = annotated();
        let bytes = results.to_bytes().unwrap();
        let decoded = AnnotatedArray::<f64>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, results);
    }

    #[test]
    fn complex_round_trip() {
        let payload = array![
            [if64::new(1., -1.), if64::new(0., 0.5)],
            [if64::new(-2., 0.), if64::new(3.5, 1e-12)]
        ];
        let results = AnnotatedArray::new(payload, Attributes::new().with("speed", 0.));
        let bytes = results.to_bytes().unwrap();
        let decoded = AnnotatedArray::<if64>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, results);
        assert!(matches!(
            AnnotatedArray::<f64>::from_bytes(&bytes),
            Err(DeserializationError::ElementType {
                expected: "real",
                found: "complex"
            })
        ));
    }

    #[test]
    fn truncated_frames_fail() {
        let bytes = annotated().to_bytes().unwrap();
        for len in (0..bytes.len()).step_by(3) {
            assert!(AnnotatedArray::<f64>::from_bytes(&bytes[..len]).is_err());
        }
    }

    #[test]
    fn corrupted_frames_fail() {
        let bytes = annotated().to_bytes().unwrap();
        for i in 0..bytes.len() {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= 0x5a;
            assert!(
                AnnotatedArray::<f64>::from_bytes(&corrupted).is_err(),
                "corruption at byte {i} went unnoticed"
            );
        }
        let mut corrupted = bytes.clone();
        corrupted[4] = 9;
        assert!(matches!(
            AnnotatedArray::<f64>::from_bytes(&corrupted),
            Err(DeserializationError::Version(9))
        ));
        let mut corrupted = bytes;
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xff;
        assert!(matches!(
            AnnotatedArray::<f64>::from_bytes(&corrupted),
            Err(DeserializationError::Checksum)
        ));
    }

    #[test]
    fn not_a_frame() {
        let garbage = vec![7u8; 128];
        assert!(matches!(
            AnnotatedArray::<f64>::from_bytes(&garbage),
            Err(DeserializationError::Magic)
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let results = annotated();
        let path = dir.path().join("results.rres");
        results.save(&path).unwrap();
        assert_eq!(AnnotatedArray::<f64>::load(&path).unwrap(), results);
    }

    #[test]
    fn pickle_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.pkl");
        annotated().save(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert!(matches!(
            AnnotatedArray::<f64>::load(&path),
            Err(CodecError::DataFileExtension(ext)) if ext == "pkl"
        ));
    }
}
