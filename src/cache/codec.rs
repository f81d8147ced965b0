//! Codec Module
//!
//! Serialization capability used for entry headers and values. The store is
//! generic over a [`Codec`] and never inspects the payload itself.

use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

// == Codec Trait ==
/// Encodes and decodes self-delimiting documents on a byte stream.
///
/// An entry file is two consecutive documents (header, then value), so
/// `decode` must consume exactly one document and leave the reader
/// positioned at the start of the next.
pub trait Codec: Send + Sync + 'static {
    /// Writes one document for `value`.
    fn encode<T, W>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
        W: Write;

    /// Reads one document. `limit` caps the number of bytes the document may
    /// claim, so a corrupt length prefix fails instead of allocating.
    fn decode<T, R>(&self, reader: &mut R, limit: u64) -> Result<T>
    where
        T: DeserializeOwned,
        R: BufRead;
}

// == Bincode ==
/// Compact binary codec. This is the default for [`crate::cache::FileCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T, W>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .serialize_into(writer, value)
            .map_err(bincode_write_error)
    }

    fn decode<T, R>(&self, reader: &mut R, limit: u64) -> Result<T>
    where
        T: DeserializeOwned,
        R: BufRead,
    {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(limit)
            .deserialize_from(reader)
            .map_err(bincode_read_error)
    }
}

// == JSON ==
/// Newline-delimited JSON codec, handy when the cache directory should be
/// readable with ordinary text tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T, W>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        serde_json::to_writer(&mut *writer, value).map_err(|e| {
            if e.is_io() {
                stream_error("write entry", io::Error::from(e))
            } else {
                CacheError::Encode(e.to_string())
            }
        })?;
        writer
            .write_all(b"\n")
            .map_err(|e| stream_error("write entry", e))
    }

    fn decode<T, R>(&self, reader: &mut R, limit: u64) -> Result<T>
    where
        T: DeserializeOwned,
        R: BufRead,
    {
        let mut line = Vec::new();
        Read::take(&mut *reader, limit)
            .read_until(b'\n', &mut line)
            .map_err(read_error)?;

        // Compact JSON never contains a raw newline, so a missing one means
        // the document was cut short.
        if line.last() != Some(&b'\n') {
            return Err(CacheError::Corrupted(
                "unterminated JSON document".to_string(),
            ));
        }

        serde_json::from_slice(&line).map_err(|e| CacheError::Corrupted(e.to_string()))
    }
}

/// I/O failure on the entry stream. The entry layer fills in the path.
fn stream_error(op: &'static str, source: io::Error) -> CacheError {
    CacheError::io(op, PathBuf::new(), source)
}

/// A stream that ends early means a truncated entry, not a failing disk.
fn read_error(source: io::Error) -> CacheError {
    if source.kind() == io::ErrorKind::UnexpectedEof {
        CacheError::Corrupted(source.to_string())
    } else {
        stream_error("read entry", source)
    }
}

fn bincode_write_error(err: bincode::Error) -> CacheError {
    match *err {
        bincode::ErrorKind::Io(source) => stream_error("write entry", source),
        other => CacheError::Encode(other.to_string()),
    }
}

fn bincode_read_error(err: bincode::Error) -> CacheError {
    match *err {
        bincode::ErrorKind::Io(source) => read_error(source),
        other => CacheError::Corrupted(other.to_string()),
    }
}
