//! Tile decoders.
//!
//! A decoder turns the raw bytes of a tile (or of an allsky image) into the
//! payload a survey caches, along with the payload's cost and a hint about
//! which child quadrants are empty. Decoders run on the blocking pool unless
//! they declare themselves as passthrough.

mod image;

use bytes::Bytes;
use thiserror::Error;

use crate::cache::Transparency;
use crate::healpix::HealpixAddress;

pub use self::image::RgbaImageDecoder;

/// Errors raised while decoding a tile payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,

    #[error("image decode failed: {0}")]
    Image(String),

    #[error("unexpected tile dimensions {width}x{height}")]
    Dimensions { width: u32, height: u32 },
}

/// What a payload was fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    /// A regular tile.
    Tile(HealpixAddress),
    /// The allsky mosaic of every tile at `order`.
    Allsky { order: u8 },
}

/// Result of decoding one payload.
#[derive(Debug, Clone)]
pub struct DecodedTile<T> {
    pub payload: T,
    /// Budget units charged to the cache for this payload.
    pub cost: u64,
    pub transparency: Transparency,
}

/// Converts fetched bytes into cacheable payloads.
pub trait TileDecoder<T>: Send + Sync {
    fn decode(&self, source: TileSource, data: Bytes) -> Result<DecodedTile<T>, DecodeError>;

    /// Cheap decoders run inline instead of on the blocking pool.
    fn passthrough(&self) -> bool {
        false
    }
}

/// Keeps the fetched bytes as they are; cost is the byte length.
///
/// Nothing is interpreted, so an empty body is a valid (zero-cost) tile.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawBytesDecoder;

impl TileDecoder<Bytes> for RawBytesDecoder {
    fn decode(&self, _source: TileSource, data: Bytes) -> Result<DecodedTile<Bytes>, DecodeError> {
        Ok(DecodedTile {
            cost: data.len() as u64,
            payload: data,
            transparency: Transparency::OPAQUE,
        })
    }

    fn passthrough(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bytes() {
        let addr = HealpixAddress::new(3, 5).unwrap();
        let decoded = RawBytesDecoder
            .decode(TileSource::Tile(addr), Bytes::from_static(b"abcd"))
            .unwrap();
        assert_eq!(decoded.cost, 4);
        assert_eq!(&decoded.payload[..], b"abcd");
        assert!(RawBytesDecoder.passthrough());

        let empty = RawBytesDecoder
            .decode(TileSource::Allsky { order: 3 }, Bytes::new())
            .unwrap();
        assert_eq!(empty.cost, 0);
        assert!(empty.payload.is_empty());
    }
}
