//! Zlib stream compression for stored objects.
//!
//! The codec knows nothing about object framing: it turns bytes into a zlib
//! stream and back. Decompression does not need the inflated size up front;
//! the output buffer grows until the stream reports its end.

use crate::{Result, StorageError};
use flate2::{Compress, Decompress, FlushCompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};

/// Compression level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression (stored blocks)
    None,
    /// Fast compression (lower ratio)
    Fast,
    /// Default compression (balanced)
    #[default]
    Default,
    /// Best compression (slower, higher ratio)
    Best,
}

impl CompressionLevel {
    /// Converts to flate2 compression level.
    pub fn to_flate2(self) -> flate2::Compression {
        match self {
            CompressionLevel::None => flate2::Compression::none(),
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Best => flate2::Compression::best(),
        }
    }
}

/// Worst-case size of a zlib stream for `len` input bytes.
///
/// Same formula as zlib's `compressBound`.
pub fn compress_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Compresses `data` into a zlib stream.
pub fn compress(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let mut deflater = Compress::new(level.to_flate2(), true);
    let mut out = Vec::with_capacity(compress_bound(data.len()));

    loop {
        let consumed = deflater.total_in() as usize;
        let status = deflater
            .compress_vec(&data[consumed..], &mut out, FlushCompress::Finish)
            .map_err(|e| StorageError::Compression(e.to_string()))?;

        match status {
            Status::StreamEnd => break,
            // Only reachable if the bound was too small for this backend.
            Status::Ok | Status::BufError => out.reserve(out.capacity().max(64)),
        }
    }

    Ok(out)
}

/// Decompresses a complete zlib stream.
///
/// Fails with `CorruptObject` on a malformed or truncated stream, or when
/// bytes follow the end of the stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).max(64));

    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| StorageError::corrupt(format!("zlib stream: {e}")))?;

        if status == Status::StreamEnd {
            break;
        }

        if out.len() == out.capacity() {
            out.reserve(out.capacity());
            continue;
        }

        let progressed =
            inflater.total_in() as usize != consumed || inflater.total_out() != produced;
        if !progressed {
            return Err(StorageError::corrupt("zlib stream is truncated"));
        }
    }

    let consumed = inflater.total_in() as usize;
    if consumed != data.len() {
        return Err(StorageError::corrupt(format!(
            "{} trailing bytes after zlib stream",
            data.len() - consumed
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compression_level_default() {
        let level = CompressionLevel::default();
        assert_eq!(level, CompressionLevel::Default);
    }

    #[test]
    fn test_roundtrip_small() {
        let data = b"blob 6\0hello\n";
        let compressed = compress(data, CompressionLevel::Default).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_empty() {
        let compressed = compress(b"", CompressionLevel::Best).unwrap();
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_grows_output_buffer() {
        // Highly compressible input inflates far past the initial buffer.
        let data = vec![b'a'; 4 * 1024 * 1024];
        let compressed = compress(&data, CompressionLevel::Best).unwrap();
        assert!(compressed.len() * 2 < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_output_is_zlib_wrapped() {
        let compressed = compress(b"hello", CompressionLevel::Default).unwrap();
        // CMF byte: deflate with a 32K window.
        assert_eq!(compressed[0], 0x78);
        let check = u16::from(compressed[0]) * 256 + u16::from(compressed[1]);
        assert_eq!(check % 31, 0);
    }

    #[test]
    fn test_stored_level_within_bound() {
        let data: Vec<u8> = (0..100_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        let compressed = compress(&data, CompressionLevel::None).unwrap();
        assert!(compressed.len() <= compress_bound(data.len()));
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_decompress_garbage() {
        let err = decompress(b"definitely not zlib").unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_decompress_empty_input() {
        assert!(decompress(b"").unwrap_err().is_corrupt());
    }

    #[test]
    fn test_decompress_truncated() {
        let compressed = compress(&vec![7u8; 10_000], CompressionLevel::Default).unwrap();
        for cut in [1, 2, compressed.len() / 2, compressed.len() - 1] {
            let err = decompress(&compressed[..cut]).unwrap_err();
            assert!(err.is_corrupt(), "prefix of {cut} bytes: {err:?}");
        }
    }

    #[test]
    fn test_decompress_trailing_bytes() {
        let mut compressed = compress(b"payload", CompressionLevel::Default).unwrap();
        compressed.extend_from_slice(b"extra");
        assert!(decompress(&compressed).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_compress_bound_matches_zlib() {
        assert_eq!(compress_bound(0), 13);
        assert_eq!(compress_bound(4096), 4096 + 1 + 13);
    }

    proptest! {
        /// Property: decompress(compress(b)) == b for every level
        #[test]
        fn prop_codec_roundtrip(
            data in prop::collection::vec(any::<u8>(), 0..8192),
            level in prop_oneof![
                Just(CompressionLevel::None),
                Just(CompressionLevel::Fast),
                Just(CompressionLevel::Default),
                Just(CompressionLevel::Best),
            ]
        ) {
            let compressed = compress(&data, level).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), data);
        }
    }
}
