const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compress(std::io::Error),
    #[error("decompression failed: {0}")]
    Decompress(std::io::Error),
}

/// Compress `bytes`, returning the compressed bytes and the compression
/// ratio (compressed_len / original_len; < 1.0 means it got smaller).
pub fn compress(bytes: &[u8]) -> Result<(Vec<u8>, f64), CodecError> {
    let compressed = zstd::encode_all(bytes, ZSTD_LEVEL).map_err(CodecError::Compress)?;
    let ratio = if bytes.is_empty() {
        1.0
    } else {
        compressed.len() as f64 / bytes.len() as f64
    };
    Ok((compressed, ratio))
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    zstd::decode_all(bytes).map_err(CodecError::Decompress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_arbitrary_bytes() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let (compressed, ratio) = compress(&original).unwrap();
        assert!(ratio < 1.0);
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn roundtrips_empty_input() {
        let (compressed, _ratio) = compress(&[]).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn highly_repetitive_payload_compresses_well() {
        let original = vec![b'X'; 10 * 1024];
        let (compressed, ratio) = compress(&original).unwrap();
        assert!(ratio < 1.0);
        assert_eq!(decompress(&compressed).unwrap(), original);
    }
}
