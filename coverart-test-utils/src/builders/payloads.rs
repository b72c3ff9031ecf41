//! Synthetic image payloads

use bytes::Bytes;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// `len` bytes starting with a PNG signature
pub fn png(len: usize) -> Bytes {
    with_magic(&PNG_MAGIC, len)
}

/// `len` bytes starting with a JPEG signature
pub fn jpeg(len: usize) -> Bytes {
    with_magic(&JPEG_MAGIC, len)
}

fn with_magic(magic: &[u8], len: usize) -> Bytes {
    let mut data: Vec<u8> = magic.iter().copied().take(len).collect();
    data.extend((data.len()..len).map(|i| (i % 251) as u8));
    Bytes::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_prefix() {
        let data = png(1024);
        assert_eq!(data.len(), 1024);
        assert!(data.starts_with(&PNG_MAGIC));
        assert_eq!(jpeg(2).len(), 2);
    }
}
