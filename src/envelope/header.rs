/// Little endian signature of a zip local file header (`PK\x03\x04`)
pub const ZIP_MAGIC: u32 = 0x04034b50;

/// Size of the fixed portion of a zip local file header
pub const LOCAL_HEADER_LEN: usize = 30;

/// The only compression method supported for the gamestate entry
pub const DEFLATE_METHOD: u16 = 8;

/// The fixed 30 byte record that precedes a zip entry's filename, extra
/// field, and compressed data
///
/// <https://pkware.cachefly.net/webdocs/casestudies/APPNOTE.TXT> section 4.3.7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub signature: u32,
    pub version_to_extract: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub dos_time: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    /// Parse the fixed portion of a local file header. Validation is left to
    /// the caller.
    pub fn from_slice(data: &[u8; LOCAL_HEADER_LEN]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
        let u32_at =
            |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);

        LocalFileHeader {
            signature: u32_at(0),
            version_to_extract: u16_at(4),
            flags: u16_at(6),
            compression_method: u16_at(8),
            dos_time: u32_at(10),
            crc32: u32_at(14),
            compressed_size: u32_at(18),
            uncompressed_size: u32_at(22),
            filename_len: u16_at(26),
            extra_len: u16_at(28),
        }
    }

    /// Encode the header, the inverse of [`LocalFileHeader::from_slice`]
    pub fn to_bytes(&self) -> [u8; LOCAL_HEADER_LEN] {
        let mut out = [0u8; LOCAL_HEADER_LEN];
        out[0..4].copy_from_slice(&self.signature.to_le_bytes());
        out[4..6].copy_from_slice(&self.version_to_extract.to_le_bytes());
        out[6..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..10].copy_from_slice(&self.compression_method.to_le_bytes());
        out[10..14].copy_from_slice(&self.dos_time.to_le_bytes());
        out[14..18].copy_from_slice(&self.crc32.to_le_bytes());
        out[18..22].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[22..26].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        out[26..28].copy_from_slice(&self.filename_len.to_le_bytes());
        out[28..30].copy_from_slice(&self.extra_len.to_le_bytes());
        out
    }

    pub fn info(&self) -> GamestateInfo {
        GamestateInfo {
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            crc32: self.crc32,
        }
    }
}

/// Sizes and checksum declared by the gamestate entry
///
/// The decoder does not verify these. Callers that want to can compare them
/// against the decompressed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamestateInfo {
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_header_layout() {
        let data: [u8; LOCAL_HEADER_LEN] = [
            0x50, 0x4b, 0x03, 0x04, // signature
            0x14, 0x00, // version
            0x00, 0x00, // flags
            0x08, 0x00, // deflate
            0x9a, 0x5c, 0x21, 0x58, // time and date
            0x78, 0x56, 0x34, 0x12, // crc32
            0x10, 0x00, 0x00, 0x00, // compressed size
            0x20, 0x00, 0x00, 0x00, // uncompressed size
            0x09, 0x00, // filename length
            0x04, 0x00, // extra length
        ];

        let header = LocalFileHeader::from_slice(&data);
        assert_eq!(header.signature, ZIP_MAGIC);
        assert_eq!(header.version_to_extract, 20);
        assert_eq!(header.compression_method, DEFLATE_METHOD);
        assert_eq!(header.dos_time, 0x58215c9a);
        assert_eq!(
            header.info(),
            GamestateInfo {
                compressed_size: 16,
                uncompressed_size: 32,
                crc32: 0x12345678,
            }
        );
        assert_eq!(header.filename_len, 9);
        assert_eq!(header.extra_len, 4);
        assert_eq!(header.to_bytes(), data);
    }
}
