// WARNING: PLEASE DO NOT MODIFY THOSE MAGIC VALUES

// sha256(b"bincache uncompressed chunk blob v1.0")[0..8]
pub const UNCOMPRESSED_BLOB_MAGIC_1_0: [u8; 8] = [66, 171, 56, 7, 190, 131, 112, 161];

// sha256(b"bincache zstd compressed chunk blob v1.0")[0..8]
pub const COMPRESSED_BLOB_MAGIC_1_0: [u8; 8] = [49, 185, 88, 66, 111, 182, 163, 127];

/// Byte offset of the CRC32 field within the header (right after the magic).
pub const CRC_OFFSET: usize = 8;

/// Chunk binary storage format.
///
/// The format starts with an 8 byte magic number identifying whether the payload is
/// stored raw or zstd-compressed, followed by a 4 byte CRC32 of everything after the
/// header. The chunk store never rewrites a chunk's payload once inserted, so the CRC
/// only needs to guard against on-disk bit rot, not against re-encoding drift.
///
/// (MAGIC || CRC32 || Data)
pub const HEADER_SIZE: usize = CRC_OFFSET + 4;

/// Header size for a chunk blob.
///
/// Panics on unknown magic numbers.
pub fn header_size(magic: &[u8; 8]) -> usize {
    match *magic {
        UNCOMPRESSED_BLOB_MAGIC_1_0 => HEADER_SIZE,
        COMPRESSED_BLOB_MAGIC_1_0 => HEADER_SIZE,
        _ => panic!("unknown blob magic"),
    }
}
