use anyhow::{bail, Error};
use sha2::{Digest, Sha256};

use super::file_formats::*;

const MAX_BLOB_SIZE: usize = 128 * 1024 * 1024;

/// A chunk as it is stored on disk: tagged, optionally zstd-compressed, CRC-guarded.
///
/// Please use index files to reference chunks; a `DataBlob` on its own carries no
/// notion of content digest, it is purely a container format.
pub struct DataBlob {
    raw_data: Vec<u8>,
}

impl DataBlob {
    /// accessor to raw_data field
    pub fn raw_data(&self) -> &[u8] {
        &self.raw_data
    }

    /// Returns raw_data size
    pub fn raw_size(&self) -> u64 {
        self.raw_data.len() as u64
    }

    /// Consume self and returns raw_data
    pub fn into_inner(self) -> Vec<u8> {
        self.raw_data
    }

    /// accessor to chunk type (magic number)
    pub fn magic(&self) -> &[u8; 8] {
        self.raw_data[0..8].try_into().unwrap()
    }

    /// accessor to crc32 checksum
    pub fn crc(&self) -> u32 {
        u32::from_le_bytes(
            self.raw_data[CRC_OFFSET..CRC_OFFSET + 4]
                .try_into()
                .unwrap(),
        )
    }

    fn set_crc(&mut self, crc: u32) {
        self.raw_data[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
    }

    /// compute the CRC32 checksum
    pub fn compute_crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let start = header_size(self.magic()); // start after HEAD
        hasher.update(&self.raw_data[start..]);
        hasher.finalize()
    }

    /// verify the CRC32 checksum
    pub fn verify_crc(&self) -> Result<(), Error> {
        let expected_crc = self.compute_crc();
        if expected_crc != self.crc() {
            bail!("chunk blob has wrong CRC checksum.");
        }
        Ok(())
    }

    /// Create a DataBlob, optionally zstd-compressed.
    pub fn encode(data: &[u8], compress: bool) -> Result<Self, Error> {
        if data.len() > MAX_BLOB_SIZE {
            bail!("chunk blob too large ({} bytes).", data.len());
        }

        let max_data_len = data.len() + HEADER_SIZE;

        let mut blob = if compress {
            let mut comp_data = Vec::with_capacity(max_data_len);
            comp_data.extend_from_slice(&COMPRESSED_BLOB_MAGIC_1_0);
            comp_data.extend_from_slice(&[0u8; 4]);

            zstd::stream::copy_encode(data, &mut comp_data, 1)?;

            if comp_data.len() < max_data_len {
                let mut blob = DataBlob {
                    raw_data: comp_data,
                };
                blob.set_crc(blob.compute_crc());
                return Ok(blob);
            }

            None
        } else {
            None
        };

        if blob.is_none() {
            let mut raw_data = Vec::with_capacity(max_data_len);
            raw_data.extend_from_slice(&UNCOMPRESSED_BLOB_MAGIC_1_0);
            raw_data.extend_from_slice(&[0u8; 4]);
            raw_data.extend_from_slice(data);

            blob = Some(DataBlob { raw_data });
        }

        let mut blob = blob.unwrap();
        blob.set_crc(blob.compute_crc());

        Ok(blob)
    }

    /// Decode blob data, optionally verifying it against an expected digest.
    pub fn decode(&self, digest: Option<&[u8; 32]>) -> Result<Vec<u8>, Error> {
        let magic = self.magic();

        let data = if magic == &UNCOMPRESSED_BLOB_MAGIC_1_0 {
            let data_start = HEADER_SIZE;
            self.raw_data[data_start..].to_vec()
        } else if magic == &COMPRESSED_BLOB_MAGIC_1_0 {
            let data_start = HEADER_SIZE;
            let mut reader = &self.raw_data[data_start..];
            zstd::stream::decode_all(&mut reader)?
        } else {
            bail!("invalid chunk blob magic number.");
        };

        if let Some(digest) = digest {
            Self::verify_digest(&data, digest)?;
        }

        Ok(data)
    }

    /// Load blob from ``reader``, verify CRC
    pub fn load_from_reader(reader: &mut dyn std::io::Read) -> Result<Self, Error> {
        let mut data = Vec::with_capacity(1024 * 1024);
        reader.read_to_end(&mut data)?;

        let blob = Self::from_raw(data)?;

        blob.verify_crc()?;

        Ok(blob)
    }

    /// Create Instance from raw data
    pub fn from_raw(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() < HEADER_SIZE {
            bail!("chunk blob too small ({} bytes).", data.len());
        }

        let magic = &data[0..8];

        if magic == COMPRESSED_BLOB_MAGIC_1_0 || magic == UNCOMPRESSED_BLOB_MAGIC_1_0 {
            Ok(DataBlob { raw_data: data })
        } else {
            bail!("unable to parse raw chunk blob - wrong magic");
        }
    }

    /// Returns if chunk is compressed
    pub fn is_compressed(&self) -> bool {
        self.magic() == &COMPRESSED_BLOB_MAGIC_1_0
    }

    /// Verify digest and data length.
    ///
    /// Decompresses if necessary. Does not call `verify_crc`, which is usually
    /// already done by the caller while loading the blob from disk.
    pub fn verify_unencrypted(
        &self,
        expected_chunk_size: usize,
        expected_digest: &[u8; 32],
    ) -> Result<(), Error> {
        // verifies digest!
        let data = self.decode(Some(expected_digest))?;

        if expected_chunk_size != data.len() {
            bail!(
                "detected chunk with wrong length ({} != {})",
                expected_chunk_size,
                data.len()
            );
        }

        Ok(())
    }

    fn verify_digest(data: &[u8], expected_digest: &[u8; 32]) -> Result<(), Error> {
        let digest: [u8; 32] = Sha256::digest(data).into();
        if &digest != expected_digest {
            bail!("detected chunk with wrong digest.");
        }

        Ok(())
    }
}

/// Builder for chunk DataBlobs
///
/// Main purpose is to centralize digest computation so a chunk's identity and its
/// on-disk blob are always derived from the same input bytes.
pub struct DataChunkBuilder<'a> {
    orig_data: &'a [u8],
    digest_computed: bool,
    digest: [u8; 32],
    compress: bool,
}

impl<'a> DataChunkBuilder<'a> {
    /// Create a new builder instance.
    pub fn new(orig_data: &'a [u8]) -> Self {
        Self {
            orig_data,
            digest_computed: false,
            digest: [0u8; 32],
            compress: true,
        }
    }

    /// Set compression flag.
    ///
    /// If true, chunk data is compressed using zstd (level 1).
    pub fn compress(mut self, value: bool) -> Self {
        self.compress = value;
        self
    }

    fn compute_digest(&mut self) {
        if !self.digest_computed {
            self.digest = Sha256::digest(self.orig_data).into();
            self.digest_computed = true;
        }
    }

    /// Returns the chunk digest
    pub fn digest(&mut self) -> &[u8; 32] {
        if !self.digest_computed {
            self.compute_digest();
        }
        &self.digest
    }

    /// Consume self and build the ``DataBlob``.
    ///
    /// Returns the blob and the computed digest.
    pub fn build(mut self) -> Result<(DataBlob, [u8; 32]), Error> {
        if !self.digest_computed {
            self.compute_digest();
        }

        let chunk = DataBlob::encode(self.orig_data, self.compress)?;
        Ok((chunk, self.digest))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let data = b"some chunk payload, repeated ".repeat(64);
        let (blob, digest) = DataChunkBuilder::new(&data).compress(true).build().unwrap();
        blob.verify_crc().unwrap();
        assert!(blob.is_compressed());
        let decoded = blob.decode(Some(&digest)).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn wrong_digest_is_rejected() {
        let data = b"payload";
        let (blob, _digest) = DataChunkBuilder::new(data).build().unwrap();
        let wrong = [0u8; 32];
        assert!(blob.decode(Some(&wrong)).is_err());
    }
}
