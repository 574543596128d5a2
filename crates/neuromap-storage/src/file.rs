//! Block files: a short file header followed by concatenated synaptic blocks

use crate::{
    block::SynapticBlock,
    error::{Result, StorageError},
    magic,
    schemas::{validate_magic, LeReader},
};

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Current block file version
pub const BLOCK_FILE_VERSION: u32 = 1;

/// Bytes in the block file header: magic, version, block count
pub const FILE_HEADER_SIZE: usize = 12;

fn file_header(num_blocks: u32) -> [u8; FILE_HEADER_SIZE] {
    let mut out = [0u8; FILE_HEADER_SIZE];
    out[0..4].copy_from_slice(&magic::SYNF);
    out[4..8].copy_from_slice(&BLOCK_FILE_VERSION.to_le_bytes());
    out[8..12].copy_from_slice(&num_blocks.to_le_bytes());
    out
}

/// Streaming writer that appends blocks and patches the count on finish
pub struct BlockFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    num_blocks: u32,
}

impl BlockFileWriter {
    /// Create (or truncate) a block file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(&file_header(0))?;
        Ok(Self {
            writer,
            path,
            num_blocks: 0,
        })
    }

    /// Append one finalized block
    pub fn append(&mut self, block: &SynapticBlock) -> Result<()> {
        self.writer.write_all(&block.to_bytes())?;
        self.num_blocks = self.num_blocks.checked_add(1).ok_or_else(|| {
            StorageError::field_overflow("num_blocks", u64::from(u32::MAX) + 1, u32::MAX as u64)
        })?;
        Ok(())
    }

    /// Number of blocks written so far
    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    /// Flush, write the final block count and close the file
    pub fn finish(mut self) -> Result<u32> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&file_header(self.num_blocks))?;
        file.flush()?;
        log::debug!("wrote {} synaptic blocks to {}", self.num_blocks, self.path.display());
        Ok(self.num_blocks)
    }
}

/// Encode blocks into an in-memory block file image
pub fn encode_block_file(blocks: &[SynapticBlock]) -> Result<Vec<u8>> {
    let count = u32::try_from(blocks.len())
        .map_err(|_| StorageError::field_overflow("num_blocks", blocks.len() as u64, u32::MAX as u64))?;
    let mut bytes = file_header(count).to_vec();
    for block in blocks {
        bytes.extend_from_slice(&block.to_bytes());
    }
    Ok(bytes)
}

/// Decode a block file image, verifying every checksum
pub fn decode_block_file(data: &[u8]) -> Result<Vec<SynapticBlock>> {
    validate_magic(data, magic::SYNF)?;
    let mut reader = LeReader::new(data);
    let _magic = reader.take::<4>("file magic")?;
    let version = reader.u32("file version")?;
    if version != BLOCK_FILE_VERSION {
        return Err(StorageError::UnsupportedVersion {
            version,
            supported: BLOCK_FILE_VERSION,
        });
    }
    let num_blocks = reader.u32("block count")?;

    let mut offset = reader.offset();
    let mut blocks = Vec::with_capacity(num_blocks as usize);
    for _ in 0..num_blocks {
        let (block, used) = SynapticBlock::decode_prefix(&data[offset..])?;
        offset += used;
        blocks.push(block);
    }

    if offset != data.len() {
        return Err(StorageError::invalid_format(format!(
            "{} unexpected trailing bytes after {} blocks",
            data.len() - offset,
            num_blocks
        )));
    }
    Ok(blocks)
}

/// Read and decode a block file from disk
pub fn read_block_file<P: AsRef<Path>>(path: P) -> Result<Vec<SynapticBlock>> {
    let data = std::fs::read(path.as_ref())?;
    decode_block_file(&data)
}
