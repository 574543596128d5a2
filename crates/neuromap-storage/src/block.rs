//! Synaptic block format: one (pre-slice, post-slice) pair's connection records
//!
//! A block is a fixed 40-byte header followed by `num_records` fixed 16-byte
//! records, all little endian:
//!
//! ```text
//! header:  magic[4] version:u32 projection:u32
//!          pre_lo:u32 pre_hi:u32 post_lo:u32 post_hi:u32
//!          num_records:u32 data_checksum:u32 header_checksum:u32
//! record:  source:u32 target:u32 weight:i32 delay:u16 synapse_type:u8 reserved:u8
//! ```

use crate::{
    error::{Result, StorageError},
    ids::{NeuronId, ProjectionId},
    magic,
    schemas::{calculate_checksum, validate_checksum, validate_magic, LeReader},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bit widths and sizes of the hardware row format
pub mod layout {
    /// Width of the source index field
    pub const SOURCE_BITS: u32 = 32;
    /// Width of the target index field
    pub const TARGET_BITS: u32 = 32;
    /// Width of the signed fixed-point weight field
    pub const WEIGHT_BITS: u32 = 32;
    /// Width of the delay field, in time steps
    pub const DELAY_BITS: u32 = 16;
    /// Width of the synapse type tag
    pub const SYNAPSE_TYPE_BITS: u32 = 8;
    /// Bytes per encoded connection record
    pub const RECORD_SIZE: usize = 16;
    /// Bytes per encoded block header
    pub const HEADER_SIZE: usize = 40;
}

/// Current block format version
pub const BLOCK_VERSION: u32 = 1;

/// Half-open atom range `[lo, hi)` recorded in a block header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomRange {
    /// First atom
    pub lo: u32,
    /// One past the last atom
    pub hi: u32,
}

impl AtomRange {
    /// Create a new range
    pub const fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    /// Number of atoms covered
    pub const fn len(&self) -> u32 {
        self.hi.saturating_sub(self.lo)
    }

    /// True when no atoms are covered
    pub const fn is_empty(&self) -> bool {
        self.hi <= self.lo
    }

    /// Whether a population-global index lies inside the range
    pub const fn contains(&self, index: u32) -> bool {
        index >= self.lo && index < self.hi
    }
}

/// One directed synaptic edge in device format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionRecord {
    /// Population-global pre-synaptic index
    pub source: NeuronId,
    /// Population-global post-synaptic index
    pub target: NeuronId,
    /// Raw S16.15 weight
    pub weight: i32,
    /// Delay in time steps
    pub delay: u16,
    /// Synapse type tag
    pub synapse_type: u8,
}

impl ConnectionRecord {
    /// Create a new record
    pub const fn new(
        source: NeuronId,
        target: NeuronId,
        weight: i32,
        delay: u16,
        synapse_type: u8,
    ) -> Self {
        Self {
            source,
            target,
            weight,
            delay,
            synapse_type,
        }
    }

    /// Append the 16-byte encoding to `out`
    pub fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.source.raw().to_le_bytes());
        out.extend_from_slice(&self.target.raw().to_le_bytes());
        out.extend_from_slice(&self.weight.to_le_bytes());
        out.extend_from_slice(&self.delay.to_le_bytes());
        out.push(self.synapse_type);
        out.push(0);
    }

    fn read_le(reader: &mut LeReader<'_>) -> Result<Self> {
        let source = NeuronId::new(reader.u32("record source")?);
        let target = NeuronId::new(reader.u32("record target")?);
        let weight = reader.i32("record weight")?;
        let delay = reader.u16("record delay")?;
        let synapse_type = reader.u8("record synapse type")?;
        let _reserved = reader.u8("record padding")?;
        Ok(Self::new(source, target, weight, delay, synapse_type))
    }
}

/// Synaptic block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapticBlockHeader {
    /// Magic number "SYNB"
    pub magic: [u8; 4],
    /// Schema version (current: 1)
    pub version: u32,
    /// Owning projection
    pub projection: ProjectionId,
    /// Pre-synaptic slice
    pub pre: AtomRange,
    /// Post-synaptic slice
    pub post: AtomRange,
    /// Number of records following the header
    pub num_records: u32,
    /// CRC32 of the record bytes
    pub data_checksum: u32,
    /// CRC32 of the header with this field zeroed
    pub header_checksum: u32,
}

impl SynapticBlockHeader {
    /// Create a new header for a slice pair
    pub fn new(projection: ProjectionId, pre: AtomRange, post: AtomRange) -> Self {
        Self {
            magic: magic::SYNB,
            version: BLOCK_VERSION,
            projection,
            pre,
            post,
            num_records: 0,
            data_checksum: 0,
            header_checksum: 0,
        }
    }

    /// Validate magic and version
    pub fn validate(&self) -> Result<()> {
        validate_magic(&self.magic, magic::SYNB)?;

        if self.version != BLOCK_VERSION {
            return Err(StorageError::UnsupportedVersion {
                version: self.version,
                supported: BLOCK_VERSION,
            });
        }

        Ok(())
    }

    /// Encode the header
    pub fn to_bytes(&self) -> [u8; layout::HEADER_SIZE] {
        let mut bytes = Vec::with_capacity(layout::HEADER_SIZE);
        bytes.extend_from_slice(&self.magic);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.projection.raw().to_le_bytes());
        bytes.extend_from_slice(&self.pre.lo.to_le_bytes());
        bytes.extend_from_slice(&self.pre.hi.to_le_bytes());
        bytes.extend_from_slice(&self.post.lo.to_le_bytes());
        bytes.extend_from_slice(&self.post.hi.to_le_bytes());
        bytes.extend_from_slice(&self.num_records.to_le_bytes());
        bytes.extend_from_slice(&self.data_checksum.to_le_bytes());
        bytes.extend_from_slice(&self.header_checksum.to_le_bytes());

        let mut out = [0u8; layout::HEADER_SIZE];
        out.copy_from_slice(&bytes);
        out
    }

    /// Decode a header without checking it
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = LeReader::new(data);
        Ok(Self {
            magic: reader.take::<4>("block magic")?,
            version: reader.u32("block version")?,
            projection: ProjectionId::new(reader.u32("projection id")?),
            pre: AtomRange::new(reader.u32("pre lo")?, reader.u32("pre hi")?),
            post: AtomRange::new(reader.u32("post lo")?, reader.u32("post hi")?),
            num_records: reader.u32("record count")?,
            data_checksum: reader.u32("data checksum")?,
            header_checksum: reader.u32("header checksum")?,
        })
    }

    fn checksum_bytes(&self) -> [u8; layout::HEADER_SIZE] {
        let mut copy = *self;
        copy.header_checksum = 0;
        copy.to_bytes()
    }

    /// Calculate and update the header checksum
    pub fn update_header_checksum(&mut self) {
        self.header_checksum = calculate_checksum(&self.checksum_bytes());
    }

    /// Verify the header checksum
    pub fn verify_header_checksum(&self) -> Result<()> {
        validate_checksum(&self.checksum_bytes(), self.header_checksum)
    }
}

/// Header plus records for one slice pair
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapticBlock {
    /// Header information
    pub header: SynapticBlockHeader,
    /// Connection records in generation order
    pub records: Vec<ConnectionRecord>,
}

impl SynapticBlock {
    /// Create a new empty block
    pub fn new(projection: ProjectionId, pre: AtomRange, post: AtomRange) -> Self {
        Self {
            header: SynapticBlockHeader::new(projection, pre, post),
            records: Vec::new(),
        }
    }

    /// Create a finalized block from records
    pub fn from_records(
        projection: ProjectionId,
        pre: AtomRange,
        post: AtomRange,
        records: Vec<ConnectionRecord>,
    ) -> Result<Self> {
        let mut block = Self {
            header: SynapticBlockHeader::new(projection, pre, post),
            records,
        };
        block.finalize()?;
        Ok(block)
    }

    /// Add a record
    pub fn push(&mut self, record: ConnectionRecord) {
        self.records.push(record);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the block holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.records.len() * layout::RECORD_SIZE);
        for record in &self.records {
            record.write_le(&mut bytes);
        }
        bytes
    }

    /// Finalize the block and update checksums
    pub fn finalize(&mut self) -> Result<()> {
        let count = u32::try_from(self.records.len()).map_err(|_| {
            StorageError::field_overflow("num_records", self.records.len() as u64, u32::MAX as u64)
        })?;
        self.header.num_records = count;
        self.header.data_checksum = calculate_checksum(&self.record_bytes());
        self.header.update_header_checksum();
        Ok(())
    }

    /// Check that every record lies inside the header's slice ranges
    pub fn validate_records(&self) -> Result<()> {
        for (i, record) in self.records.iter().enumerate() {
            if !self.header.pre.contains(record.source.raw()) {
                return Err(StorageError::invalid_format(format!(
                    "record {} source {} outside pre slice [{}, {})",
                    i, record.source.raw(), self.header.pre.lo, self.header.pre.hi
                )));
            }
            if !self.header.post.contains(record.target.raw()) {
                return Err(StorageError::invalid_format(format!(
                    "record {} target {} outside post slice [{}, {})",
                    i, record.target.raw(), self.header.post.lo, self.header.post.hi
                )));
            }
        }
        Ok(())
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        layout::HEADER_SIZE + self.records.len() * layout::RECORD_SIZE
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.header.to_bytes());
        for record in &self.records {
            record.write_le(&mut bytes);
        }
        bytes
    }

    /// Decode one block from the front of `data`, returning it and the bytes consumed
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize)> {
        let header = SynapticBlockHeader::from_bytes(data)?;
        header.validate()?;
        header.verify_header_checksum()?;

        let records_len = header.num_records as usize * layout::RECORD_SIZE;
        let end = layout::HEADER_SIZE + records_len;
        if data.len() < end {
            return Err(StorageError::invalid_format(format!(
                "Data too short for {} records: need {} bytes, have {}",
                header.num_records,
                end,
                data.len()
            )));
        }

        let payload = &data[layout::HEADER_SIZE..end];
        validate_checksum(payload, header.data_checksum)?;

        let mut reader = LeReader::new(payload);
        let mut records = Vec::with_capacity(header.num_records as usize);
        for _ in 0..header.num_records {
            records.push(ConnectionRecord::read_le(&mut reader)?);
        }

        Ok((Self { header, records }, end))
    }

    /// Load from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (block, used) = Self::decode_prefix(data)?;
        if used != data.len() {
            log::debug!("ignoring {} trailing bytes after synaptic block", data.len() - used);
        }
        Ok(block)
    }
}
