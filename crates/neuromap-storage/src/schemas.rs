//! Binary schema definitions and utilities

use crate::error::{Result, StorageError};

/// Validate magic number for a binary format
pub fn validate_magic(data: &[u8], expected: [u8; 4]) -> Result<()> {
    if data.len() < 4 {
        return Err(StorageError::invalid_format("Data too short for magic number"));
    }

    let found = [data[0], data[1], data[2], data[3]];
    if found != expected {
        return Err(StorageError::InvalidMagic { expected, found });
    }

    Ok(())
}

/// Calculate CRC32 checksum
pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate checksum
pub fn validate_checksum(data: &[u8], expected: u32) -> Result<()> {
    let computed = calculate_checksum(data);
    if computed != expected {
        return Err(StorageError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// Little-endian cursor over a byte slice with bounds-checked reads
pub(crate) struct LeReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> LeReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let end = self.offset + N;
        if end > self.data.len() {
            return Err(StorageError::invalid_format(format!(
                "Data too short for {}: need {} bytes at offset {}, have {}",
                what,
                N,
                self.offset,
                self.data.len()
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..end]);
        self.offset = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take::<1>(what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take::<2>(what)?))
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take::<4>(what)?))
    }

    pub(crate) fn i32(&mut self, what: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take::<4>(what)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic;

    #[test]
    fn test_magic_validation() {
        let data = [0x53, 0x59, 0x4E, 0x42, 0x00, 0x00]; // SYNB + padding
        assert!(validate_magic(&data, magic::SYNB).is_ok());

        let bad_data = [0x00, 0x00, 0x00, 0x00];
        assert!(validate_magic(&bad_data, magic::SYNB).is_err());
        assert!(validate_magic(&[0x53], magic::SYNB).is_err());
    }

    #[test]
    fn test_checksum() {
        let data = b"hello world";
        let checksum = calculate_checksum(data);
        assert!(validate_checksum(data, checksum).is_ok());
        assert!(validate_checksum(data, checksum + 1).is_err());
    }

    #[test]
    fn test_le_reader() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&(-3i32).to_le_bytes());
        bytes.extend_from_slice(&300u16.to_le_bytes());
        bytes.push(9);

        let mut reader = LeReader::new(&bytes);
        assert_eq!(reader.u32("a").unwrap(), 7);
        assert_eq!(reader.i32("b").unwrap(), -3);
        assert_eq!(reader.u16("c").unwrap(), 300);
        assert_eq!(reader.u8("d").unwrap(), 9);
        assert_eq!(reader.offset(), 11);
        assert!(reader.u8("e").is_err());
    }
}
