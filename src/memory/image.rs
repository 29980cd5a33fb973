//! The emulated machine's backing store.
//!
//! [`MemoryImage`] is the one mutable byte buffer representing the door's RAM.
//! It is mutated exclusively by the loaders at install time and by the library
//! emulators at run time, on behalf of the running program. All access is
//! range-validated; see [`crate::Error::MemoryFault`] for the fault policy.

use crate::Result;

/// Mask applied to every emulated address before validation.
///
/// The 68000 drives 24 address lines, so addresses wrap within a 16 MiB space
/// before they are checked against the configured buffer length. An address
/// that survives the mask but falls outside the buffer is a hard fault.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// An owned, fixed-length byte buffer representing the emulated machine's RAM.
///
/// The buffer is allocated zero-filled at session start and addressed within a
/// conceptual 24-bit space. Reads and writes are big-endian, matching the CPU.
///
/// # Examples
///
/// ```rust
/// use amidoor::memory::MemoryImage;
///
/// let mut memory = MemoryImage::new(0x1000);
/// memory.write_u32(0x100, 0xDEAD_BEEF)?;
/// assert_eq!(memory.read_u32(0x100)?, 0xDEAD_BEEF);
/// assert_eq!(memory.read_u16(0x102)?, 0xBEEF);
///
/// // Out-of-range access is a reportable fault, never a wraparound.
/// assert!(memory.read_u8(0x1000).is_err());
/// # Ok::<(), amidoor::Error>(())
/// ```
pub struct MemoryImage {
    bytes: Vec<u8>,
}

impl MemoryImage {
    /// Allocate a zero-filled memory image of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        MemoryImage {
            bytes: vec![0; size],
        }
    }

    /// Returns the configured size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the image has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validate an access of `len` bytes at `address`, returning the buffer offset.
    fn check(&self, address: u32, len: u32) -> Result<usize> {
        let masked = address & ADDRESS_MASK;
        let end = u64::from(masked) + u64::from(len);
        if end > self.bytes.len() as u64 {
            return Err(crate::Error::MemoryFault { address, len });
        }
        Ok(masked as usize)
    }

    /// Read one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if `address` is outside the image.
    pub fn read_u8(&self, address: u32) -> Result<u8> {
        let offset = self.check(address, 1)?;
        Ok(self.bytes[offset])
    }

    /// Read a big-endian 16-bit word.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the access leaves the image.
    pub fn read_u16(&self, address: u32) -> Result<u16> {
        let offset = self.check(address, 2)?;
        Ok(u16::from_be_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
        ]))
    }

    /// Read a big-endian 32-bit word.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the access leaves the image.
    pub fn read_u32(&self, address: u32) -> Result<u32> {
        let offset = self.check(address, 4)?;
        Ok(u32::from_be_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ]))
    }

    /// Write one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if `address` is outside the image.
    pub fn write_u8(&mut self, address: u32, value: u8) -> Result<()> {
        let offset = self.check(address, 1)?;
        self.bytes[offset] = value;
        Ok(())
    }

    /// Write a big-endian 16-bit word.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the access leaves the image.
    pub fn write_u16(&mut self, address: u32, value: u16) -> Result<()> {
        let offset = self.check(address, 2)?;
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Write a big-endian 32-bit word.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the access leaves the image.
    pub fn write_u32(&mut self, address: u32, value: u32) -> Result<()> {
        let offset = self.check(address, 4)?;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Borrow `len` bytes starting at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the range leaves the image.
    pub fn read_bytes(&self, address: u32, len: u32) -> Result<&[u8]> {
        let offset = self.check(address, len)?;
        Ok(&self.bytes[offset..offset + len as usize])
    }

    /// Copy `bytes` into the image starting at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the range leaves the image.
    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        let offset = self.check(address, bytes.len() as u32)?;
        self.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Fill `len` bytes starting at `address` with `value`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MemoryFault`] if the range leaves the image.
    pub fn fill(&mut self, address: u32, len: u32, value: u8) -> Result<()> {
        let offset = self.check(address, len)?;
        self.bytes[offset..offset + len as usize].fill(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_widths() {
        let mut memory = MemoryImage::new(0x100);
        memory.write_u8(0, 0xAB).unwrap();
        memory.write_u16(2, 0x1234).unwrap();
        memory.write_u32(4, 0xCAFE_BABE).unwrap();
        assert_eq!(memory.read_u8(0).unwrap(), 0xAB);
        assert_eq!(memory.read_u16(2).unwrap(), 0x1234);
        assert_eq!(memory.read_u32(4).unwrap(), 0xCAFE_BABE);
    }

    #[test]
    fn big_endian_byte_order() {
        let mut memory = MemoryImage::new(8);
        memory.write_u32(0, 0x0102_0304).unwrap();
        assert_eq!(memory.read_bytes(0, 4).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_is_a_fault() {
        let mut memory = MemoryImage::new(16);
        assert!(matches!(
            memory.read_u32(14),
            Err(crate::Error::MemoryFault { address: 14, len: 4 })
        ));
        assert!(memory.write_u8(16, 0).is_err());
        assert!(memory.write_bytes(12, &[0; 8]).is_err());
    }

    #[test]
    fn straddling_access_does_not_wrap() {
        let memory = MemoryImage::new(16);
        // End of the 24-bit space: masked address is fine, length is not.
        assert!(memory.read_u32(0x00FF_FFFE).is_err());
    }

    #[test]
    fn addresses_mask_to_24_bits() {
        let mut memory = MemoryImage::new(0x100);
        memory.write_u8(0x0100_0010, 7).unwrap();
        assert_eq!(memory.read_u8(0x10).unwrap(), 7);
    }
}
