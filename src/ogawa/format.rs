//! Ogawa container constants and child-pointer encoding.

/// Magic bytes at the start of every container.
pub const OGAWA_MAGIC: &[u8; 5] = b"Ogawa";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 5;

/// Offset of the big-endian format version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the root group position in the header.
pub const ROOT_POS_OFFSET: usize = 8;

/// Container format version written by this crate.
pub const CURRENT_VERSION: u16 = 1;

/// Frozen flag value once the writer has finished.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag value while a writer still holds the file.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// MSB of a child pointer: set for data blocks, clear for groups.
pub const TYPE_FLAG_MASK: u64 = 1 << 63;

/// Mask extracting the file position from a child pointer.
pub const OFFSET_MASK: u64 = !TYPE_FLAG_MASK;

/// Child pointer for an empty data block.
pub const EMPTY_DATA: u64 = TYPE_FLAG_MASK;

/// Child pointer for an empty group.
pub const EMPTY_GROUP: u64 = 0;

/// Check if a child pointer refers to a group.
#[inline]
pub const fn is_group_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) == 0
}

/// Check if a child pointer refers to a data block.
#[inline]
pub const fn is_data_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) != 0
}

/// Extract the file position from a child pointer.
#[inline]
pub const fn extract_offset(offset: u64) -> u64 {
    offset & OFFSET_MASK
}

/// Build a group child pointer.
#[inline]
pub const fn make_group_offset(pos: u64) -> u64 {
    pos & OFFSET_MASK
}

/// Build a data child pointer.
#[inline]
pub const fn make_data_offset(pos: u64) -> u64 {
    pos | TYPE_FLAG_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        let group_offset = make_group_offset(0x1234);
        assert!(is_group_offset(group_offset));
        assert!(!is_data_offset(group_offset));
        assert_eq!(extract_offset(group_offset), 0x1234);

        let data_offset = make_data_offset(0x5678);
        assert!(is_data_offset(data_offset));
        assert!(!is_group_offset(data_offset));
        assert_eq!(extract_offset(data_offset), 0x5678);
        assert_eq!(data_offset, 0x8000_0000_0000_5678);
    }

    #[test]
    fn test_empty_markers() {
        assert!(is_group_offset(EMPTY_GROUP));
        assert!(is_data_offset(EMPTY_DATA));
        assert_eq!(extract_offset(EMPTY_DATA), 0);
    }
}
