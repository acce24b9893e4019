//! Low-level Ogawa binary container.
//!
//! Field3D files are Ogawa containers: an append-only file of data blocks
//! and groups of child pointers, closed by a header that records where the
//! root group lives.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "Ogawa"   |  5 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 BE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! A data block is a u64 byte count followed by the bytes. A group is a u64
//! child count followed by one u64 pointer per child; the pointer's MSB is
//! set for data and clear for groups.

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
