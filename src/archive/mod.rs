//! Named groups and typed attributes on top of the Ogawa container.
//!
//! Ogawa only knows anonymous groups and data blocks. This layer gives every
//! node a name and a kind so a file can be walked like a directory tree:
//!
//! ```text
//! node (ogawa group)
//! +-- [0] data: node name (UTF-8)
//! +-- [1] data: kind byte (0 = group, 1 = attribute)
//! +-- [2..] group nodes: child nodes      (kind == group)
//! +-- [2]   data: encoded attribute value (kind == attribute)
//! ```
//!
//! The Ogawa root group is itself a group node with an empty name.

mod attribute;
mod reader;
mod writer;

pub use attribute::*;
pub use reader::*;
pub use writer::*;

/// Index of the name block inside a node.
pub(crate) const NODE_NAME_INDEX: u64 = 0;
/// Index of the kind block inside a node.
pub(crate) const NODE_KIND_INDEX: u64 = 1;
/// Index of the first payload child inside a node.
pub(crate) const NODE_FIRST_CHILD: u64 = 2;

/// What a node in the archive holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeKind {
    /// Container of child nodes
    Group = 0,
    /// Single typed value
    Attribute = 1,
}

impl NodeKind {
    /// Convert from the on-disk byte.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Group),
            1 => Some(Self::Attribute),
            _ => None,
        }
    }
}
