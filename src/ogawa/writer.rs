//! Ogawa container writer.
//!
//! Data blocks are appended as soon as they are handed over; groups are
//! written once all of their children have positions, so a hierarchy is
//! always flushed bottom-up. The header's root position and frozen flag are
//! patched in last.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use crate::util::{Error, Result};

/// Output stream for writing Ogawa data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create the output file.
    ///
    /// With `overwrite == false` an existing file is left untouched and
    /// [`Error::FileAlreadyExists`] is returned.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::FileAlreadyExists(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
        })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Seek to a position and return it.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        self.pos = self.writer.seek(SeekFrom::Start(pos))?;
        Ok(self.pos)
    }

    /// Seek to end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        self.pos = self.writer.seek(SeekFrom::End(0))?;
        Ok(self.pos)
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Ogawa archive writer.
pub struct OArchive {
    stream: OStream,
    frozen: bool,
}

impl OArchive {
    /// Create a container and write its provisional header.
    pub fn create(path: impl AsRef<Path>, overwrite: bool) -> Result<Self> {
        let mut stream = OStream::create(path, overwrite)?;

        stream.write_bytes(OGAWA_MAGIC)?;
        stream.write_u8(NOT_FROZEN_FLAG)?;
        stream.write_bytes(&CURRENT_VERSION.to_be_bytes())?;
        stream.write_u64(0)?; // Root position placeholder.

        Ok(Self { stream, frozen: false })
    }

    /// Check if the archive has been finalized.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Append a data block and return its child pointer.
    pub fn write_data(&mut self, data: &[u8]) -> Result<u64> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        if data.is_empty() {
            return Ok(EMPTY_DATA);
        }

        let pos = self.stream.pos();
        self.stream.write_u64(data.len() as u64)?;
        self.stream.write_bytes(data)?;
        Ok(make_data_offset(pos))
    }

    /// Append a group from already written child pointers and return its
    /// child pointer.
    pub fn write_group(&mut self, children: &[u64]) -> Result<u64> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        if children.is_empty() {
            return Ok(EMPTY_GROUP);
        }

        let pos = self.stream.pos();
        self.stream.write_u64(children.len() as u64)?;
        for &child in children {
            self.stream.write_u64(child)?;
        }
        Ok(make_group_offset(pos))
    }

    /// Write the root group, patch the header and freeze the archive.
    pub fn finalize(&mut self, root_children: &[u64]) -> Result<()> {
        let root = self.write_group(root_children)?;

        self.frozen = true;
        self.stream.seek(FROZEN_OFFSET as u64)?;
        self.stream.write_u8(FROZEN_FLAG)?;
        self.stream.seek(ROOT_POS_OFFSET as u64)?;
        self.stream.write_u64(extract_offset(root))?;
        self.stream.seek_end()?;
        self.stream.flush()
    }

    /// Finalize with an empty root if needed and flush.
    pub fn close(mut self) -> Result<()> {
        if !self.frozen {
            self.finalize(&[])?;
        }
        self.stream.flush()
    }
}
