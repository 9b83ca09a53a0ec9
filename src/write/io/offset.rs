// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use std::io::{Seek, SeekFrom, Write};

/// A wrapper around a [`Write`] implementation which tracks the current byte offset.
///
/// The offset only moves forward through writes, or backward through [`OffsetWriter::rewind()`]. Headers written
/// before their sizes are known are fixed up in place with [`OffsetWriter::patch()`], which leaves the offset where it
/// was.
pub struct OffsetWriter<W> {
    inner: W,
    offset: u64,
}

impl<W> OffsetWriter<W>
where
    W: Write + Seek,
{
    /// Constructs a new wrapper from an inner [`Write`] writer, positioned at its start.
    pub fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    /// Returns the current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Consumes this wrapper and returns the inner [`Write`] writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn inner_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Moves the offset back to an earlier position; anything after it will be overwritten.
    pub fn rewind(&mut self, offset: u64) -> std::io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Overwrites already written bytes at an absolute position without moving the offset.
    pub fn patch(&mut self, at: u64, bytes: &[u8]) -> std::io::Result<()> {
        if at + bytes.len() as u64 > self.offset {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "patch extends past the written data"));
        }

        self.inner.seek(SeekFrom::Start(at))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.offset))?;
        Ok(())
    }
}

impl<W> Write for OffsetWriter<W>
where
    W: Write + Seek,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.offset += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
