// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use std::io::Read;

use crc32fast::Hasher;

/// A wrapping reader which tallies the CRC32 and length of everything read through it.
pub(crate) struct HashedReader<R> {
    reader: R,
    hasher: Hasher,
    read: u64,
}

impl<R> HashedReader<R>
where
    R: Read,
{
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, hasher: Hasher::new(), read: 0 }
    }

    /// Returns the number of bytes read so far.
    pub(crate) fn read_count(&self) -> u64 {
        self.read
    }

    /// Returns the CRC32 of the bytes read so far.
    ///
    /// Only meaningful once EOF has been reached.
    pub(crate) fn crc32(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl<R> Read for HashedReader<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.hasher.update(&buf[..read]);
        self.read += read as u64;

        Ok(read)
    }
}
