// Copyright (c) 2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! Positioned little-endian reads over the underlying handle.

use crate::error::{Result, ZipError};

use std::io::{Read, Seek, SeekFrom};

pub(crate) fn read_u32(mut reader: impl Read) -> Result<u32> {
    let mut buffer = [0; 4];
    reader.read_exact(&mut buffer)?;
    Ok(u32::from_le_bytes(buffer))
}

pub(crate) fn read_u64(mut reader: impl Read) -> Result<u64> {
    let mut buffer = [0; 8];
    reader.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

/// Read and return a dynamic length vector of bytes from a reader.
///
/// Fails with an unexpected EOF rather than returning a short vector.
pub(crate) fn read_bytes(reader: impl Read, length: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(length);
    reader.take(length as u64).read_to_end(&mut buffer)?;

    if buffer.len() != length {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }

    Ok(buffer)
}

/// Seek to an absolute offset and read a fixed number of bytes from there.
pub(crate) fn read_bytes_at<R: Read + Seek>(reader: &mut R, offset: u64, length: usize) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    read_bytes(reader, length)
}

/// Assert that the next four-byte signature read by a reader matches the expected signature.
pub(crate) fn assert_signature(reader: impl Read, expected: u32) -> Result<()> {
    match read_u32(reader)? {
        actual if actual == expected => Ok(()),
        actual => Err(ZipError::UnexpectedHeaderError(actual, expected)),
    }
}
