// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! <https://github.com/Majored/rs-async-zip/blob/main/SPECIFICATION.md#4316>
//!
//! The end of central directory record may be followed by a variable-length comment, so we can't assume it starts
//! 22 bytes before the end of the data; we must locate it ourselves.
//!
//! The data is read backwards in fixed-size windows, each of which is searched in reverse for the signature.
//! Consecutive windows overlap by three bytes so a signature straddling a window boundary is still seen. The search
//! never goes further back than the longest comment the record can describe.

use crate::error::LocatorError;
use crate::spec::consts::{EOCDR_LENGTH, EOCDR_MAX_COMMENT_LENGTH, EOCDR_SIGNATURE, SIGNATURE_LENGTH};

use std::io::{Read, Seek, SeekFrom};

/// The buffer size used when locating the EOCDR, equal to 2KiB.
const BUFFER_SIZE: usize = 2048;

/// The smallest possible record: its signature and fixed fields with an empty comment.
const EOCDR_MIN_LENGTH: u64 = (SIGNATURE_LENGTH + EOCDR_LENGTH) as u64;

/// How far back from the end of the data the signature can start.
const EOCDR_SEARCH_LIMIT: u64 = EOCDR_MIN_LENGTH + EOCDR_MAX_COMMENT_LENGTH as u64;

/// Locate the `end of central directory record` offset, if one exists.
///
/// The returned offset is that of the record's signature. The last signature found wins.
pub(crate) fn eocdr<R>(reader: &mut R) -> Result<u64, LocatorError>
where
    R: Read + Seek,
{
    let length = reader.seek(SeekFrom::End(0))?;
    if length < EOCDR_MIN_LENGTH {
        return Err(LocatorError::TooShort(length));
    }

    let signature = EOCDR_SIGNATURE.to_le_bytes();
    let lower_bound = length.saturating_sub(EOCDR_SEARCH_LIMIT);
    let mut buffer = [0; BUFFER_SIZE];

    // Exclusive end of the current window; a signature must end before the record's fixed fields.
    let mut window_end = length - EOCDR_LENGTH as u64;

    loop {
        let window_start = window_end.saturating_sub(BUFFER_SIZE as u64).max(lower_bound);
        let window = &mut buffer[..(window_end - window_start) as usize];

        reader.seek(SeekFrom::Start(window_start))?;
        reader.read_exact(window)?;

        if let Some(index) = reverse_search_buffer(window, &signature) {
            let offset = window_start + index as u64;
            tracing::debug!(offset, "located end of central directory record");
            return Ok(offset);
        }

        if window_start == lower_bound {
            return Err(LocatorError::NotFound);
        }

        window_end = window_start + (SIGNATURE_LENGTH - 1) as u64;
    }
}

/// A reverse linear search along the buffer for the specified signature bytes, returning where the match starts.
pub(crate) fn reverse_search_buffer(buffer: &[u8], signature: &[u8]) -> Option<usize> {
    buffer.windows(signature.len()).rposition(|window| window == signature)
}
