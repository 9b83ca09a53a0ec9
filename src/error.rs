// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! A module which holds relevant error reporting structures/types.
//!
//! Every [`ZipError`] falls into exactly one [`ErrorKind`], which lets batch callers (eg. a depot rescan over
//! thousands of archives) decide whether to skip a file, re-fetch it, or treat the failure as a bug in their own
//! sequencing of calls.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::SystemTime;

use thiserror::Error;

/// A Result type alias over ZipError to minimise repetition.
pub type Result<V> = std::result::Result<V, ZipError>;

/// The broad class an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container is malformed; fatal to the open/close operation.
    Structural,
    /// Data did not hash to the expected CRC32 (or size); fatal to that entry only.
    Integrity,
    /// The session was driven in an order it doesn't allow.
    State,
    /// The filesystem or underlying handle failed.
    Environmental,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Zip64ErrorCase {
    TooManyFiles,
    LargeFile,
}

impl Display for Zip64ErrorCase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyFiles => write!(f, "More than 65536 files in archive"),
            Self::LargeFile => write!(f, "File is larger than 4 GiB"),
        }
    }
}

/// Failures raised whilst scanning for the end of central directory record.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("unable to locate the end of central directory record")]
    NotFound,
    #[error("data is too short ({0} bytes) to hold an end of central directory record")]
    TooShort(u64),
    #[error("an upstream reader returned an error whilst locating the EOCDR: {0}")]
    Io(#[from] std::io::Error),
}

/// An enum of possible errors and their descriptions.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("file not found: '{}'", .0.display())]
    FileNotFound(PathBuf),
    #[error("file timestamp changed (expected: {expected:?}, actual: {actual:?})")]
    TimestampMismatch { expected: SystemTime, actual: SystemTime },
    #[error("unable to acquire a handle to the file: {0}")]
    ErrorOpeningFile(#[source] std::io::Error),
    #[error("an upstream reader returned an error: {0}")]
    UpstreamReadError(#[from] std::io::Error),

    #[error("the archive is already open")]
    FileAlreadyOpen,
    #[error("the archive is not open")]
    FileNotOpen,
    #[error("the archive is not open for reading")]
    NotOpenForReading,
    #[error("the archive is not open for writing")]
    NotOpenForWriting,
    #[error("an entry stream was opened but never successfully closed")]
    EntryStreamPending,
    #[error("there is no entry to roll back")]
    NothingToRollBack,
    #[error("there is no entry to mark as a directory")]
    NoEntryToMark,
    #[error("entry {0} holds data so can't be marked as a directory")]
    EntryNotEmpty(usize),
    #[error("entry index was out of bounds")]
    EntryIndexOutOfBounds,
    #[error("the archive was opened without reading its headers")]
    HeadersNotRead,

    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error("Encountered an unexpected header (actual: {0:#x}, expected: {1:#x}).")]
    UnexpectedHeaderError(u32, u32),
    #[error("feature not supported: '{0}'")]
    FeatureNotSupported(&'static str),
    #[error("compression not supported: {0}")]
    CompressionNotSupported(u16),
    #[error("the zip64 end of central directory locator is invalid")]
    Zip64LocatorInvalid,
    #[error("the zip64 end of central directory record reports an invalid size ({0})")]
    Zip64RecordSizeInvalid(u64),
    #[error("zip64 extended information field was incomplete")]
    Zip64ExtendedFieldIncomplete,
    #[error("the central directory lies outside of the file")]
    CentralDirectoryOutOfBounds,
    #[error("central directory records span {actual} bytes but {expected} were advertised")]
    CentralDirectorySizeMismatch { expected: u64, actual: u64 },
    #[error("local header of entry {index} disagrees with the central directory ({field})")]
    LocalHeaderMismatch { index: usize, field: &'static str },
    #[error("filename exceeds the maximum length")]
    FileNameTooLarge,
    #[error("invalid filename: '{0}'")]
    InvalidFileName(String),
    #[error("zip64 is required: {0}")]
    Zip64Needed(Zip64ErrorCase),

    #[error("a computed CRC32 value did not match the expected value (expected: {expected:#010x}, actual: {actual:#010x})")]
    CRC32CheckError { expected: u32, actual: u32 },
    #[error("wrote {actual} uncompressed bytes but {expected} were declared")]
    UncompressedSizeMismatch { expected: u64, actual: u64 },
}

impl ZipError {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            // A short read means the container ends before a record it advertises.
            ZipError::UpstreamReadError(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                ErrorKind::Structural
            }
            ZipError::FileNotFound(_)
            | ZipError::TimestampMismatch { .. }
            | ZipError::ErrorOpeningFile(_)
            | ZipError::UpstreamReadError(_) => ErrorKind::Environmental,

            ZipError::FileAlreadyOpen
            | ZipError::FileNotOpen
            | ZipError::NotOpenForReading
            | ZipError::NotOpenForWriting
            | ZipError::EntryStreamPending
            | ZipError::NothingToRollBack
            | ZipError::NoEntryToMark
            | ZipError::EntryNotEmpty(_)
            | ZipError::EntryIndexOutOfBounds
            | ZipError::HeadersNotRead => ErrorKind::State,

            ZipError::Locator(LocatorError::Io(_)) => ErrorKind::Environmental,
            ZipError::Locator(_)
            | ZipError::UnexpectedHeaderError(..)
            | ZipError::FeatureNotSupported(_)
            | ZipError::CompressionNotSupported(_)
            | ZipError::Zip64LocatorInvalid
            | ZipError::Zip64RecordSizeInvalid(_)
            | ZipError::Zip64ExtendedFieldIncomplete
            | ZipError::CentralDirectoryOutOfBounds
            | ZipError::CentralDirectorySizeMismatch { .. }
            | ZipError::LocalHeaderMismatch { .. }
            | ZipError::FileNameTooLarge
            | ZipError::InvalidFileName(_)
            | ZipError::Zip64Needed(_) => ErrorKind::Structural,

            ZipError::CRC32CheckError { .. } | ZipError::UncompressedSizeMismatch { .. } => ErrorKind::Integrity,
        }
    }
}
