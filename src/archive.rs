// Copyright (c) 2024 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

//! The archive session: one file, opened either for reading or for writing.
//!
//! # Example
//! ```no_run
//! # use romzip::{Archive, EntryOptions};
//! # use romzip::error::ZipError;
//! # use std::io::{Read, Write};
//! #
//! # fn run() -> Result<(), ZipError> {
//! let data = b"This is an example file.";
//!
//! let mut archive = Archive::new();
//! archive.create("./foo.zip")?;
//!
//! let mut writer = archive.open_write_stream("foo.txt", data.len() as u64, EntryOptions::new())?;
//! writer.write_all(data)?;
//! writer.close(crc32fast::hash(data))?;
//! archive.close()?;
//!
//! archive.open("./foo.zip", None, true)?;
//! assert!(archive.torrentzip_status()?);
//!
//! let mut buffer = Vec::new();
//! archive.open_read_stream(0, false)?.read_to_end_checked(&mut buffer)?;
//! archive.close()?;
//! #   Ok(())
//! # }
//! ```

use crate::date::ZipDateTime;
use crate::entry::ZipEntry;
use crate::error::{Result, ZipError};
use crate::file::{CentralDirectorySummary, ZipFile};
use crate::opts::EntryOptions;
use crate::read::ZipEntryReader;
use crate::torrentzip::{self, TorrentZipViolation};
use crate::write::io::offset::OffsetWriter;
use crate::write::{EntryWriter, WriteSlot};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha1::{Digest, Sha1};

/// The mode an [`Archive`] is currently open in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Closed,
    OpenRead,
    OpenWrite,
}

struct ReadSession {
    file: BufReader<File>,
    /// Absent when the archive was opened without reading its headers.
    catalog: Option<ZipFile>,
}

struct WriteSession {
    path: PathBuf,
    writer: OffsetWriter<BufWriter<File>>,
    entries: Vec<ZipEntry>,
    slot: WriteSlot,
}

enum Session {
    Closed,
    Read(ReadSession),
    Write(WriteSession),
}

/// A ZIP archive session over a single file on disk.
///
/// # Note
/// - A session isn't safe to share between threads; independent sessions over different files are.
/// - A write session must be finished with [`Archive::close()`], or abandoned with [`Archive::close_failed()`].
///   Dropping a write session abandons it and removes the partial file.
pub struct Archive {
    path: Option<PathBuf>,
    timestamp: Option<SystemTime>,
    directory: Option<CentralDirectorySummary>,
    session: Session,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive {
    /// Constructs a new, closed archive session.
    pub fn new() -> Self {
        Self { path: None, timestamp: None, directory: None, session: Session::Closed }
    }

    /// Opens an existing archive for reading.
    ///
    /// When an expected timestamp is given, the file's last modification time must equal it. With `read_headers`
    /// false, only the file handle is acquired; entries can then be read solely through
    /// [`Archive::open_read_stream_quick()`].
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn open(
        &mut self,
        path: impl AsRef<Path>,
        expected_timestamp: Option<SystemTime>,
        read_headers: bool,
    ) -> Result<()> {
        if !matches!(self.session, Session::Closed) {
            return Err(ZipError::FileAlreadyOpen);
        }

        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ZipError::FileNotFound(path.to_path_buf()),
            _ => ZipError::ErrorOpeningFile(err),
        })?;
        let actual = metadata.modified().map_err(ZipError::ErrorOpeningFile)?;

        if let Some(expected) = expected_timestamp {
            if expected != actual {
                return Err(ZipError::TimestampMismatch { expected, actual });
            }
        }

        let mut file = BufReader::new(File::open(path).map_err(ZipError::ErrorOpeningFile)?);
        let catalog = if read_headers { Some(crate::read::file(&mut file)?) } else { None };

        self.path = Some(path.to_path_buf());
        self.timestamp = Some(actual);
        self.directory = catalog.as_ref().map(|catalog| *catalog.central_directory());
        self.session = Session::Read(ReadSession { file, catalog });
        Ok(())
    }

    /// Creates a new archive for writing, along with any missing parent directories.
    ///
    /// An existing file at the path is truncated.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn create(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if !matches!(self.session, Session::Closed) {
            return Err(ZipError::FileAlreadyOpen);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ZipError::ErrorOpeningFile)?;
        }

        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(ZipError::ErrorOpeningFile)?;

        self.path = Some(path.to_path_buf());
        self.timestamp = None;
        self.directory = None;
        self.session = Session::Write(WriteSession {
            path: path.to_path_buf(),
            writer: OffsetWriter::new(BufWriter::new(file)),
            entries: Vec::new(),
            slot: WriteSlot::Idle,
        });
        Ok(())
    }

    /// Closes the session.
    ///
    /// For a write session this includes:
    /// - Writing all central directory headers.
    /// - Stamping the TorrentZip comment if every entry qualifies.
    /// - Writing the Zip64 end of central directory record & locator when needed.
    /// - Writing the end of central directory record and truncating the file to its final length.
    ///
    /// If closing a write session fails, the session stays open so it can be rolled back or abandoned.
    #[tracing::instrument(skip(self))]
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Closed => Err(ZipError::FileNotOpen),
            Session::Read(_) => Ok(()),
            Session::Write(mut session) => match finish(&mut session) {
                Ok(directory) => {
                    drop(session);
                    self.directory = Some(directory);
                    self.timestamp = self
                        .path
                        .as_ref()
                        .and_then(|path| std::fs::metadata(path).and_then(|metadata| metadata.modified()).ok());
                    Ok(())
                }
                Err(err) => {
                    self.session = Session::Write(session);
                    Err(err)
                }
            },
        }
    }

    /// Abandons the session.
    ///
    /// A write session's partial file is removed. Closing an already closed session is not an error.
    #[tracing::instrument(skip(self))]
    pub fn close_failed(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Closed | Session::Read(_) => Ok(()),
            Session::Write(session) => {
                let WriteSession { path, writer, .. } = session;
                // Nothing written so far is worth keeping, so a failed flush doesn't matter.
                let (file, _) = writer.into_inner().into_parts();
                drop(file);

                self.directory = None;
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Opens the entry at the given index for reading.
    ///
    /// A raw stream returns the entry's compressed bytes exactly as stored.
    pub fn open_read_stream(&mut self, index: usize, raw: bool) -> Result<ZipEntryReader<'_, BufReader<File>>> {
        let ReadSession { file, catalog } = self.read_session()?;
        let catalog = catalog.as_ref().ok_or(ZipError::HeadersNotRead)?;
        let entry = catalog.entries().get(index).ok_or(ZipError::EntryIndexOutOfBounds)?;

        ZipEntryReader::new(file, entry, raw)
    }

    /// Opens the entry whose local file header starts at the given offset for reading.
    ///
    /// The local header is trusted as-is; nothing is checked against the central directory.
    pub fn open_read_stream_quick(
        &mut self,
        offset: u64,
        raw: bool,
    ) -> Result<ZipEntryReader<'_, BufReader<File>>> {
        let ReadSession { file, .. } = self.read_session()?;
        let entry = crate::read::lfh(file, offset)?;

        ZipEntryReader::new(file, &entry, raw)
    }

    /// Starts a new entry and returns a writer for its data.
    ///
    /// A non-raw stream must be given exactly `uncompressed_size` bytes. Fails with
    /// [`ZipError::EntryStreamPending`] if a previous entry was started but never closed; roll it back first.
    pub fn open_write_stream(
        &mut self,
        filename: &str,
        uncompressed_size: u64,
        options: EntryOptions,
    ) -> Result<EntryWriter<'_, BufWriter<File>>> {
        let WriteSession { writer, entries, slot, .. } = self.write_session()?;
        if let WriteSlot::Writing { .. } = slot {
            return Err(ZipError::EntryStreamPending);
        }

        EntryWriter::from_raw(writer, entries, slot, filename, uncompressed_size, options)
    }

    /// Removes the pending entry, or if there is none, the last committed one.
    ///
    /// The next entry is written where the removed one started.
    #[tracing::instrument(skip(self))]
    pub fn roll_back(&mut self) -> Result<()> {
        let WriteSession { writer, entries, slot, .. } = self.write_session()?;

        let offset = match *slot {
            WriteSlot::Writing { header_offset } => {
                *slot = WriteSlot::Idle;
                header_offset
            }
            WriteSlot::Idle => entries.pop().ok_or(ZipError::NothingToRollBack)?.header_offset.get(),
        };

        writer.rewind(offset)?;
        tracing::debug!(offset, entries = entries.len(), "rolled back entry");
        Ok(())
    }

    /// Marks the most recent entry as a directory placeholder.
    ///
    /// The entry must hold no data. If its name lacks a trailing `/` the entry is rewritten in place with one.
    #[tracing::instrument(skip(self))]
    pub fn add_directory(&mut self) -> Result<()> {
        let WriteSession { writer, entries, slot, .. } = self.write_session()?;
        if let WriteSlot::Writing { .. } = slot {
            return Err(ZipError::EntryStreamPending);
        }

        let index = entries.len().checked_sub(1).ok_or(ZipError::NoEntryToMark)?;
        let last = &entries[index];
        if last.uncompressed_size() != 0 {
            return Err(ZipError::EntryNotEmpty(index));
        }
        if last.dir() {
            return Ok(());
        }

        let name = format!("{}/", last.filename());
        let options = EntryOptions::default()
            .compression(last.compression()?)
            .last_modification_date(last.last_modification_date());
        let header_offset = last.header_offset_raw();

        entries.pop();
        writer.rewind(header_offset)?;
        tracing::debug!(%name, header_offset, "rewriting entry as a directory");
        EntryWriter::from_raw(writer, entries, slot, &name, 0, options)?.close(0)
    }

    /// Appends a zero-length file entry without going through a write stream.
    pub fn add_zero_length_file(&mut self, name: &str) -> Result<()> {
        self.open_write_stream(name, 0, EntryOptions::default())?.close(0)
    }

    /// Decompresses every entry, checks its CRC32, and records its MD5 and SHA1 digests.
    #[tracing::instrument(skip(self))]
    pub fn deep_scan(&mut self) -> Result<()> {
        let ReadSession { file, catalog } = self.read_session()?;
        let catalog = catalog.as_mut().ok_or(ZipError::HeadersNotRead)?;

        let mut buffer = vec![0; 64 * 1024];
        for entry in catalog.entries.iter_mut() {
            let mut reader = ZipEntryReader::new(&mut *file, entry, false)?;
            let mut md5 = md5::Context::new();
            let mut sha1 = Sha1::new();

            loop {
                let count = reader.read(&mut buffer)?;
                if count == 0 {
                    break;
                }
                md5.consume(&buffer[..count]);
                sha1.update(&buffer[..count]);
            }
            reader.verify()?;

            entry.md5 = Some(md5.compute().0);
            entry.sha1 = Some(sha1.finalize().into());
        }

        tracing::debug!(entries = catalog.entries.len(), "deep scan complete");
        Ok(())
    }

    /// Returns the mode this session is open in.
    pub fn open_mode(&self) -> OpenMode {
        match self.session {
            Session::Closed => OpenMode::Closed,
            Session::Read(_) => OpenMode::OpenRead,
            Session::Write(_) => OpenMode::OpenWrite,
        }
    }

    /// Returns the path of the file most recently opened or created.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the last modification time of the file, as captured when it was opened or after it was written.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    /// Returns the central directory summary of the archive most recently opened or written.
    pub fn central_directory(&self) -> Option<&CentralDirectorySummary> {
        self.directory.as_ref()
    }

    /// Returns the entries read from the archive, or the entries committed so far when writing.
    pub fn entries(&self) -> Result<&[ZipEntry]> {
        match &self.session {
            Session::Closed => Err(ZipError::FileNotOpen),
            Session::Read(ReadSession { catalog, .. }) => {
                catalog.as_ref().map(ZipFile::entries).ok_or(ZipError::HeadersNotRead)
            }
            Session::Write(WriteSession { entries, .. }) => Ok(entries.as_slice()),
        }
    }

    pub fn entry_count(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn entry(&self, index: usize) -> Result<&ZipEntry> {
        self.entries()?.get(index).ok_or(ZipError::EntryIndexOutOfBounds)
    }

    pub fn name(&self, index: usize) -> Result<&str> {
        Ok(self.entry(index)?.filename())
    }

    pub fn uncompressed_size(&self, index: usize) -> Result<u64> {
        Ok(self.entry(index)?.uncompressed_size())
    }

    pub fn compressed_size(&self, index: usize) -> Result<u64> {
        Ok(self.entry(index)?.compressed_size())
    }

    pub fn crc(&self, index: usize) -> Result<u32> {
        Ok(self.entry(index)?.crc32())
    }

    pub fn compression_method(&self, index: usize) -> Result<u16> {
        Ok(self.entry(index)?.compression_method())
    }

    /// Returns the offset of the entry's local file header, or `None` if it's Zip64 encoded.
    pub fn local_header_offset(&self, index: usize) -> Result<Option<u64>> {
        Ok(self.entry(index)?.header_offset())
    }

    pub fn last_modified(&self, index: usize) -> Result<ZipDateTime> {
        Ok(self.entry(index)?.last_modification_date())
    }

    pub fn is_directory(&self, index: usize) -> Result<bool> {
        Ok(self.entry(index)?.dir())
    }

    /// Returns the entry's MD5 digest, populated by [`Archive::deep_scan()`].
    pub fn md5(&self, index: usize) -> Result<Option<[u8; 16]>> {
        Ok(self.entry(index)?.md5().copied())
    }

    /// Returns the entry's SHA1 digest, populated by [`Archive::deep_scan()`].
    pub fn sha1(&self, index: usize) -> Result<Option<[u8; 20]>> {
        Ok(self.entry(index)?.sha1().copied())
    }

    /// Returns whether the archive is TorrentZip compliant.
    ///
    /// For a write session this is whether the entries committed so far would be stamped on close.
    pub fn torrentzip_status(&self) -> Result<bool> {
        Ok(self.torrentzip_violation()?.is_none())
    }

    /// Returns the first TorrentZip check the archive fails, if any.
    pub fn torrentzip_violation(&self) -> Result<Option<TorrentZipViolation>> {
        match &self.session {
            Session::Closed => Err(ZipError::FileNotOpen),
            Session::Read(ReadSession { catalog, .. }) => {
                catalog.as_ref().map(ZipFile::torrentzip_violation).ok_or(ZipError::HeadersNotRead)
            }
            Session::Write(WriteSession { writer, entries, .. }) => {
                Ok(torrentzip::check_entries(entries, writer.offset()).err())
            }
        }
    }

    /// Returns whether the archive, or any entry committed so far, needs Zip64.
    pub fn is_zip64(&self) -> Result<bool> {
        match &self.session {
            Session::Read(ReadSession { catalog: Some(catalog), .. }) => Ok(catalog.zip64()),
            _ => Ok(self.entries()?.iter().any(ZipEntry::zip64)),
        }
    }

    /// Returns the archive comment.
    pub fn comment(&self) -> Result<&[u8]> {
        match &self.session {
            Session::Closed => Err(ZipError::FileNotOpen),
            Session::Read(ReadSession { catalog, .. }) => {
                catalog.as_ref().map(ZipFile::comment).ok_or(ZipError::HeadersNotRead)
            }
            Session::Write(_) => Err(ZipError::NotOpenForReading),
        }
    }

    fn read_session(&mut self) -> Result<&mut ReadSession> {
        match &mut self.session {
            Session::Read(session) => Ok(session),
            Session::Write(_) => Err(ZipError::NotOpenForReading),
            Session::Closed => Err(ZipError::FileNotOpen),
        }
    }

    fn write_session(&mut self) -> Result<&mut WriteSession> {
        match &mut self.session {
            Session::Write(session) => Ok(session),
            Session::Read(_) => Err(ZipError::NotOpenForWriting),
            Session::Closed => Err(ZipError::FileNotOpen),
        }
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if let Session::Write(WriteSession { path, .. }) = &self.session {
            tracing::warn!(path = %path.display(), "write session dropped without being closed; removing partial file");
        } else {
            return;
        }

        if let Err(err) = self.close_failed() {
            tracing::warn!(%err, "unable to remove partial file");
        }
    }
}

/// Writes the central directory and end records of a write session, then trims the file to its final length.
fn finish(session: &mut WriteSession) -> Result<CentralDirectorySummary> {
    let WriteSession { writer, entries, slot, .. } = session;
    if let WriteSlot::Writing { .. } = slot {
        return Err(ZipError::EntryStreamPending);
    }

    let directory = crate::write::close(writer, entries)?;
    if let Err(err) = truncate(writer) {
        crate::write::discard_trailer(writer, directory.offset);
        return Err(err.into());
    }

    Ok(directory)
}

fn truncate(writer: &mut OffsetWriter<BufWriter<File>>) -> std::io::Result<()> {
    writer.flush()?;

    // A rollback may have left stale bytes beyond the final records.
    let length = writer.offset();
    writer.inner_mut().get_ref().set_len(length)
}
