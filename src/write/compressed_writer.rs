// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::spec::{Compression, DeflateOption};
use crate::write::io::offset::OffsetWriter;

use std::io::{Seek, Write};

use flate2::write::DeflateEncoder;

pub enum CompressedWriter<'b, W: Write + Seek> {
    Stored(&'b mut OffsetWriter<W>),
    Deflate(DeflateEncoder<&'b mut OffsetWriter<W>>),
}

impl<'b, W: Write + Seek> CompressedWriter<'b, W> {
    pub fn from_raw(writer: &'b mut OffsetWriter<W>, compression: Compression, option: DeflateOption) -> Self {
        match compression {
            Compression::Stored => CompressedWriter::Stored(writer),
            Compression::Deflate => CompressedWriter::Deflate(DeflateEncoder::new(writer, option.into_level())),
        }
    }

    /// Finishes any compressed stream and returns the underlying writer.
    pub fn into_inner(self) -> std::io::Result<&'b mut OffsetWriter<W>> {
        match self {
            CompressedWriter::Stored(inner) => Ok(inner),
            CompressedWriter::Deflate(inner) => inner.finish(),
        }
    }
}

impl<'b, W: Write + Seek> Write for CompressedWriter<'b, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            CompressedWriter::Stored(inner) => inner.write(buf),
            CompressedWriter::Deflate(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            CompressedWriter::Stored(inner) => inner.flush(),
            // A sync flush would change the compressed bytes, so only the underlying writer is flushed.
            CompressedWriter::Deflate(inner) => inner.get_mut().flush(),
        }
    }
}
