// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::spec::Compression;

use std::io::{BufRead, Read};

use flate2::bufread::DeflateDecoder;

/// A wrapping reader which holds concrete types for all respective compression method readers.
pub(crate) enum CompressedReader<R> {
    Stored(R),
    Deflate(DeflateDecoder<R>),
}

impl<R> CompressedReader<R>
where
    R: BufRead,
{
    /// Constructs a new wrapping reader from a generic [`BufRead`] implementer.
    pub(crate) fn new(reader: R, compression: Compression) -> Self {
        match compression {
            Compression::Stored => CompressedReader::Stored(reader),
            Compression::Deflate => CompressedReader::Deflate(DeflateDecoder::new(reader)),
        }
    }
}

impl<R> Read for CompressedReader<R>
where
    R: BufRead,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            CompressedReader::Stored(inner) => inner.read(buf),
            CompressedReader::Deflate(inner) => inner.read(buf),
        }
    }
}
