// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::read::io::compressed::CompressedReader;
use crate::spec::consts::EMPTY_DEFLATE_STREAM;
use crate::spec::Compression;

use std::io::{Read, Write};

/// A helper macro for generating a CompressedReader test using a specific compression method.
macro_rules! compressed_test_helper {
    ($name:ident, $typ:expr, $data_raw:expr, $data:expr) => {
        #[test]
        fn $name() {
            let data: &[u8] = &$data;
            let data_raw: &[u8] = $data_raw;

            let mut reader = CompressedReader::new(data, $typ);
            let mut read_data = Vec::new();
            reader.read_to_end(&mut read_data).expect("read into CompressedReader failed");

            assert_eq!(read_data, data_raw);
        }
    };
}

compressed_test_helper!(stored_test, Compression::Stored, b"foo bar", *b"foo bar");
compressed_test_helper!(empty_deflate_test, Compression::Deflate, b"", EMPTY_DEFLATE_STREAM);

#[test]
fn deflate_test() {
    let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::best());
    encoder.write_all(b"foo bar foo bar foo bar").unwrap();
    let data = encoder.finish().unwrap();

    let mut reader = CompressedReader::new(data.as_slice(), Compression::Deflate);
    let mut read_data = Vec::new();
    reader.read_to_end(&mut read_data).expect("read into CompressedReader failed");

    assert_eq!(read_data, b"foo bar foo bar foo bar");
}
