// Copyright (c) 2022 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

use crate::write::io::offset::OffsetWriter;

use std::io::{Cursor, Write};

#[test]
fn basic() {
    let mut writer = OffsetWriter::new(Cursor::new(Vec::new()));
    assert_eq!(writer.offset(), 0);

    writer.write_all(b"Foo. Bar. Foo. Bar.").expect("failed to write data");
    assert_eq!(writer.offset(), 19);

    writer.write_all(b"Foo. Foo.").expect("failed to write data");
    assert_eq!(writer.offset(), 28);

    writer.write_all(b"Bar. Bar.").expect("failed to write data");
    assert_eq!(writer.offset(), 37);
}

#[test]
fn patch_leaves_offset_alone() {
    let mut writer = OffsetWriter::new(Cursor::new(Vec::new()));
    writer.write_all(b"Foo. Bar.").unwrap();

    writer.patch(5, b"Baz").expect("failed to patch data");
    assert_eq!(writer.offset(), 9);

    writer.write_all(b"!").unwrap();
    assert_eq!(writer.into_inner().into_inner(), b"Foo. Baz.!");
}

#[test]
fn patch_past_written_data_fails() {
    let mut writer = OffsetWriter::new(Cursor::new(Vec::new()));
    writer.write_all(b"Foo.").unwrap();

    let err = writer.patch(2, b"Bar").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn rewind_overwrites() {
    let mut writer = OffsetWriter::new(Cursor::new(Vec::new()));
    writer.write_all(b"Foo. Bar.").unwrap();

    writer.rewind(5).unwrap();
    assert_eq!(writer.offset(), 5);

    writer.write_all(b"Baz.").unwrap();
    assert_eq!(writer.offset(), 9);
    assert_eq!(writer.into_inner().into_inner(), b"Foo. Baz.");
}
