// Copyright (c) 2021 Harry [Majored] [hello@majored.pw]
// MIT License (https://github.com/Majored/rs-async-zip/blob/main/LICENSE)

pub mod compression;
pub(crate) mod consts;
pub(crate) mod extra_field;
pub mod field;
pub(crate) mod header;
pub(crate) mod parse;

pub use compression::{Compression, DeflateOption};
pub use field::ZipField;
