// Copyright Cognite AS, 2023

use crate::error::{Result as ZipResult, ZipError};
use crate::spec::consts::NON_ZIP64_MAX_SIZE;
use crate::spec::field::ZipField;
use crate::spec::header::{ExtraField, HeaderId, Zip64ExtendedInformationExtraField};

/// Split a raw extra field into its individual blocks.
///
/// Trailing bytes too short to hold a block header are ignored, as a number of writers pad extra fields.
pub(crate) fn parse_extra_fields(data: &[u8]) -> ZipResult<Vec<ExtraField>> {
    let mut cursor = 0;
    let mut fields = Vec::new();

    while cursor + 4 <= data.len() {
        let header_id = HeaderId(u16::from_le_bytes([data[cursor], data[cursor + 1]]));
        let data_size = u16::from_le_bytes([data[cursor + 2], data[cursor + 3]]) as usize;
        cursor += 4;

        let content = data.get(cursor..cursor + data_size).ok_or(ZipError::Zip64ExtendedFieldIncomplete)?;
        fields.push(ExtraField { header_id, content: content.to_vec() });
        cursor += data_size;
    }

    Ok(fields)
}

pub(crate) fn get_zip64_extra_field(extra_fields: &[ExtraField]) -> Option<&ExtraField> {
    extra_fields.iter().find(|field| field.header_id == HeaderId::ZIP64_EXTENDED_INFORMATION_EXTRA_FIELD)
}

/// Parse a zip64 extra field from bytes.
///
/// Only the values whose classic header slot holds the sentinel are present, and they appear in a fixed order, so
/// the caller states which slots were saturated.
fn zip64_extended_information_field_from_bytes(
    data: &[u8],
    uncompressed: bool,
    compressed: bool,
    offset: bool,
) -> ZipResult<Zip64ExtendedInformationExtraField> {
    let mut cursor = 0;
    let mut next = |present: bool| -> ZipResult<Option<u64>> {
        if !present {
            return Ok(None);
        }
        let bytes = data.get(cursor..cursor + 8).ok_or(ZipError::Zip64ExtendedFieldIncomplete)?;
        cursor += 8;

        let mut buffer = [0; 8];
        buffer.copy_from_slice(bytes);
        Ok(Some(u64::from_le_bytes(buffer)))
    };

    let uncompressed_size = next(uncompressed)?;
    let compressed_size = next(compressed)?;
    let relative_header_offset = next(offset)?;

    Ok(Zip64ExtendedInformationExtraField {
        uncompressed_size,
        compressed_size,
        relative_header_offset,
    })
}

/// Sizes (and for central records, the local header offset) with any Zip64 overrides applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedFields {
    pub uncompressed_size: ZipField,
    pub compressed_size: ZipField,
    pub header_offset: Option<ZipField>,
}

/// Resolve classic 32-bit header values against the record's extra fields.
///
/// A slot holding the sentinel is read from the Zip64 extended information field; its absence is an error.
pub(crate) fn resolve_zip64_fields(
    extra_fields: &[ExtraField],
    uncompressed_size: u32,
    compressed_size: u32,
    header_offset: Option<u32>,
) -> ZipResult<ResolvedFields> {
    let uncompressed_wide = uncompressed_size == NON_ZIP64_MAX_SIZE;
    let compressed_wide = compressed_size == NON_ZIP64_MAX_SIZE;
    let offset_wide = header_offset == Some(NON_ZIP64_MAX_SIZE);

    if !(uncompressed_wide || compressed_wide || offset_wide) {
        return Ok(ResolvedFields {
            uncompressed_size: ZipField::Narrow(uncompressed_size),
            compressed_size: ZipField::Narrow(compressed_size),
            header_offset: header_offset.map(ZipField::Narrow),
        });
    }

    let field = get_zip64_extra_field(extra_fields).ok_or(ZipError::Zip64ExtendedFieldIncomplete)?;
    let zip64 =
        zip64_extended_information_field_from_bytes(&field.content, uncompressed_wide, compressed_wide, offset_wide)?;

    let pick = |narrow: u32, wide: Option<u64>| match wide {
        Some(value) => ZipField::Wide(value),
        None => ZipField::Narrow(narrow),
    };

    Ok(ResolvedFields {
        uncompressed_size: pick(uncompressed_size, zip64.uncompressed_size),
        compressed_size: pick(compressed_size, zip64.compressed_size),
        header_offset: header_offset.map(|offset| pick(offset, zip64.relative_header_offset)),
    })
}

/// Encode a Zip64 extended information field holding only the values that need it.
///
/// Returns an empty vector when nothing is wide.
pub(crate) fn zip64_extra_field_bytes(values: &[ZipField]) -> Vec<u8> {
    let wide: Vec<u64> = values.iter().filter_map(|value| value.extra_value()).collect();
    if wide.is_empty() {
        return Vec::new();
    }

    let mut bytes = Vec::with_capacity(4 + wide.len() * 8);
    bytes.extend_from_slice(&HeaderId::ZIP64_EXTENDED_INFORMATION_EXTRA_FIELD.0.to_le_bytes());
    bytes.extend_from_slice(&((wide.len() * 8) as u16).to_le_bytes());
    for value in wide {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes
}
