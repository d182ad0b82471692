use std::collections::HashMap;
use std::rc::Rc;

use tracing::{instrument, trace};

use crate::column::ColumnCatalogEntry;
use crate::error::EseError;
use crate::io_context::{IoContext, TaggedLayout};
use crate::reader::ByteReader;
use crate::value::TypedValueCell;

/// Builds the effective column catalog a record is decoded against.
///
/// With no template, the effective catalog is simply the table's own
/// column list. With a template, the effective catalog is the template's
/// columns followed by the table's (tagged-only) additions; the table
/// list must be no larger than the template list, and every column in
/// the table portion must be tagged (identifier >= 256).
pub fn build_effective_catalog(
    template: Option<&[Rc<ColumnCatalogEntry>]>,
    table: &[Rc<ColumnCatalogEntry>],
) -> Result<Vec<Rc<ColumnCatalogEntry>>, EseError> {
    match template {
        None => Ok(table.to_vec()),
        Some(tmpl) => {
            if table.len() > tmpl.len() {
                return Err(EseError::CatalogMismatch {
                    what: format!(
                        "table column list ({}) exceeds template column list ({})",
                        table.len(),
                        tmpl.len()
                    ),
                });
            }
            for column in table {
                if column.identifier < 256 {
                    return Err(EseError::CatalogMismatch {
                        what: format!(
                            "table-portion column {} is not tagged (id < 256)",
                            column.identifier
                        ),
                    });
                }
            }
            let mut effective = Vec::with_capacity(tmpl.len() + table.len());
            effective.extend(tmpl.iter().cloned());
            effective.extend(table.iter().cloned());
            Ok(effective)
        }
    }
}

fn bounds(what: &'static str, offset: usize, length: usize, blob_size: usize) -> EseError {
    EseError::BoundsExceeded {
        what,
        offset,
        length,
        blob_size,
    }
}

struct TaggedHit<'a> {
    flags: Option<u8>,
    data: &'a [u8],
}

fn decode_tagged_linear(region: &[u8]) -> Result<HashMap<u16, TaggedHit<'_>>, EseError> {
    let mut out = HashMap::new();
    let mut reader = ByteReader::new(region);
    while reader.remaining() >= 4 {
        let identifier = reader.read_u16_le()?;
        let size_raw = reader.read_u16_le()?;
        let (flags, data) = if size_raw & 0x8000 != 0 {
            let masked = (size_raw & 0x5FFF) as usize;
            let payload_len = masked.checked_sub(1).ok_or_else(|| {
                bounds("tagged linear payload length", reader.position(), 0, region.len())
            })?;
            let flags = reader.read_u8()?;
            let data = reader.read_slice(payload_len)?;
            (Some(flags), data)
        } else {
            let data = reader.read_slice(size_raw as usize)?;
            (None, data)
        };
        out.insert(identifier, TaggedHit { flags, data });
    }
    Ok(out)
}

fn decode_tagged_index<'a>(
    region: &'a [u8],
    io: &IoContext,
) -> Result<HashMap<u16, TaggedHit<'a>>, EseError> {
    let mut out = HashMap::new();
    if region.is_empty() {
        return Ok(out);
    }

    let mut header_reader = ByteReader::new(region);
    let first_identifier = header_reader.read_u16_le()?;
    let first_offset = header_reader.read_u16_le()?;
    let table_length = (first_offset & 0x3FFF) as usize;
    if table_length < 4 || table_length % 4 != 0 || table_length > region.len() {
        return Err(bounds("tagged offset table", 0, table_length, region.len()));
    }

    let entry_count = table_length / 4;
    let mut entries = Vec::with_capacity(entry_count);
    entries.push((first_identifier, first_offset));
    for _ in 1..entry_count {
        let identifier = header_reader.read_u16_le()?;
        let offset = header_reader.read_u16_le()?;
        entries.push((identifier, offset));
    }

    let mut previous_masked = 0u16;
    for (i, (_, offset)) in entries.iter().enumerate() {
        let masked = offset & 0x3FFF;
        if i > 0 && masked < previous_masked {
            return Err(EseError::CatalogMismatch {
                what: "non-monotonic tagged offsets".to_string(),
            });
        }
        previous_masked = masked;
    }

    for i in 0..entry_count {
        let (identifier, offset) = entries[i];
        let start = (offset & 0x3FFF) as usize;
        let end = if i + 1 < entry_count {
            (entries[i + 1].1 & 0x3FFF) as usize
        } else {
            region.len()
        };
        if start > end {
            return Err(bounds("tagged index payload", start, 0, region.len()));
        }
        let mut payload_reader = ByteReader::at(region, start);
        let payload_slice = payload_reader.read_slice(end - start)?;

        // A zero-size tagged value is a legitimate present-but-empty cell;
        // there is no byte available to hold a flags marker, flagged or not.
        let hit = if payload_slice.is_empty() {
            TaggedHit {
                flags: None,
                data: payload_slice,
            }
        } else {
            let has_flags = io.always_has_tagged_flags() || (offset & 0x4000) != 0;
            if has_flags {
                TaggedHit {
                    flags: Some(payload_slice[0]),
                    data: &payload_slice[1..],
                }
            } else {
                TaggedHit {
                    flags: None,
                    data: payload_slice,
                }
            }
        };
        out.insert(identifier, hit);
    }
    Ok(out)
}

/// Decodes one record blob against `catalog` (the effective catalog for
/// the owning table) into one cell per catalog entry, in order.
#[instrument(level = "trace", skip(catalog, io, blob), fields(blob_len = blob.len(), columns = catalog.len()))]
pub fn decode_record(
    catalog: &[Rc<ColumnCatalogEntry>],
    io: &IoContext,
    blob: &[u8],
    file_offset: i64,
) -> Result<Vec<TypedValueCell>, EseError> {
    let mut header_reader = ByteReader::new(blob);
    let last_fixed = header_reader.read_u8()? as u16;
    let last_variable = header_reader.read_u8()?;
    let var_offset = header_reader.read_u16_le()? as usize;

    let n = if last_variable > 127 {
        last_variable as usize - 127
    } else {
        0
    };
    let index_start = var_offset;
    let mut index_reader = ByteReader::at(blob, index_start);
    let mut var_values: Vec<Option<(usize, usize)>> = Vec::with_capacity(n);
    let mut previous_end = 0usize;
    for _ in 0..n {
        let raw = index_reader.read_u16_le()?;
        if raw & 0x8000 != 0 {
            var_values.push(None);
            continue;
        }
        let end = (raw & 0x7FFF) as usize;
        if end < previous_end {
            return Err(bounds("variable-size value order", index_reader.position(), 0, blob.len()));
        }
        var_values.push(Some((previous_end, end)));
        previous_end = end;
    }
    let value_region_start = index_start + 2 * n;

    let tagged_region_start = value_region_start + previous_end;
    let mut region_reader = ByteReader::at(blob, tagged_region_start);
    let tagged_region = region_reader.read_slice(region_reader.remaining())?;
    trace!(tagged_region_len = tagged_region.len(), layout = ?io.tagged_layout(), "entering tagged region");
    let tagged_map = match io.tagged_layout() {
        TaggedLayout::Linear => decode_tagged_linear(tagged_region)?,
        TaggedLayout::Indexed => decode_tagged_index(tagged_region, io)?,
    };

    let mut fixed_reader = ByteReader::at(blob, 4);
    let mut cells = Vec::with_capacity(catalog.len());
    for entry in catalog {
        if entry.is_fixed_size() {
            if entry.identifier <= last_fixed {
                let abs_off = file_offset + fixed_reader.position() as i64;
                let data = fixed_reader.read_slice(entry.size as usize)?;
                cells.push(TypedValueCell::with_data(entry.clone(), data, abs_off));
            } else {
                cells.push(TypedValueCell::null(entry.clone(), file_offset + fixed_reader.position() as i64));
            }
        } else if entry.is_variable_size() {
            if entry.identifier > last_variable as u16 {
                cells.push(TypedValueCell::null(entry.clone(), file_offset));
                continue;
            }
            let k = entry.identifier as usize - 128;
            match var_values.get(k).copied().flatten() {
                Some((rel_start, rel_end)) => {
                    let abs_start = value_region_start + rel_start;
                    let mut value_reader = ByteReader::at(blob, abs_start);
                    let data = value_reader.read_slice(rel_end - rel_start)?;
                    cells.push(TypedValueCell::with_data(entry.clone(), data, file_offset + abs_start as i64));
                }
                None => cells.push(TypedValueCell::null(entry.clone(), file_offset)),
            }
        } else {
            match tagged_map.get(&entry.identifier) {
                Some(hit) => {
                    let abs_off = file_offset + tagged_region_start as i64;
                    let mut cell = TypedValueCell::with_data(entry.clone(), hit.data, abs_off);
                    if let Some(flags) = hit.flags {
                        cell.set_flags(flags);
                    }
                    cells.push(cell);
                }
                None => cells.push(TypedValueCell::null(entry.clone(), file_offset)),
            }
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn col(id: u16, ty: ColumnType, size: u32, name: &str) -> Rc<ColumnCatalogEntry> {
        Rc::new(ColumnCatalogEntry::new(id, ty, size, name))
    }

    fn io_index() -> IoContext {
        IoContext::new(0x620, 0x11, 1252)
    }

    fn io_linear() -> IoContext {
        IoContext::new(0x620, 1, 1252)
    }

    #[test]
    fn pure_fixed_column_decodes_its_payload() {
        let catalog = vec![col(1, ColumnType::Long, 4, "Id")];
        let blob = [0x01, 0x00, 0x08, 0x00, 0xDE, 0xAD, 0xBE, 0xEF];
        let cells = decode_record(&catalog, &io_index(), &blob, 0).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].data(), Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
    }

    #[test]
    fn variable_column_with_null_skips_advancing_previous_end() {
        let catalog = vec![
            col(128, ColumnType::Text, 0, "A"),
            col(129, ColumnType::Text, 0, "B"),
            col(130, ColumnType::Text, 0, "C"),
        ];
        let mut blob = vec![0x00, 130u8, 0x04, 0x00];
        blob.extend_from_slice(&0x0004u16.to_le_bytes());
        blob.extend_from_slice(&0x8004u16.to_le_bytes());
        blob.extend_from_slice(&0x0007u16.to_le_bytes());
        blob.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x01]);

        let cells = decode_record(&catalog, &io_index(), &blob, 0).unwrap();
        assert_eq!(cells[0].data(), Some(&[0xAA, 0xBB, 0xCC, 0xDD][..]));
        assert!(cells[1].is_null());
        assert_eq!(cells[2].data(), Some(&[0xEE, 0xFF, 0x01][..]));
    }

    #[test]
    fn tagged_linear_layout_decodes_sparse_columns() {
        let catalog = vec![
            col(256, ColumnType::LongText, 0, "Comment"),
            col(258, ColumnType::LongText, 0, "Extra"),
        ];
        let mut blob = vec![0x00, 0x00, 0x04, 0x00];
        let mut tagged = Vec::new();
        tagged.extend_from_slice(&256u16.to_le_bytes());
        tagged.extend_from_slice(&3u16.to_le_bytes());
        tagged.extend_from_slice(b"\x41\x42\x43");
        tagged.extend_from_slice(&258u16.to_le_bytes());
        tagged.extend_from_slice(&1u16.to_le_bytes());
        tagged.extend_from_slice(&[0x44]);
        blob.extend_from_slice(&tagged);

        let cells = decode_record(&catalog, &io_linear(), &blob, 0).unwrap();
        assert_eq!(cells[0].data(), Some(&b"ABC"[..]));
        assert_eq!(cells[1].data(), Some(&[0x44][..]));
    }

    #[test]
    fn tagged_index_layout_extracts_leading_flags_byte() {
        let catalog = vec![
            col(256, ColumnType::LongText, 0, "Comment"),
            col(257, ColumnType::LongText, 0, "Extra"),
        ];
        let mut blob = vec![0x00, 0x00, 0x04, 0x00];
        blob.extend_from_slice(&[
            0x00, 0x01, 0x08, 0x00, 0x01, 0x01, 0x0C, 0x00, 0x02, 0xFF, 0x41, 0x42, 0x03, 0x43, 0x44,
        ]);
        let cells = decode_record(&catalog, &io_index(), &blob, 0).unwrap();
        assert_eq!(cells[0].flags(), Some(0x02));
        assert_eq!(cells[0].data(), Some(&[0xFF, 0x41, 0x42][..]));
        assert_eq!(cells[1].flags(), Some(0x03));
        assert_eq!(cells[1].data(), Some(&[0x43, 0x44][..]));
    }

    #[test]
    fn tagged_index_layout_zero_size_value_is_present_not_null() {
        let catalog = vec![
            col(256, ColumnType::LongText, 0, "Comment"),
            col(257, ColumnType::LongText, 0, "Extra"),
        ];
        let mut blob = vec![0x00, 0x00, 0x04, 0x00];
        // Offset table: column 256 spans [offset 8, 8) -- zero bytes -- then
        // column 257 takes the rest. Both entries carry the INDEX
        // always-has-flags revision, so a naive implementation would try
        // (and fail) to consume a flags byte from an empty span.
        blob.extend_from_slice(&[
            0x00, 0x01, 0x08, 0x00, 0x01, 0x01, 0x08, 0x00, 0x03, 0x43, 0x44,
        ]);
        let cells = decode_record(&catalog, &io_index(), &blob, 0).unwrap();
        assert!(!cells[0].is_null());
        assert_eq!(cells[0].data(), Some(&[][..]));
        assert_eq!(cells[0].flags(), None);
        assert_eq!(cells[1].flags(), Some(0x03));
        assert_eq!(cells[1].data(), Some(&[0x43, 0x44][..]));
    }

    #[test]
    fn template_extension_builds_concatenated_catalog() {
        let template = vec![col(1, ColumnType::Short, 2, "Kind"), col(128, ColumnType::Text, 0, "Name")];
        let table = vec![col(256, ColumnType::LongText, 0, "Comment")];
        let effective = build_effective_catalog(Some(&template), &table).unwrap();
        assert_eq!(effective.len(), 3);
    }

    #[test]
    fn template_extension_rejects_non_tagged_table_addition() {
        let template = vec![col(1, ColumnType::Short, 2, "Kind"), col(128, ColumnType::Text, 0, "Name")];
        let table = vec![col(200, ColumnType::Text, 0, "Bad")];
        let err = build_effective_catalog(Some(&template), &table).unwrap_err();
        assert!(matches!(err, EseError::CatalogMismatch { .. }));
    }
}
