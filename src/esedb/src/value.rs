use std::rc::Rc;

use crate::column::ColumnCatalogEntry;

/// One decoded column value within a `RECORD` data definition.
///
/// A cell owns its decoded bytes rather than borrowing from the input
/// blob; `file_offset` is kept alongside so a long-value column's
/// placeholder can be handed to a [`crate::long_value::LongValueAssembler`]-
/// driven re-read later.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValueCell {
    catalog: Rc<ColumnCatalogEntry>,
    data: Option<Box<[u8]>>,
    /// Tagged-column flags byte; only ever `Some` for tagged cells.
    flags: Option<u8>,
    file_offset: i64,
}

impl TypedValueCell {
    pub fn null(catalog: Rc<ColumnCatalogEntry>, file_offset: i64) -> Self {
        TypedValueCell {
            catalog,
            data: None,
            flags: None,
            file_offset,
        }
    }

    pub fn with_data(catalog: Rc<ColumnCatalogEntry>, data: &[u8], file_offset: i64) -> Self {
        TypedValueCell {
            catalog,
            data: Some(data.to_vec().into_boxed_slice()),
            flags: None,
            file_offset,
        }
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = Some(flags);
    }

    pub fn catalog(&self) -> &ColumnCatalogEntry {
        &self.catalog
    }

    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn flags(&self) -> Option<u8> {
        self.flags
    }

    pub fn file_offset(&self) -> i64 {
        self.file_offset
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn entry() -> Rc<ColumnCatalogEntry> {
        Rc::new(ColumnCatalogEntry::new(1, ColumnType::Long, 4, "Id"))
    }

    #[test]
    fn null_cell_has_no_data() {
        let cell = TypedValueCell::null(entry(), 100);
        assert!(cell.is_null());
        assert_eq!(cell.len(), 0);
        assert_eq!(cell.file_offset(), 100);
    }

    #[test]
    fn populated_cell_owns_its_bytes() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        let cell = TypedValueCell::with_data(entry(), &bytes, 4);
        assert!(!cell.is_null());
        assert_eq!(cell.data(), Some(&bytes[..]));
        assert_eq!(cell.len(), 4);
    }
}
