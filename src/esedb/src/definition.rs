use crate::error::EseError;
use crate::key::KeyBuffer;
use crate::kind::DataDefinitionKind;
use crate::long_value::LongValueAssembler;
use crate::value::TypedValueCell;

/// Payload that varies by [`DataDefinitionKind`].
///
/// `Table`, `Column` and `Index` definitions carry only their identity
/// and an optional key; the interesting payloads belong to `Record`
/// (the decoded cell list) and `LongValue` (an assembler delegating its
/// contiguity bookkeeping to `crate::long_value`).
#[derive(Debug, Clone, PartialEq)]
pub enum DataDefinitionPayload {
    Empty,
    Record(Vec<TypedValueCell>),
    LongValue(LongValueAssembler),
}

/// A decoded on-disk object: table, column, index, record, or long value.
///
/// The kind is fixed at construction and never changes; every operation
/// that mutates the definition checks its kind first and returns
/// [`EseError::CatalogMismatch`] on a mismatch rather than panicking.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDefinition {
    kind: DataDefinitionKind,
    key: Option<KeyBuffer>,
    payload: DataDefinitionPayload,
}

impl DataDefinition {
    pub fn new(kind: DataDefinitionKind) -> Self {
        DataDefinition {
            kind,
            key: None,
            payload: DataDefinitionPayload::Empty,
        }
    }

    pub fn kind(&self) -> DataDefinitionKind {
        self.kind
    }

    pub fn key(&self) -> Option<&KeyBuffer> {
        self.key.as_ref()
    }

    pub fn key_mut(&mut self) -> &mut Option<KeyBuffer> {
        &mut self.key
    }

    fn expect_kind(&self, expected: DataDefinitionKind) -> Result<(), EseError> {
        if self.kind != expected {
            return Err(EseError::CatalogMismatch {
                what: format!("expected {} definition, found {}", expected, self.kind),
            });
        }
        Ok(())
    }

    pub fn set_record_cells(&mut self, cells: Vec<TypedValueCell>) -> Result<(), EseError> {
        self.expect_kind(DataDefinitionKind::Record)?;
        self.payload = DataDefinitionPayload::Record(cells);
        Ok(())
    }

    pub fn record_cells(&self) -> Result<&[TypedValueCell], EseError> {
        self.expect_kind(DataDefinitionKind::Record)?;
        match &self.payload {
            DataDefinitionPayload::Record(cells) => Ok(cells),
            _ => Err(EseError::StateMissing {
                what: "record cells",
            }),
        }
    }

    /// Reads the 8-byte long-value header and starts a fresh segment chain.
    /// Must run before the first `append_long_value_segment` call.
    pub fn init_long_value(&mut self, header: &[u8]) -> Result<(), EseError> {
        self.expect_kind(DataDefinitionKind::LongValue)?;
        self.payload = DataDefinitionPayload::LongValue(LongValueAssembler::from_header(header)?);
        Ok(())
    }

    /// Appends one out-of-row segment at logical `segment_offset`,
    /// delegating contiguity enforcement to `LongValueAssembler`.
    pub fn append_long_value_segment(
        &mut self,
        segment_offset: u64,
        file_offset: i64,
        length: u32,
    ) -> Result<(), EseError> {
        self.expect_kind(DataDefinitionKind::LongValue)?;
        match &mut self.payload {
            DataDefinitionPayload::LongValue(assembler) => {
                assembler.append_segment(segment_offset, file_offset, length)
            }
            DataDefinitionPayload::Empty => Err(EseError::StateMissing {
                what: "long value header (call init_long_value first)",
            }),
            DataDefinitionPayload::Record(_) => unreachable!("kind checked above"),
        }
    }

    pub fn long_value_segments(&self) -> Result<&[(i64, u32)], EseError> {
        self.expect_kind(DataDefinitionKind::LongValue)?;
        match &self.payload {
            DataDefinitionPayload::LongValue(assembler) => Ok(assembler.segments()),
            DataDefinitionPayload::Empty => Ok(&[]),
            _ => Err(EseError::StateMissing {
                what: "long value segments",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnCatalogEntry, ColumnType};
    use std::rc::Rc;

    #[test]
    fn record_kind_rejects_long_value_operations() {
        let mut def = DataDefinition::new(DataDefinitionKind::Record);
        let err = def.append_long_value_segment(0, 0, 4).unwrap_err();
        assert!(matches!(err, EseError::CatalogMismatch { .. }));
    }

    #[test]
    fn record_cells_round_trip() {
        let mut def = DataDefinition::new(DataDefinitionKind::Record);
        let entry = Rc::new(ColumnCatalogEntry::new(1, ColumnType::Long, 4, "Id"));
        let cell = TypedValueCell::with_data(entry, &[1, 0, 0, 0], 0);
        def.set_record_cells(vec![cell.clone()]).unwrap();
        assert_eq!(def.record_cells().unwrap(), &[cell]);
    }

    #[test]
    fn long_value_segments_accumulate_in_order() {
        let mut def = DataDefinition::new(DataDefinitionKind::LongValue);
        def.init_long_value(&[0u8; 8]).unwrap();
        def.append_long_value_segment(0, 100, 16).unwrap();
        def.append_long_value_segment(16, 200, 32).unwrap();
        assert_eq!(def.long_value_segments().unwrap(), &[(100, 16), (200, 32)]);
    }

    #[test]
    fn long_value_segment_gap_is_rejected() {
        let mut def = DataDefinition::new(DataDefinitionKind::LongValue);
        def.init_long_value(&[0u8; 8]).unwrap();
        def.append_long_value_segment(0, 100, 16).unwrap();
        let err = def.append_long_value_segment(20, 200, 32).unwrap_err();
        assert!(matches!(err, EseError::BoundsExceeded { .. }));
    }

    #[test]
    fn append_before_init_is_rejected() {
        let mut def = DataDefinition::new(DataDefinitionKind::LongValue);
        let err = def.append_long_value_segment(0, 100, 16).unwrap_err();
        assert!(matches!(err, EseError::StateMissing { .. }));
    }
}
