use std::rc::Rc;

use crate::column::ColumnCatalogEntry;
use crate::definition::DataDefinition;
use crate::error::EseError;
use crate::kind::DataDefinitionKind;

/// Owns a table's column, index, and long-value descriptor lists.
///
/// Construction takes the `TABLE` data definition (kind-checked); each
/// list is insertion-ordered, and every append validates the kind of
/// the definition being added before it is admitted to the list.
pub struct TableDefinition {
    table: DataDefinition,
    columns: Vec<(DataDefinition, Rc<ColumnCatalogEntry>)>,
    indexes: Vec<DataDefinition>,
    long_values: Vec<DataDefinition>,
}

impl TableDefinition {
    pub fn new(table: DataDefinition) -> Result<Self, EseError> {
        if table.kind() != DataDefinitionKind::Table {
            return Err(EseError::CatalogMismatch {
                what: format!("expected TABLE definition, found {}", table.kind()),
            });
        }
        Ok(TableDefinition {
            table,
            columns: Vec::new(),
            indexes: Vec::new(),
            long_values: Vec::new(),
        })
    }

    pub fn table(&self) -> &DataDefinition {
        &self.table
    }

    pub fn append_column(
        &mut self,
        definition: DataDefinition,
        entry: Rc<ColumnCatalogEntry>,
    ) -> Result<(), EseError> {
        if definition.kind() != DataDefinitionKind::Column {
            return Err(EseError::CatalogMismatch {
                what: format!("expected COLUMN definition, found {}", definition.kind()),
            });
        }
        self.columns.push((definition, entry));
        Ok(())
    }

    pub fn append_index(&mut self, definition: DataDefinition) -> Result<(), EseError> {
        if definition.kind() != DataDefinitionKind::Index {
            return Err(EseError::CatalogMismatch {
                what: format!("expected INDEX definition, found {}", definition.kind()),
            });
        }
        self.indexes.push(definition);
        Ok(())
    }

    pub fn append_long_value(&mut self, definition: DataDefinition) -> Result<(), EseError> {
        if definition.kind() != DataDefinitionKind::LongValue {
            return Err(EseError::CatalogMismatch {
                what: format!("expected LONG_VALUE definition, found {}", definition.kind()),
            });
        }
        self.long_values.push(definition);
        Ok(())
    }

    /// Column catalog entries in insertion order, ready to hand to
    /// [`crate::record::build_effective_catalog`] or
    /// [`crate::record::decode_record`].
    pub fn column_catalog(&self) -> Vec<Rc<ColumnCatalogEntry>> {
        self.columns.iter().map(|(_, entry)| entry.clone()).collect()
    }

    pub fn indexes(&self) -> &[DataDefinition] {
        &self.indexes
    }

    pub fn long_values(&self) -> &[DataDefinition] {
        &self.long_values
    }
}
