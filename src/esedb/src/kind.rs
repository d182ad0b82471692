/// Discriminant of a [`crate::definition::DataDefinition`].
///
/// A plain enum describing which on-disk object a decoded structure
/// represents, used both as the immutable tag on a `DataDefinition` and
/// as the expected-kind argument to catalog-list append operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDefinitionKind {
    Table,
    Column,
    Index,
    Record,
    LongValue,
}

impl DataDefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataDefinitionKind::Table => "TABLE",
            DataDefinitionKind::Column => "COLUMN",
            DataDefinitionKind::Index => "INDEX",
            DataDefinitionKind::Record => "RECORD",
            DataDefinitionKind::LongValue => "LONG_VALUE",
        }
    }
}

impl std::fmt::Display for DataDefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
