//! Materialized, backend independent results.

use std::ops::Index;

use crate::types::{FieldDesc, RfcType, Value, ValueType};

/// A typed column of a `ResultTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    value_type: ValueType,
    field_type: RfcType,
    length: u32,
}

impl Column {
    pub(crate) fn from_field(field: &FieldDesc) -> Column {
        Column {
            name: field.name.clone(),
            value_type: field.value_type(),
            field_type: field.field_type,
            length: field.length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The backend type the column was derived from.
    pub fn field_type(&self) -> RfcType {
        self.field_type
    }

    pub fn length(&self) -> u32 {
        self.length
    }
}

/// One row; holds exactly one value per column of its table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(values: Vec<Value>) -> Row {
        Row { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

/// A named table with a fixed schema. Built once by the materializer and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ResultTable {
    pub(crate) fn new(name: impl Into<String>, columns: Vec<Column>) -> ResultTable {
        ResultTable {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.rows.reserve_exact(additional);
    }

    pub(crate) fn push_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        debug_assert!(row
            .values()
            .iter()
            .zip(&self.columns)
            .all(|(v, c)| v.value_type() == c.value_type()));
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column called `name`; column names are matched
    /// case insensitively like the backend does.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(index))
    }
}

/// All tables returned by one call, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    tables: Vec<ResultTable>,
}

impl ResultSet {
    pub(crate) fn push(&mut self, table: ResultTable) {
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&ResultTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tables(&self) -> &[ResultTable] {
        &self.tables
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultTable;
    type IntoIter = std::vec::IntoIter<ResultTable>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultTable;
    type IntoIter = std::slice::Iter<'a, ResultTable>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}
