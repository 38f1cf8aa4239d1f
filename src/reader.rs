//! Forward only reader over a single table result.

use crate::error::{ConnectorError, GatewayResult, Result};
use crate::gateway::RfcTable;
use crate::materialize::{read_cell, schema};
use crate::table::Column;
use crate::types::Value;

/// Reads one table row by row, moving the table's own cursor instead of
/// copying the rows out.
///
/// The row count is taken once when the reader is created. `read` has to be
/// called before the first row is available.
pub struct RfcReader<T: RfcTable> {
    name: String,
    table: Option<T>,
    columns: Vec<Column>,
    row_count: usize,
    // None while positioned before the first row
    cursor: Option<usize>,
    item: Option<usize>,
}

impl<T: RfcTable> RfcReader<T> {
    /// Create a reader over `table`. Fails with `Argument` if there is none;
    /// use `RfcReader::empty` to explicitly read nothing.
    pub fn new(name: impl Into<String>, table: Option<T>) -> Result<RfcReader<T>> {
        let name = name.into();
        let table = table.ok_or_else(|| {
            ConnectorError::Argument(format!("no table handle for reader '{}'", name))
        })?;
        let columns = schema(&name, &table)?;
        let row_count = table
            .row_count()
            .map_err(|source| ConnectorError::TableMetadata {
                table: name.clone(),
                source,
            })?;
        Ok(RfcReader {
            name,
            table: Some(table),
            columns,
            row_count,
            cursor: None,
            item: None,
        })
    }

    /// A reader without a table; it has no rows.
    pub fn empty() -> RfcReader<T> {
        RfcReader {
            name: String::new(),
            table: None,
            columns: Vec::new(),
            row_count: 0,
            cursor: None,
            item: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn has_rows(&self) -> bool {
        self.row_count > 0
    }

    /// Advance to the next row. Returns false at the end of the table; the
    /// current item then stays on the last row read.
    pub fn read(&mut self) -> Result<bool> {
        if self.row_count == 0 {
            return Ok(false);
        }
        let table = match self.table.as_mut() {
            Some(table) => table,
            None => return Ok(false),
        };
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.row_count {
            self.cursor = Some(self.row_count);
            return Ok(false);
        }
        table
            .set_current_index(next)
            .map_err(|source| ConnectorError::RowPositioning {
                table: self.name.clone(),
                row: next,
                source,
            })?;
        self.cursor = Some(next);
        self.item = Some(next);
        Ok(true)
    }

    /// Rewind to before the first row.
    pub fn reset_index(&mut self) {
        self.cursor = None;
    }

    /// The row the last successful `read` moved to.
    pub fn item(&self) -> Option<RowView<'_, T>> {
        let index = self.item?;
        let table = self.table.as_ref()?;
        Some(RowView {
            table_name: &self.name,
            table,
            columns: &self.columns,
            index,
        })
    }
}

/// Access to the reader's current row.
pub struct RowView<'r, T: RfcTable> {
    table_name: &'r str,
    table: &'r T,
    columns: &'r [Column],
    index: usize,
}

impl<'r, T: RfcTable> RowView<'r, T> {
    /// Zero based row number.
    pub fn index(&self) -> usize {
        self.index
    }

    fn wrap<V>(&self, field: usize, res: GatewayResult<V>) -> Result<V> {
        res.map_err(|source| ConnectorError::RowExtraction {
            table: self.table_name.to_string(),
            column: self
                .columns
                .get(field)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("#{}", field)),
            row: self.index,
            source,
        })
    }

    pub fn get_string(&self, field: usize) -> Result<String> {
        self.wrap(field, self.table.get_string(field))
    }

    pub fn get_int(&self, field: usize) -> Result<i32> {
        self.wrap(field, self.table.get_int(field))
    }

    pub fn get_long(&self, field: usize) -> Result<i64> {
        self.wrap(field, self.table.get_long(field))
    }

    pub fn get_short(&self, field: usize) -> Result<i16> {
        self.wrap(field, self.table.get_short(field))
    }

    pub fn get_byte(&self, field: usize) -> Result<u8> {
        self.wrap(field, self.table.get_byte(field))
    }

    pub fn get_double(&self, field: usize) -> Result<f64> {
        self.wrap(field, self.table.get_double(field))
    }

    pub fn get_bytes(&self, field: usize) -> Result<Vec<u8>> {
        self.wrap(field, self.table.get_bytes(field))
    }

    /// Field `field` converted to its column's generic type.
    pub fn value(&self, field: usize) -> Result<Value> {
        let column = self.columns.get(field).ok_or_else(|| {
            ConnectorError::Argument(format!(
                "table '{}' has no field #{}",
                self.table_name, field
            ))
        })?;
        self.wrap(field, read_cell(self.table, field, column.value_type()))
    }

    pub fn value_by_name(&self, name: &str) -> Result<Value> {
        let field = self
            .columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                ConnectorError::Argument(format!(
                    "table '{}' has no field '{}'",
                    self.table_name, name
                ))
            })?;
        self.value(field)
    }

    /// All fields of the row, typed like a materialized row.
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.columns.len()).map(|f| self.value(f)).collect()
    }
}
