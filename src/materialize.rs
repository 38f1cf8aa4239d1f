//! Conversion of backend table handles into `ResultTable`s.

use crate::error::{ConnectorError, GatewayResult, Result};
use crate::gateway::{RemoteFunction, RfcTable};
use crate::metadata::table_names;
use crate::table::{Column, ResultSet, ResultTable, Row};
use crate::types::{Value, ValueType};

/// Read field `field` of the table's current row with the accessor that
/// belongs to `value_type`.
pub fn read_cell<T: RfcTable + ?Sized>(
    table: &T,
    field: usize,
    value_type: ValueType,
) -> GatewayResult<Value> {
    Ok(match value_type {
        ValueType::Bytes => Value::Bytes(table.get_bytes(field)?),
        ValueType::Int32 => Value::Int32(table.get_int(field)?),
        ValueType::UInt8 => Value::UInt8(table.get_byte(field)?),
        ValueType::Int16 => Value::Int16(table.get_short(field)?),
        ValueType::Int64 => Value::Int64(table.get_long(field)?),
        ValueType::Float64 => Value::Float64(table.get_double(field)?),
        ValueType::String => Value::String(table.get_string(field)?),
    })
}

/// Column schema of `table`, in field order.
pub fn schema<T: RfcTable + ?Sized>(name: &str, table: &T) -> Result<Vec<Column>> {
    let fields = table
        .fields()
        .map_err(|source| ConnectorError::TableMetadata {
            table: name.to_string(),
            source,
        })?;
    Ok(fields.iter().map(Column::from_field).collect())
}

/// Copy every row of `table` into a new `ResultTable` called `name`.
///
/// The first unreadable cell aborts the whole table.
pub fn materialize_table<T: RfcTable + ?Sized>(name: &str, table: &mut T) -> Result<ResultTable> {
    let columns = schema(name, &*table)?;
    let row_count = table
        .row_count()
        .map_err(|source| ConnectorError::TableMetadata {
            table: name.to_string(),
            source,
        })?;

    let mut result = ResultTable::new(name, columns);
    result.reserve(row_count);
    for row in 0..row_count {
        table
            .set_current_index(row)
            .map_err(|source| ConnectorError::RowPositioning {
                table: name.to_string(),
                row,
                source,
            })?;
        let mut values = Vec::with_capacity(result.column_count());
        for (index, column) in result.columns().iter().enumerate() {
            let value = read_cell(&*table, index, column.value_type()).map_err(|source| {
                ConnectorError::RowExtraction {
                    table: name.to_string(),
                    column: column.name().to_string(),
                    row,
                    source,
                }
            })?;
            values.push(value);
        }
        result.push_row(Row::new(values));
    }
    log::debug!("materialized table {} with {} rows", name, row_count);
    Ok(result)
}

/// Handles of all table parameters of an invoked function, in discovery order.
pub fn discover_tables<F: RemoteFunction>(function: &F) -> Result<Vec<(String, F::Table)>> {
    table_names(&function.metadata())
        .into_iter()
        .map(|name| {
            let table = function
                .table(&name)
                .map_err(|source| ConnectorError::TableMetadata {
                    table: name.clone(),
                    source,
                })?;
            Ok((name, table))
        })
        .collect()
}

/// Materialize every table parameter of an invoked function.
pub fn materialize_function<F: RemoteFunction>(function: &F) -> Result<ResultSet> {
    let mut set = ResultSet::default();
    for (name, mut table) in discover_tables(function)? {
        set.push(materialize_table(&name, &mut table)?);
    }
    Ok(set)
}
