//! Remote function commands.

use crate::connection::{Connection, Transaction};
use crate::error::{ConnectorError, Result};
use crate::gateway::{Destination, FunctionOf, Gateway, RemoteFunction, TableOf};
use crate::materialize::{discover_tables, materialize_function};
use crate::metadata::table_names;
use crate::parameter::{Parameter, Parameters, RfcValue};
use crate::reader::RfcReader;
use crate::table::ResultSet;

/// A call of one remote function on a connection.
///
/// The command text is the function name. Parameters are bound in the
/// order they were added, so a name added twice ends up with the value
/// added last. If a transaction is set, the call is enlisted in it before
/// it is invoked.
pub struct Command<'c, 'gw, G: Gateway> {
    text: String,
    connection: Option<&'c Connection<'gw, G>>,
    transaction: Option<&'c Transaction<'c, 'gw, G>>,
    parameters: Parameters,
}

impl<'c, 'gw, G: Gateway> Command<'c, 'gw, G> {
    pub fn new(text: impl Into<String>) -> Command<'c, 'gw, G> {
        Command {
            text: text.into(),
            connection: None,
            transaction: None,
            parameters: Parameters::new(),
        }
    }

    pub fn with_connection(
        text: impl Into<String>,
        connection: &'c Connection<'gw, G>,
    ) -> Command<'c, 'gw, G> {
        let mut command = Command::new(text);
        command.connection = Some(connection);
        command
    }

    /// Command on the transaction's connection, enlisted in `transaction`.
    pub fn with_transaction(
        text: impl Into<String>,
        transaction: &'c Transaction<'c, 'gw, G>,
    ) -> Command<'c, 'gw, G> {
        let mut command = Command::with_connection(text, transaction.connection());
        command.transaction = Some(transaction);
        command
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn connection(&self) -> Option<&'c Connection<'gw, G>> {
        self.connection
    }

    pub fn set_connection(&mut self, connection: Option<&'c Connection<'gw, G>>) {
        self.connection = connection;
    }

    pub fn transaction(&self) -> Option<&'c Transaction<'c, 'gw, G>> {
        self.transaction
    }

    pub fn set_transaction(&mut self, transaction: Option<&'c Transaction<'c, 'gw, G>>) {
        self.transaction = transaction;
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<RfcValue>) {
        self.parameters.push(Parameter::new(name, value));
    }

    /// Builder style `add_parameter`.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<RfcValue>) -> Self {
        self.add_parameter(name, value);
        self
    }

    /// Resolve, bind, enlist and invoke the function. Returns the invoked
    /// function so its results can be read.
    ///
    /// Nothing reaches the gateway unless the command has a name and an
    /// open connection.
    pub fn execute_rfc(&self) -> Result<FunctionOf<G>> {
        if self.text.trim().is_empty() {
            return Err(ConnectorError::Configuration(
                "command text is empty".to_string(),
            ));
        }
        let connection = self.connection.ok_or_else(|| {
            ConnectorError::Configuration(format!("command '{}' has no connection", self.text))
        })?;
        let destination = connection.destination()?;
        if let Some(transaction) = self.transaction {
            if !std::ptr::eq(transaction.connection(), connection) {
                return Err(ConnectorError::Configuration(format!(
                    "transaction {} of command '{}' belongs to another connection",
                    transaction.id(),
                    self.text
                )));
            }
        }

        let mut function = destination.create_function(&self.text).map_err(|source| {
            ConnectorError::CommandResolution {
                command: self.text.clone(),
                source,
            }
        })?;
        for parameter in &self.parameters {
            function
                .set_value(&parameter.name, &parameter.value)
                .map_err(|source| ConnectorError::ParameterBinding {
                    command: self.text.clone(),
                    parameter: parameter.name.clone(),
                    source,
                })?;
        }
        if let Some(transaction) = self.transaction {
            transaction.enlist(&self.text, &function)?;
            log::debug!("enlisted {} in transaction {}", self.text, transaction.id());
        }

        log::debug!(
            "invoking {} on {} with {} parameters",
            self.text,
            destination.name(),
            self.parameters.len()
        );
        destination
            .invoke(&mut function)
            .map_err(|source| ConnectorError::Invocation {
                command: self.text.clone(),
                source,
            })?;
        Ok(function)
    }

    /// Invoke and copy every table result into memory.
    pub fn execute_data_set(&self) -> Result<ResultSet> {
        let function = self.execute_rfc()?;
        materialize_function(&function)
    }

    /// Invoke and hand out the raw table results, in declaration order.
    pub fn execute_rfc_tables(&self) -> Result<Vec<(String, TableOf<G>)>> {
        let function = self.execute_rfc()?;
        discover_tables(&function)
    }

    /// Invoke and read one table result row by row. Without a name the
    /// first declared table is read.
    pub fn execute_reader(&self, table: Option<&str>) -> Result<RfcReader<TableOf<G>>> {
        let function = self.execute_rfc()?;
        let mut names = table_names(&function.metadata()).into_iter();
        let name = match table {
            Some(requested) => names
                .find(|n| n.eq_ignore_ascii_case(requested))
                .ok_or_else(|| {
                    ConnectorError::Argument(format!(
                        "function '{}' returns no table '{}'",
                        self.text, requested
                    ))
                })?,
            None => names.next().ok_or_else(|| {
                ConnectorError::Argument(format!("function '{}' returns no tables", self.text))
            })?,
        };
        let handle = function
            .table(&name)
            .map_err(|source| ConnectorError::TableMetadata {
                table: name.clone(),
                source,
            })?;
        RfcReader::new(name, Some(handle))
    }
}
