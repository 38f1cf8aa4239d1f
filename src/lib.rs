//! ADO.NET style access to SAP remote function modules.
//!
//! A [`Connection`] registers a destination configuration with a
//! [`gateway::Gateway`] and opens it. [`Command`]s call remote function
//! modules on the connection and return their table results either fully
//! materialized ([`ResultSet`]), as raw gateway tables, or through a
//! forward only [`RfcReader`]. Calls can be grouped in a [`Transaction`]
//! or pinned to one backend context with a [`Session`].
//!
//! [`NwrfcGateway`] drives the SAP NetWeaver RFC SDK, which is loaded at
//! runtime.
//!
//! ```no_run
//! use sapconn::{Command, Connection, DestinationCatalog, NwrfcGateway};
//!
//! # fn main() -> sapconn::Result<()> {
//! let gateway = NwrfcGateway::load()?;
//! let catalog = DestinationCatalog::from_path("destinations.json")?;
//! let mut conn = Connection::from_catalog(&gateway, &catalog, Some("DEV"))?;
//! conn.open()?;
//!
//! let cmd = Command::with_connection("BAPI_GET_PROJECT_DETAILS_TABLE", &conn)
//!     .parameter("PROJECT_TYPE", "EP");
//! let results = cmd.execute_data_set()?;
//! for table in &results {
//!     println!("{}: {} rows", table.name(), table.row_count());
//! }
//! # Ok(())
//! # }
//! ```

extern crate dlopen;
#[macro_use]
extern crate dlopen_derive;
extern crate widestring;

pub mod command;
pub mod config;
pub mod connection;
pub mod connparams;
pub mod error;
pub mod gateway;
pub mod materialize;
pub mod metadata;
pub mod nwrfc;
pub mod parameter;
pub mod reader;
pub mod session;
pub mod table;
pub mod types;
mod rfc;

pub use crate::command::Command;
pub use crate::config::DestinationCatalog;
pub use crate::connection::{Connection, Transaction};
pub use crate::connparams::{DestinationConfig, RfcConnectionParameters};
pub use crate::error::{ConnectorError, Result, RfcErrorInfo};
pub use crate::gateway::{Destination, Gateway, RemoteFunction, RfcTable, SessionProvider};
pub use crate::nwrfc::NwrfcGateway;
pub use crate::parameter::{Parameter, Parameters, RfcValue};
pub use crate::reader::{RfcReader, RowView};
pub use crate::rfc::{ParameterDesc, RfcLib};
pub use crate::session::Session;
pub use crate::table::{Column, ResultSet, ResultTable, Row};
pub use crate::types::{map_field_type, FieldDesc, RfcType, Value, ValueType};
