//! The surface of the RPC gateway this crate drives.
//!
//! A gateway owns destination configuration, resolves destinations, and
//! hands out callable functions and their table results. The adapter in
//! `command`, `connection` and `session` only talks to these traits;
//! `nwrfc::NwrfcGateway` implements them on top of the NetWeaver RFC SDK.

use std::fmt;
use std::sync::Arc;

use crate::connparams::DestinationConfig;
use crate::error::{GatewayResult, RfcErrorInfo};
use crate::parameter::RfcValue;
use crate::types::FieldDesc;

pub trait Gateway {
    type Destination: Destination;

    /// Make `config` resolvable under `name`.
    fn register_destination(&self, name: &str, config: &DestinationConfig) -> GatewayResult<()>;

    fn unregister_destination(&self, name: &str) -> GatewayResult<()>;

    /// Resolve a registered destination to a live handle.
    fn get_destination(&self, name: &str) -> GatewayResult<Self::Destination>;

    fn register_session_provider(&self, provider: &Arc<dyn SessionProvider>) -> GatewayResult<()>;

    fn unregister_session_provider(&self, provider: &Arc<dyn SessionProvider>)
        -> GatewayResult<()>;

    /// Pin the following calls on `destination` to one backend context.
    fn begin_context(&self, destination: &Self::Destination) -> GatewayResult<()>;

    fn end_context(&self, destination: &Self::Destination) -> GatewayResult<()>;
}

/// A resolved destination: function repository, invocation and units of work.
pub trait Destination {
    type Function: RemoteFunction;
    /// A transactional unit of work. Dropping it without commit discards it.
    type Unit;

    fn name(&self) -> &str;

    /// Look `name` up in the destination's repository and create a callable.
    fn create_function(&self, name: &str) -> GatewayResult<Self::Function>;

    fn invoke(&self, function: &mut Self::Function) -> GatewayResult<()>;

    fn begin_unit(&self) -> GatewayResult<Self::Unit>;

    fn enlist(&self, unit: &mut Self::Unit, function: &Self::Function) -> GatewayResult<()>;

    fn commit_unit(&self, unit: &mut Self::Unit) -> GatewayResult<()>;
}

/// A callable remote function.
pub trait RemoteFunction {
    type Table: RfcTable;

    fn name(&self) -> &str;

    fn set_value(&mut self, name: &str, value: &RfcValue) -> GatewayResult<()>;

    /// Free text describing the function signature. Table parameters are
    /// declared as `TABLES <name>:`; see `metadata::table_names`.
    fn metadata(&self) -> String;

    fn table(&self, name: &str) -> GatewayResult<Self::Table>;
}

/// A table result: a row cursor plus typed accessors on the current row.
/// Field arguments are indices into `fields()`.
pub trait RfcTable {
    fn row_count(&self) -> GatewayResult<usize>;

    fn set_current_index(&mut self, index: usize) -> GatewayResult<()>;

    fn fields(&self) -> GatewayResult<Vec<FieldDesc>>;

    fn get_bytes(&self, field: usize) -> GatewayResult<Vec<u8>>;

    fn get_int(&self, field: usize) -> GatewayResult<i32>;

    fn get_byte(&self, field: usize) -> GatewayResult<u8>;

    fn get_short(&self, field: usize) -> GatewayResult<i16>;

    fn get_double(&self, field: usize) -> GatewayResult<f64>;

    fn get_string(&self, field: usize) -> GatewayResult<String>;

    /// Long numeric text has no native 64 bit accessor on most backends,
    /// so the default reads the text and parses it.
    fn get_long(&self, field: usize) -> GatewayResult<i64> {
        let text = self.get_string(field)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        trimmed.parse::<i64>().map_err(|e| {
            RfcErrorInfo::custom(&format!("'{}' is not a 64 bit integer: {}", trimmed, e))
        })
    }
}

/// Lets the gateway pin stateful calls to one backend instance.
pub trait SessionProvider: Send + Sync {
    /// Identifier of the session the current caller belongs to.
    fn current_session_id(&self) -> String;
}

impl fmt::Debug for dyn SessionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionProvider")
            .field("session", &self.current_session_id())
            .finish()
    }
}

pub type FunctionOf<G> = <<G as Gateway>::Destination as Destination>::Function;
pub type TableOf<G> = <FunctionOf<G> as RemoteFunction>::Table;
pub type UnitOf<G> = <<G as Gateway>::Destination as Destination>::Unit;
