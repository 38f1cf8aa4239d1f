#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, fmt::Write as _, rc::Rc, sync::Arc};

use sapconn::error::{GatewayResult, RfcErrorInfo, RfcRc};
use sapconn::{
    Destination, DestinationConfig, FieldDesc, Gateway, RemoteFunction, RfcTable, RfcType,
    RfcValue, SessionProvider, Value,
};

/// Rows and field layout of one table result.
#[derive(Debug)]
pub struct TableData {
    pub fields: Vec<FieldDesc>,
    pub rows: Vec<Vec<Value>>,
}

pub fn table_data(fields: &[(&str, RfcType, u32)], rows: Vec<Vec<Value>>) -> Rc<TableData> {
    Rc::new(TableData {
        fields: fields
            .iter()
            .map(|(name, field_type, length)| FieldDesc::new(*name, *field_type, *length))
            .collect(),
        rows,
    })
}

/// What a function created from the fake repository looks like.
#[derive(Debug, Clone, Default)]
pub struct FunctionTemplate {
    parameters: Vec<String>,
    tables: Vec<(String, Rc<TableData>)>,
    metadata: Option<String>,
}

impl FunctionTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(mut self, name: &str) -> Self {
        self.parameters.push(name.to_string());
        self
    }

    pub fn table(mut self, name: &str, data: Rc<TableData>) -> Self {
        self.tables.push((name.to_string(), data));
        self
    }

    /// Replace the generated metadata text.
    pub fn metadata(mut self, text: &str) -> Self {
        self.metadata = Some(text.to_string());
        self
    }
}

#[derive(Debug, Default)]
struct FakeGatewayState {
    journal: Vec<String>,
    registered: HashMap<String, DestinationConfig>,
    functions: HashMap<String, FunctionTemplate>,
    invocations: Vec<(String, Vec<(String, RfcValue)>)>,
    provider: Option<Arc<dyn SessionProvider>>,
    next_unit: usize,
    committed_units: Vec<Vec<String>>,
    discarded_units: usize,
    fail_register: bool,
    fail_open: bool,
    fail_binding: Option<String>,
    fail_invoke: bool,
    fail_enlist: bool,
    fail_commit: bool,
    fail_unregister: bool,
    fail_context: bool,
    fail_cell: Option<(usize, usize)>,
}

/// Records every call in a journal and answers from the configured
/// function templates. Handles share the state of the gateway that made
/// them.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    state: Rc<RefCell<FakeGatewayState>>,
}

fn fake_error(code: RfcRc, message: impl Into<String>) -> RfcErrorInfo {
    RfcErrorInfo::with_code(code, &message.into())
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(self, name: &str, template: FunctionTemplate) -> Self {
        self.state
            .borrow_mut()
            .functions
            .insert(name.to_string(), template);
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.state.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state.borrow().registered.contains_key(name)
    }

    pub fn registered_count(&self) -> usize {
        self.state.borrow().registered.len()
    }

    pub fn invocations(&self) -> Vec<(String, Vec<(String, RfcValue)>)> {
        self.state.borrow().invocations.clone()
    }

    pub fn has_provider(&self) -> bool {
        self.state.borrow().provider.is_some()
    }

    pub fn committed_units(&self) -> Vec<Vec<String>> {
        self.state.borrow().committed_units.clone()
    }

    pub fn discarded_units(&self) -> usize {
        self.state.borrow().discarded_units
    }

    pub fn set_fail_register(&self, fail: bool) {
        self.state.borrow_mut().fail_register = fail;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.borrow_mut().fail_open = fail;
    }

    pub fn set_fail_binding(&self, parameter: &str) {
        self.state.borrow_mut().fail_binding = Some(parameter.to_string());
    }

    pub fn set_fail_invoke(&self, fail: bool) {
        self.state.borrow_mut().fail_invoke = fail;
    }

    pub fn set_fail_enlist(&self, fail: bool) {
        self.state.borrow_mut().fail_enlist = fail;
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.state.borrow_mut().fail_commit = fail;
    }

    pub fn set_fail_unregister(&self, fail: bool) {
        self.state.borrow_mut().fail_unregister = fail;
    }

    pub fn set_fail_context(&self, fail: bool) {
        self.state.borrow_mut().fail_context = fail;
    }

    /// Fail reading `field` of row `row` in any table.
    pub fn set_fail_cell(&self, row: usize, field: usize) {
        self.state.borrow_mut().fail_cell = Some((row, field));
    }

    fn record(&self, entry: String) {
        self.state.borrow_mut().journal.push(entry);
    }
}

impl Gateway for FakeGateway {
    type Destination = FakeDestination;

    fn register_destination(&self, name: &str, config: &DestinationConfig) -> GatewayResult<()> {
        self.record(format!("register {}", name));
        let mut state = self.state.borrow_mut();
        if state.fail_register {
            return Err(fake_error(RfcRc::RfcIllegalState, "registration refused"));
        }
        state.registered.insert(name.to_string(), config.clone());
        Ok(())
    }

    fn unregister_destination(&self, name: &str) -> GatewayResult<()> {
        self.record(format!("unregister {}", name));
        let mut state = self.state.borrow_mut();
        if state.fail_unregister {
            return Err(fake_error(RfcRc::RfcIllegalState, "unregistration refused"));
        }
        match state.registered.remove(name) {
            Some(_) => Ok(()),
            None => Err(fake_error(RfcRc::RfcNotFound, format!("{} not registered", name))),
        }
    }

    fn get_destination(&self, name: &str) -> GatewayResult<FakeDestination> {
        self.record(format!("open {}", name));
        let state = self.state.borrow();
        if state.fail_open {
            return Err(fake_error(RfcRc::RfcLogonFailure, "logon refused"));
        }
        if !state.registered.contains_key(name) {
            return Err(fake_error(RfcRc::RfcNotFound, format!("{} not registered", name)));
        }
        Ok(FakeDestination {
            name: name.to_string(),
            state: Rc::clone(&self.state),
        })
    }

    fn register_session_provider(&self, provider: &Arc<dyn SessionProvider>) -> GatewayResult<()> {
        self.record(format!("register provider {}", provider.current_session_id()));
        self.state.borrow_mut().provider = Some(Arc::clone(provider));
        Ok(())
    }

    fn unregister_session_provider(
        &self,
        provider: &Arc<dyn SessionProvider>,
    ) -> GatewayResult<()> {
        self.record(format!("unregister provider {}", provider.current_session_id()));
        let mut state = self.state.borrow_mut();
        if state.fail_unregister {
            return Err(fake_error(RfcRc::RfcIllegalState, "unregistration refused"));
        }
        state.provider = None;
        Ok(())
    }

    fn begin_context(&self, destination: &FakeDestination) -> GatewayResult<()> {
        self.record(format!("begin context {}", destination.name));
        if self.state.borrow().fail_context {
            return Err(fake_error(RfcRc::RfcIllegalState, "context refused"));
        }
        Ok(())
    }

    fn end_context(&self, destination: &FakeDestination) -> GatewayResult<()> {
        self.record(format!("end context {}", destination.name));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeDestination {
    name: String,
    state: Rc<RefCell<FakeGatewayState>>,
}

impl FakeDestination {
    fn record(&self, entry: String) {
        self.state.borrow_mut().journal.push(entry);
    }
}

#[derive(Debug)]
pub struct FakeUnit {
    id: usize,
    functions: Vec<String>,
    committed: bool,
    state: Rc<RefCell<FakeGatewayState>>,
}

impl Drop for FakeUnit {
    fn drop(&mut self) {
        if !self.committed {
            let mut state = self.state.borrow_mut();
            state.discarded_units += 1;
            state.journal.push(format!("discard unit {}", self.id));
        }
    }
}

impl Destination for FakeDestination {
    type Function = FakeFunction;
    type Unit = FakeUnit;

    fn name(&self) -> &str {
        &self.name
    }

    fn create_function(&self, name: &str) -> GatewayResult<FakeFunction> {
        self.record(format!("create {}", name));
        let template = self
            .state
            .borrow()
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| fake_error(RfcRc::RfcNotFound, format!("{} not found", name)))?;
        Ok(FakeFunction {
            name: name.to_string(),
            template,
            bound: Vec::new(),
            state: Rc::clone(&self.state),
        })
    }

    fn invoke(&self, function: &mut FakeFunction) -> GatewayResult<()> {
        self.record(format!("invoke {}", function.name));
        let mut state = self.state.borrow_mut();
        if state.fail_invoke {
            return Err(fake_error(RfcRc::RfcAbapRuntimeFailure, "short dump"));
        }
        state
            .invocations
            .push((function.name.clone(), function.bound.clone()));
        Ok(())
    }

    fn begin_unit(&self) -> GatewayResult<FakeUnit> {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_unit += 1;
            state.next_unit
        };
        self.record(format!("begin unit {}", id));
        Ok(FakeUnit {
            id,
            functions: Vec::new(),
            committed: false,
            state: Rc::clone(&self.state),
        })
    }

    fn enlist(&self, unit: &mut FakeUnit, function: &FakeFunction) -> GatewayResult<()> {
        self.record(format!("enlist {} in unit {}", function.name, unit.id));
        if self.state.borrow().fail_enlist {
            return Err(fake_error(RfcRc::RfcIllegalState, "enlistment refused"));
        }
        unit.functions.push(function.name.clone());
        Ok(())
    }

    fn commit_unit(&self, unit: &mut FakeUnit) -> GatewayResult<()> {
        self.record(format!("commit unit {}", unit.id));
        let mut state = self.state.borrow_mut();
        if state.fail_commit {
            return Err(fake_error(RfcRc::RfcCommunicationFailure, "commit failed"));
        }
        state.committed_units.push(unit.functions.clone());
        unit.committed = true;
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeFunction {
    name: String,
    template: FunctionTemplate,
    bound: Vec<(String, RfcValue)>,
    state: Rc<RefCell<FakeGatewayState>>,
}

impl RemoteFunction for FakeFunction {
    type Table = FakeTable;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_value(&mut self, name: &str, value: &RfcValue) -> GatewayResult<()> {
        self.state
            .borrow_mut()
            .journal
            .push(format!("bind {}.{}", self.name, name));
        if self.state.borrow().fail_binding.as_deref() == Some(name) {
            return Err(fake_error(RfcRc::RfcConversionFailure, "conversion failed"));
        }
        if !self
            .template
            .parameters
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
        {
            return Err(fake_error(
                RfcRc::RfcInvalidParameter,
                format!("{} has no parameter {}", self.name, name),
            ));
        }
        self.bound.push((name.to_string(), value.clone()));
        Ok(())
    }

    fn metadata(&self) -> String {
        if let Some(text) = &self.template.metadata {
            return text.clone();
        }
        let mut text = format!("FUNCTION {}\n", self.name);
        for parameter in &self.template.parameters {
            let _ = writeln!(text, "IMPORTING {}: CHAR(40)", parameter);
        }
        for (name, data) in &self.template.tables {
            let _ = writeln!(text, "TABLES {}: TABLE({})", name, data.fields.len());
        }
        text
    }

    fn table(&self, name: &str) -> GatewayResult<FakeTable> {
        let data = self
            .template
            .tables
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, data)| Rc::clone(data))
            .ok_or_else(|| fake_error(RfcRc::RfcNotFound, format!("no table {}", name)))?;
        Ok(FakeTable {
            data,
            current: None,
            state: Rc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct FakeTable {
    data: Rc<TableData>,
    current: Option<usize>,
    state: Rc<RefCell<FakeGatewayState>>,
}

impl FakeTable {
    fn cell(&self, field: usize) -> GatewayResult<&Value> {
        let row = self
            .current
            .ok_or_else(|| fake_error(RfcRc::RfcIllegalState, "no current row"))?;
        if self.state.borrow().fail_cell == Some((row, field)) {
            return Err(fake_error(RfcRc::RfcConversionFailure, "unreadable cell"));
        }
        self.data.rows[row]
            .get(field)
            .ok_or_else(|| fake_error(RfcRc::RfcInvalidParameter, format!("no field #{}", field)))
    }

    fn number(&self, field: usize) -> GatewayResult<i64> {
        let value = self.cell(field)?;
        match value {
            Value::String(text) => text
                .trim()
                .parse()
                .map_err(|_| fake_error(RfcRc::RfcConversionFailure, "not a number")),
            other => other
                .as_i64()
                .ok_or_else(|| fake_error(RfcRc::RfcConversionFailure, "not a number")),
        }
    }
}

impl RfcTable for FakeTable {
    fn row_count(&self) -> GatewayResult<usize> {
        Ok(self.data.rows.len())
    }

    fn set_current_index(&mut self, index: usize) -> GatewayResult<()> {
        if index >= self.data.rows.len() {
            return Err(fake_error(RfcRc::RfcTableMoveEof, "moved past the last row"));
        }
        self.current = Some(index);
        Ok(())
    }

    fn fields(&self) -> GatewayResult<Vec<FieldDesc>> {
        Ok(self.data.fields.clone())
    }

    fn get_bytes(&self, field: usize) -> GatewayResult<Vec<u8>> {
        match self.cell(field)? {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            other => Ok(other.to_string().into_bytes()),
        }
    }

    fn get_int(&self, field: usize) -> GatewayResult<i32> {
        i32::try_from(self.number(field)?)
            .map_err(|_| fake_error(RfcRc::RfcConversionFailure, "out of range"))
    }

    fn get_byte(&self, field: usize) -> GatewayResult<u8> {
        u8::try_from(self.number(field)?)
            .map_err(|_| fake_error(RfcRc::RfcConversionFailure, "out of range"))
    }

    fn get_short(&self, field: usize) -> GatewayResult<i16> {
        i16::try_from(self.number(field)?)
            .map_err(|_| fake_error(RfcRc::RfcConversionFailure, "out of range"))
    }

    fn get_double(&self, field: usize) -> GatewayResult<f64> {
        match self.cell(field)? {
            Value::Float64(v) => Ok(*v),
            _ => self.number(field).map(|v| v as f64),
        }
    }

    fn get_string(&self, field: usize) -> GatewayResult<String> {
        Ok(self.cell(field)?.to_string())
    }
}

/// A provider that always reports the same session.
#[derive(Debug)]
pub struct FixedSession(pub &'static str);

impl SessionProvider for FixedSession {
    fn current_session_id(&self) -> String {
        self.0.to_string()
    }
}

pub fn dev_config() -> DestinationConfig {
    DestinationConfig::new()
        .with("NAME", "DEV")
        .with("ASHOST", "192.168.8.4")
        .with("SYSNR", "00")
        .with("CLIENT", "001")
        .with("USER", "bobpage")
        .with("PASSWD", "secret")
        .with("LANG", "EN")
}
