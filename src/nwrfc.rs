//! `Gateway` implementation on top of the SAP NetWeaver RFC library.

use std::collections::HashMap;
use std::os::raw::c_uint;
use std::ptr::{null, null_mut};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

use widestring::{U16CString, U16String};

use crate::connparams::{DestinationConfig, RfcConnParmHelper};
use crate::error::{GatewayResult, Result, RfcErrorInfo, RfcRc};
use crate::gateway::{Destination, Gateway, RemoteFunction, RfcTable, SessionProvider};
use crate::parameter::RfcValue;
use crate::rfc::*;
use crate::types::{FieldDesc, RfcType};

fn to_sap_uc(s: &str) -> GatewayResult<Vec<u16>> {
    U16CString::from_str(s)
        .map(|s| s.into_vec_with_nul())
        .map_err(|e| RfcErrorInfo::custom(&format!("'{}' cannot be passed to RFC: {}", s, e)))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Gateway backed by `libsapnwrfc`.
///
/// Destination configurations live in memory; every `get_destination`
/// opens a fresh RFC connection with the registered logon parameters.
pub struct NwrfcGateway {
    lib: Arc<RfcLib>,
    destinations: Mutex<HashMap<String, DestinationConfig>>,
    session_provider: Mutex<Option<Arc<dyn SessionProvider>>>,
}

impl NwrfcGateway {
    pub fn new(lib: RfcLib) -> NwrfcGateway {
        NwrfcGateway {
            lib: Arc::new(lib),
            destinations: Mutex::new(HashMap::new()),
            session_provider: Mutex::new(None),
        }
    }

    /// Load the RFC library from the default search path.
    pub fn load() -> Result<NwrfcGateway> {
        Ok(NwrfcGateway::new(RfcLib::new()?))
    }

    /// The session provider currently registered, if any.
    pub fn session_provider(&self) -> Option<Arc<dyn SessionProvider>> {
        lock(&self.session_provider).clone()
    }
}

impl Gateway for NwrfcGateway {
    type Destination = NwrfcDestination;

    fn register_destination(&self, name: &str, config: &DestinationConfig) -> GatewayResult<()> {
        let previous = lock(&self.destinations).insert(name.to_string(), config.clone());
        if previous.is_some() {
            log::debug!("replaced configuration of destination {}", name);
        }
        Ok(())
    }

    fn unregister_destination(&self, name: &str) -> GatewayResult<()> {
        match lock(&self.destinations).remove(name) {
            Some(_) => Ok(()),
            None => Err(RfcErrorInfo::with_code(
                RfcRc::RfcNotFound,
                &format!("destination '{}' is not registered", name),
            )),
        }
    }

    fn get_destination(&self, name: &str) -> GatewayResult<NwrfcDestination> {
        let config = lock(&self.destinations).get(name).cloned().ok_or_else(|| {
            RfcErrorInfo::with_code(
                RfcRc::RfcNotFound,
                &format!("destination '{}' is not registered", name),
            )
        })?;
        let parms = RfcConnParmHelper::from_config(&config)?;
        let mut err_trunk = RawErrorInfo::new();
        let api = self.lib.api();
        let handle = parms.as_vec(|pv| unsafe {
            api.RfcOpenConnection(pv.as_ptr(), pv.len() as c_uint, &mut err_trunk)
        });
        if handle.is_null() {
            return Err(err_trunk.decode());
        }
        log::debug!("opened RFC connection to {}", name);
        Ok(NwrfcDestination {
            lib: Arc::clone(&self.lib),
            name: name.to_string(),
            handle,
        })
    }

    fn register_session_provider(&self, provider: &Arc<dyn SessionProvider>) -> GatewayResult<()> {
        let mut current = lock(&self.session_provider);
        match current.as_ref() {
            Some(registered) if !Arc::ptr_eq(registered, provider) => {
                Err(RfcErrorInfo::with_code(
                    RfcRc::RfcIllegalState,
                    "a different session provider is already registered",
                ))
            }
            _ => {
                *current = Some(Arc::clone(provider));
                Ok(())
            }
        }
    }

    fn unregister_session_provider(
        &self,
        provider: &Arc<dyn SessionProvider>,
    ) -> GatewayResult<()> {
        let mut current = lock(&self.session_provider);
        match current.as_ref() {
            Some(registered) if Arc::ptr_eq(registered, provider) => {
                *current = None;
                Ok(())
            }
            _ => Err(RfcErrorInfo::with_code(
                RfcRc::RfcNotFound,
                "session provider is not registered",
            )),
        }
    }

    // An RFC connection keeps its user context between calls; there is
    // nothing to start.
    fn begin_context(&self, destination: &NwrfcDestination) -> GatewayResult<()> {
        log::debug!("stateful context on {}", destination.name);
        Ok(())
    }

    fn end_context(&self, destination: &NwrfcDestination) -> GatewayResult<()> {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.lib
                .api()
                .RfcResetServerContext(destination.handle, &mut err_trunk)
        };
        check(rc, &err_trunk)
    }
}

/// An open RFC connection
pub struct NwrfcDestination {
    lib: Arc<RfcLib>,
    name: String,
    handle: *mut RfcConnectionHandle,
}

impl Destination for NwrfcDestination {
    type Function = NwrfcFunction;
    type Unit = NwrfcUnit;

    fn name(&self) -> &str {
        &self.name
    }

    fn create_function(&self, name: &str) -> GatewayResult<NwrfcFunction> {
        let name_uc = to_sap_uc(name)?;
        let api = self.lib.api();
        let mut err_trunk = RawErrorInfo::new();
        unsafe {
            let fd = api.RfcGetFunctionDesc(self.handle, name_uc.as_ptr(), &mut err_trunk);
            if fd.is_null() {
                return Err(err_trunk.decode());
            }
            let ff = api.RfcCreateFunction(fd, &mut err_trunk);
            if ff.is_null() {
                return Err(err_trunk.decode());
            }
            let handle = Rc::new(FunctionHandle {
                lib: Arc::clone(&self.lib),
                fun: ff,
            });

            let mut parm_count: c_uint = 0;
            check(
                api.RfcGetParameterCount(fd, &mut parm_count, &mut err_trunk),
                &err_trunk,
            )?;
            let mut parameters = Vec::with_capacity(parm_count as usize);
            let mut rpd = RawParameterDesc::new();
            for i in 0..parm_count {
                check(
                    api.RfcGetParameterDescByIndex(fd, i, &mut rpd, &mut err_trunk),
                    &err_trunk,
                )?;
                parameters.push(rpd.decode());
            }

            Ok(NwrfcFunction {
                name: name.to_string(),
                handle,
                parameters,
            })
        }
    }

    fn invoke(&self, function: &mut NwrfcFunction) -> GatewayResult<()> {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.lib
                .api()
                .RfcInvoke(self.handle, function.handle.fun, &mut err_trunk)
        };
        check(rc, &err_trunk)
    }

    fn begin_unit(&self) -> GatewayResult<NwrfcUnit> {
        let api = self.lib.api();
        let mut tid = [0u16; TID_LENGTH];
        let mut err_trunk = RawErrorInfo::new();
        unsafe {
            check(
                api.RfcGetTransactionID(self.handle, tid.as_mut_ptr(), &mut err_trunk),
                &err_trunk,
            )?;
            let th = api.RfcCreateTransaction(self.handle, tid.as_ptr(), null(), &mut err_trunk);
            if th.is_null() {
                return Err(err_trunk.decode());
            }
            Ok(NwrfcUnit {
                lib: Arc::clone(&self.lib),
                tid: from_sap_uc(&tid),
                handle: th,
            })
        }
    }

    fn enlist(&self, unit: &mut NwrfcUnit, function: &NwrfcFunction) -> GatewayResult<()> {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.lib
                .api()
                .RfcInvokeInTransaction(unit.handle, function.handle.fun, &mut err_trunk)
        };
        check(rc, &err_trunk)
    }

    fn commit_unit(&self, unit: &mut NwrfcUnit) -> GatewayResult<()> {
        let api = self.lib.api();
        let mut err_trunk = RawErrorInfo::new();
        unsafe {
            check(api.RfcSubmitTransaction(unit.handle, &mut err_trunk), &err_trunk)?;
            check(api.RfcConfirmTransaction(unit.handle, &mut err_trunk), &err_trunk)?;
        }
        log::debug!("committed tRFC unit {} on {}", unit.tid, self.name);
        Ok(())
    }
}

impl Drop for NwrfcDestination {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let mut err_trunk = RawErrorInfo::new();
            let rc = unsafe {
                self.lib
                    .api()
                    .RfcCloseConnection(self.handle, &mut err_trunk)
            };
            if let Err(e) = check(rc, &err_trunk) {
                log::warn!("unable to close RFC connection to {}: {}", self.name, e);
            }
        }
    }
}

/// A tRFC unit of work; destroyed on drop whether or not it was submitted.
pub struct NwrfcUnit {
    lib: Arc<RfcLib>,
    tid: String,
    handle: *mut RfcTransactionHandle,
}

impl NwrfcUnit {
    pub fn tid(&self) -> &str {
        &self.tid
    }
}

impl Drop for NwrfcUnit {
    fn drop(&mut self) {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.lib
                .api()
                .RfcDestroyTransaction(self.handle, &mut err_trunk)
        };
        if let Err(e) = check(rc, &err_trunk) {
            log::warn!("unable to destroy tRFC unit {}: {}", self.tid, e);
        }
    }
}

struct FunctionHandle {
    lib: Arc<RfcLib>,
    fun: *mut RfcDataContainerHandle,
}

impl Drop for FunctionHandle {
    fn drop(&mut self) {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe { self.lib.api().RfcDestroyFunction(self.fun, &mut err_trunk) };
        if let Err(e) = check(rc, &err_trunk) {
            log::warn!("unable to destroy RFC function: {}", e);
        }
    }
}

/// An RFC function
pub struct NwrfcFunction {
    name: String,
    handle: Rc<FunctionHandle>,
    parameters: Vec<ParameterDesc>,
}

impl NwrfcFunction {
    /// The function's signature as reported by the repository.
    pub fn parameters(&self) -> &[ParameterDesc] {
        &self.parameters
    }

    /// Get a parameter description by name. This is a case insensitive
    /// operation.
    pub fn get_parameter(&self, parameter_name: &str) -> Option<&ParameterDesc> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(parameter_name))
    }
}

fn bind(
    api: &RfcApi,
    container: *mut RfcDataContainerHandle,
    name: &str,
    value: &RfcValue,
) -> GatewayResult<()> {
    let name_uc = to_sap_uc(name)?;
    let mut err_trunk = RawErrorInfo::new();
    match value {
        RfcValue::String(s) => {
            let v = U16String::from_str(s).into_vec();
            let rc = unsafe {
                api.RfcSetChars(
                    container,
                    name_uc.as_ptr(),
                    v.as_ptr(),
                    v.len() as c_uint,
                    &mut err_trunk,
                )
            };
            check(rc, &err_trunk)
        }
        RfcValue::Bytes(b) => {
            let rc = unsafe {
                api.RfcSetXString(
                    container,
                    name_uc.as_ptr(),
                    b.as_ptr(),
                    b.len() as c_uint,
                    &mut err_trunk,
                )
            };
            check(rc, &err_trunk)
        }
        RfcValue::Int(i) => match i32::try_from(*i) {
            Ok(v) => {
                let rc = unsafe { api.RfcSetInt(container, name_uc.as_ptr(), v, &mut err_trunk) };
                check(rc, &err_trunk)
            }
            // wider than RFC_INT; numeric text fields take the digits
            Err(_) => bind(api, container, name, &RfcValue::String(i.to_string())),
        },
        RfcValue::Float(f) => {
            let rc = unsafe { api.RfcSetFloat(container, name_uc.as_ptr(), *f, &mut err_trunk) };
            check(rc, &err_trunk)
        }
        RfcValue::Structure(fields) => {
            let mut structure: *mut RfcDataContainerHandle = null_mut();
            let rc = unsafe {
                api.RfcGetStructure(container, name_uc.as_ptr(), &mut structure, &mut err_trunk)
            };
            check(rc, &err_trunk)?;
            for (k, v) in fields {
                bind(api, structure, k, v)?;
            }
            Ok(())
        }
        RfcValue::Table(rows) => {
            let mut table: *mut RfcDataContainerHandle = null_mut();
            let rc = unsafe {
                api.RfcGetTable(container, name_uc.as_ptr(), &mut table, &mut err_trunk)
            };
            check(rc, &err_trunk)?;
            for row in rows {
                let line = unsafe { api.RfcAppendNewRow(table, &mut err_trunk) };
                if line.is_null() {
                    return Err(err_trunk.decode());
                }
                for (k, v) in row {
                    bind(api, line, k, v)?;
                }
            }
            Ok(())
        }
    }
}

impl RemoteFunction for NwrfcFunction {
    type Table = NwrfcTable;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_value(&mut self, name: &str, value: &RfcValue) -> GatewayResult<()> {
        bind(self.handle.lib.api(), self.handle.fun, name, value)
    }

    fn metadata(&self) -> String {
        let mut text = format!("FUNCTION {}\n", self.name);
        for p in &self.parameters {
            text.push_str(&p.describe());
            text.push('\n');
        }
        text
    }

    fn table(&self, name: &str) -> GatewayResult<NwrfcTable> {
        let name_uc = to_sap_uc(name)?;
        let api = self.handle.lib.api();
        let mut err_trunk = RawErrorInfo::new();
        let mut table: *mut RfcDataContainerHandle = null_mut();
        unsafe {
            check(
                api.RfcGetTable(self.handle.fun, name_uc.as_ptr(), &mut table, &mut err_trunk),
                &err_trunk,
            )?;
            let type_handle = api.RfcDescribeType(table, &mut err_trunk);
            if type_handle.is_null() {
                return Err(err_trunk.decode());
            }
            let mut count: c_uint = 0;
            check(
                api.RfcGetFieldCount(type_handle, &mut count, &mut err_trunk),
                &err_trunk,
            )?;
            let mut fields = Vec::with_capacity(count as usize);
            let mut rfc_field_desc = RawFieldDesc::new();
            for i in 0..count {
                check(
                    api.RfcGetFieldDescByIndex(type_handle, i, &mut rfc_field_desc, &mut err_trunk),
                    &err_trunk,
                )?;
                fields.push(rfc_field_desc.decode());
            }
            Ok(NwrfcTable {
                function: Rc::clone(&self.handle),
                table,
                fields,
            })
        }
    }
}

/// A table parameter of an `NwrfcFunction`. Keeps the function alive.
pub struct NwrfcTable {
    function: Rc<FunctionHandle>,
    table: *mut RfcDataContainerHandle,
    fields: Vec<FieldDesc>,
}

impl NwrfcTable {
    fn api(&self) -> &RfcApi {
        self.function.lib.api()
    }

    fn field(&self, field: usize) -> GatewayResult<&FieldDesc> {
        self.fields
            .get(field)
            .ok_or_else(|| RfcErrorInfo::with_code(RfcRc::RfcInvalidParameter, "illegal index"))
    }

    fn string_length(&self, field: usize) -> GatewayResult<c_uint> {
        let mut len: c_uint = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetStringLengthByIndex(self.table, field as c_uint, &mut len, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(len)
    }
}

impl RfcTable for NwrfcTable {
    fn row_count(&self) -> GatewayResult<usize> {
        let mut row_count: c_uint = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetRowCount(self.table, &mut row_count, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(row_count as usize)
    }

    fn set_current_index(&mut self, index: usize) -> GatewayResult<()> {
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcMoveTo(self.table, index as c_uint, &mut err_trunk)
        };
        check(rc, &err_trunk)
    }

    fn fields(&self) -> GatewayResult<Vec<FieldDesc>> {
        Ok(self.fields.clone())
    }

    fn get_bytes(&self, field: usize) -> GatewayResult<Vec<u8>> {
        let desc = self.field(field)?;
        let mut err_trunk = RawErrorInfo::new();
        if desc.field_type == RfcType::XString {
            let reserve_len = self.string_length(field)?;
            let mut out_buf = vec![0u8; reserve_len as usize];
            let mut out_len: c_uint = 0;
            let rc = unsafe {
                self.api().RfcGetXStringByIndex(
                    self.table,
                    field as c_uint,
                    out_buf.as_mut_ptr(),
                    reserve_len,
                    &mut out_len,
                    &mut err_trunk,
                )
            };
            check(rc, &err_trunk)?;
            out_buf.truncate(out_len as usize);
            Ok(out_buf)
        } else {
            let mut out_buf = vec![0u8; desc.length as usize];
            let rc = unsafe {
                self.api().RfcGetBytesByIndex(
                    self.table,
                    field as c_uint,
                    out_buf.as_mut_ptr(),
                    desc.length,
                    &mut err_trunk,
                )
            };
            check(rc, &err_trunk)?;
            Ok(out_buf)
        }
    }

    fn get_int(&self, field: usize) -> GatewayResult<i32> {
        let mut value: i32 = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetIntByIndex(self.table, field as c_uint, &mut value, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(value)
    }

    fn get_byte(&self, field: usize) -> GatewayResult<u8> {
        let mut value: u8 = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetInt1ByIndex(self.table, field as c_uint, &mut value, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(value)
    }

    fn get_short(&self, field: usize) -> GatewayResult<i16> {
        let mut value: i16 = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetInt2ByIndex(self.table, field as c_uint, &mut value, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(value)
    }

    fn get_double(&self, field: usize) -> GatewayResult<f64> {
        let mut value: f64 = 0.0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api()
                .RfcGetFloatByIndex(self.table, field as c_uint, &mut value, &mut err_trunk)
        };
        check(rc, &err_trunk)?;
        Ok(value)
    }

    fn get_string(&self, field: usize) -> GatewayResult<String> {
        // This is an ungenau wissenschaft; the length excludes the
        // terminating nul, which the library still writes.
        let reserve_len = self.string_length(field)? + 1;
        let mut buf = vec![0u16; reserve_len as usize];
        let mut len: c_uint = 0;
        let mut err_trunk = RawErrorInfo::new();
        let rc = unsafe {
            self.api().RfcGetStringByIndex(
                self.table,
                field as c_uint,
                buf.as_mut_ptr(),
                reserve_len,
                &mut len,
                &mut err_trunk,
            )
        };
        check(rc, &err_trunk)?;
        buf.truncate(len as usize);
        Ok(String::from_utf16_lossy(&buf))
    }
}
