//! Raw surface of the SAP NetWeaver RFC library, loaded at runtime.

use std::os::raw::c_uint;
use std::ptr::null_mut;

use dlopen::wrapper::{Container, WrapperApi};

use crate::error::{ConnectorError, RfcErrorGroup, RfcErrorInfo, RfcRc};
use crate::types::{FieldDesc, RfcDirection, RfcType};

pub enum RfcFunctionDescHandle {}
pub enum RfcConnectionHandle {}
pub enum RfcDataContainerHandle {}
pub enum RfcTypeDescHandle {}
pub enum RfcTransactionHandle {}

/// Parameters specifying the RFC connection details
#[repr(C)]
pub struct RfcConnectionParameter {
    pub name: *const u16,
    pub value: *const u16,
}

/// `RFC_ERROR_INFO` as filled in by the library.
#[repr(C)]
pub struct RawErrorInfo {
    pub code: c_uint,
    pub group: c_uint,
    pub key: [u16; 128],
    pub message: [u16; 512],
    pub abap_msg_class: [u16; 21],
    pub abap_msg_type: [u16; 2],
    pub abap_msg_number: [u16; 4],
    pub abap_msg_v1: [u16; 51],
    pub abap_msg_v2: [u16; 51],
    pub abap_msg_v3: [u16; 51],
    pub abap_msg_v4: [u16; 51],
}

/// Decode a nul terminated UTF-16 buffer.
pub(crate) fn from_sap_uc(buf: &[u16]) -> String {
    let len = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

impl RawErrorInfo {
    pub fn new() -> RawErrorInfo {
        RawErrorInfo {
            code: 0,
            group: 0,
            key: [0; 128],
            message: [0; 512],
            abap_msg_class: [0; 21],
            abap_msg_type: [0; 2],
            abap_msg_number: [0; 4],
            abap_msg_v1: [0; 51],
            abap_msg_v2: [0; 51],
            abap_msg_v3: [0; 51],
            abap_msg_v4: [0; 51],
        }
    }

    pub fn decode(&self) -> RfcErrorInfo {
        RfcErrorInfo {
            code: RfcRc::from_raw(self.code),
            group: RfcErrorGroup::from_raw(self.group),
            key: from_sap_uc(&self.key),
            message: from_sap_uc(&self.message),
            abap_msg_class: from_sap_uc(&self.abap_msg_class),
            abap_msg_type: from_sap_uc(&self.abap_msg_type),
            abap_msg_number: from_sap_uc(&self.abap_msg_number),
            abap_msg_v1: from_sap_uc(&self.abap_msg_v1),
            abap_msg_v2: from_sap_uc(&self.abap_msg_v2),
            abap_msg_v3: from_sap_uc(&self.abap_msg_v3),
            abap_msg_v4: from_sap_uc(&self.abap_msg_v4),
        }
    }
}

impl Default for RawErrorInfo {
    fn default() -> Self {
        RawErrorInfo::new()
    }
}

/// Internal RFC lib structure describing one field of a structure or table.
#[repr(C)]
pub struct RawFieldDesc {
    pub name: [u16; 31],
    pub field_type: c_uint,
    pub nuc_length: c_uint,
    pub nuc_offset: c_uint,
    pub uc_length: c_uint,
    pub uc_offset: c_uint,
    pub decimals: c_uint,
    pub type_desc_handle: *mut RfcTypeDescHandle,
    pub extended_description: *mut u8,
}

impl RawFieldDesc {
    /// Create an empty RFC field desciption
    pub fn new() -> RawFieldDesc {
        RawFieldDesc {
            name: [0; 31],
            field_type: RfcType::String as c_uint,
            nuc_length: 0,
            nuc_offset: 0,
            uc_length: 0,
            uc_offset: 0,
            decimals: 0,
            type_desc_handle: null_mut(),
            extended_description: null_mut(),
        }
    }

    pub fn decode(&self) -> FieldDesc {
        let name = from_sap_uc(&self.name);
        let field_type = RfcType::from_raw(self.field_type).unwrap_or_else(|| {
            log::debug!(
                "field {} has unknown RFC type {}, reading it as text",
                name,
                self.field_type
            );
            RfcType::String
        });
        FieldDesc {
            name,
            field_type,
            length: self.nuc_length,
        }
    }
}

/// An RFC parameter description, RFC library internal structure
#[repr(C)]
pub struct RawParameterDesc {
    pub name: [u16; 31],
    pub field_type: c_uint,
    pub direction: c_uint,
    pub nuc_length: c_uint,
    pub uc_length: c_uint,
    pub decimals: c_uint,
    pub type_desc_handle: *mut RfcTypeDescHandle,
    pub default_value: [u16; 31],
    pub parameter_text: [u16; 80],
    pub optional: u8,
    pub extended_description: *mut u8,
}

/// Decoded parameter of a function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDesc {
    pub name: String,
    pub field_type: Option<RfcType>,
    pub direction: Option<RfcDirection>,
    pub length: u32,
    pub default_value: Option<String>,
    pub optional: bool,
}

impl ParameterDesc {
    /// One metadata line, `TABLES DATA: TABLE(512)`. Parameters with an
    /// unknown direction are listed under `PARAMETER`.
    pub fn describe(&self) -> String {
        let keyword = self.direction.map_or("PARAMETER", |d| d.keyword());
        let type_tag = self.field_type.map_or("UNKNOWN", |t| t.tag());
        let mut line = format!("{} {}: {}({})", keyword, self.name, type_tag, self.length);
        if self.optional {
            line.push_str(" OPTIONAL");
        }
        if let Some(default) = &self.default_value {
            line.push_str(" DEFAULT ");
            line.push_str(default);
        }
        line
    }
}

impl RawParameterDesc {
    pub fn new() -> RawParameterDesc {
        RawParameterDesc {
            name: [0; 31],
            field_type: RfcType::String as c_uint,
            direction: RfcDirection::RfcExport as c_uint,
            nuc_length: 0,
            uc_length: 0,
            decimals: 0,
            type_desc_handle: null_mut(),
            default_value: [0; 31],
            parameter_text: [0; 80],
            optional: 0,
            extended_description: null_mut(),
        }
    }

    pub fn decode(&self) -> ParameterDesc {
        let default_value = if self.default_value[0] == 0 {
            None
        } else {
            Some(from_sap_uc(&self.default_value))
        };
        ParameterDesc {
            name: from_sap_uc(&self.name),
            field_type: RfcType::from_raw(self.field_type),
            direction: RfcDirection::from_raw(self.direction),
            length: self.nuc_length,
            default_value,
            optional: self.optional != 0,
        }
    }
}

/// The RFC library functions this crate calls.
#[allow(non_snake_case)]
#[derive(WrapperApi)]
pub struct RfcApi {
    RfcOpenConnection: unsafe extern "C" fn(
        parameters: *const RfcConnectionParameter,
        param_count: c_uint,
        error: *mut RawErrorInfo,
    ) -> *mut RfcConnectionHandle,
    RfcCloseConnection:
        unsafe extern "C" fn(handle: *mut RfcConnectionHandle, error: *mut RawErrorInfo) -> c_uint,
    RfcResetServerContext:
        unsafe extern "C" fn(handle: *mut RfcConnectionHandle, error: *mut RawErrorInfo) -> c_uint,
    RfcGetFunctionDesc: unsafe extern "C" fn(
        handle: *mut RfcConnectionHandle,
        func_name: *const u16,
        error: *mut RawErrorInfo,
    ) -> *mut RfcFunctionDescHandle,
    RfcCreateFunction: unsafe extern "C" fn(
        handle: *mut RfcFunctionDescHandle,
        error: *mut RawErrorInfo,
    ) -> *mut RfcDataContainerHandle,
    RfcDestroyFunction: unsafe extern "C" fn(
        handle: *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetParameterCount: unsafe extern "C" fn(
        fd: *mut RfcFunctionDescHandle,
        count: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetParameterDescByIndex: unsafe extern "C" fn(
        fd: *mut RfcFunctionDescHandle,
        index: c_uint,
        param_desc: *mut RawParameterDesc,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcInvoke: unsafe extern "C" fn(
        handle: *mut RfcConnectionHandle,
        fun: *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcSetChars: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        value: *const u16,
        length: c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcSetInt: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        value: i32,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcSetFloat: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        value: f64,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcSetXString: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        value: *const u8,
        length: c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetStructure: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        structure: *mut *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetTable: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        name: *const u16,
        table: *mut *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcAppendNewRow: unsafe extern "C" fn(
        table: *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> *mut RfcDataContainerHandle,
    RfcGetRowCount: unsafe extern "C" fn(
        table: *mut RfcDataContainerHandle,
        row_count: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcMoveTo: unsafe extern "C" fn(
        table: *mut RfcDataContainerHandle,
        index: c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcDescribeType: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> *mut RfcTypeDescHandle,
    RfcGetFieldCount: unsafe extern "C" fn(
        type_desc: *mut RfcTypeDescHandle,
        count: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetFieldDescByIndex: unsafe extern "C" fn(
        type_desc: *mut RfcTypeDescHandle,
        index: c_uint,
        field_desc: *mut RawFieldDesc,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetStringLengthByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        length: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetStringByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        buffer: *mut u16,
        buffer_length: c_uint,
        string_length: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetBytesByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        buffer: *mut u8,
        buffer_length: c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetXStringByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        buffer: *mut u8,
        buffer_length: c_uint,
        xstring_length: *mut c_uint,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetIntByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        value: *mut i32,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetInt1ByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        value: *mut u8,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetInt2ByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        value: *mut i16,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetFloatByIndex: unsafe extern "C" fn(
        container: *mut RfcDataContainerHandle,
        index: c_uint,
        value: *mut f64,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcGetTransactionID: unsafe extern "C" fn(
        handle: *mut RfcConnectionHandle,
        tid: *mut u16,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcCreateTransaction: unsafe extern "C" fn(
        handle: *mut RfcConnectionHandle,
        tid: *const u16,
        queue_name: *const u16,
        error: *mut RawErrorInfo,
    ) -> *mut RfcTransactionHandle,
    RfcInvokeInTransaction: unsafe extern "C" fn(
        transaction: *mut RfcTransactionHandle,
        fun: *mut RfcDataContainerHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcSubmitTransaction: unsafe extern "C" fn(
        transaction: *mut RfcTransactionHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcConfirmTransaction: unsafe extern "C" fn(
        transaction: *mut RfcTransactionHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
    RfcDestroyTransaction: unsafe extern "C" fn(
        transaction: *mut RfcTransactionHandle,
        error: *mut RawErrorInfo,
    ) -> c_uint,
}

/// Length of an `RFC_TID` including the terminating nul.
pub const TID_LENGTH: usize = 25;

#[cfg(all(target_family = "unix", not(target_vendor = "apple")))]
const LIBRARY_NAME: &str = "libsapnwrfc.so";

#[cfg(all(target_family = "unix", target_vendor = "apple"))]
const LIBRARY_NAME: &str = "libsapnwrfc.dylib";

#[cfg(target_family = "windows")]
const LIBRARY_NAME: &str = "sapnwrfc.dll";

/// The loaded SAP NetWeaver RFC library.
pub struct RfcLib {
    rfc_api: Container<RfcApi>,
}

impl RfcLib {
    /// Load the RFC library from the default library search path.
    pub fn new() -> Result<RfcLib, ConnectorError> {
        RfcLib::load(LIBRARY_NAME)
    }

    /// Load the RFC library from `path`.
    pub fn load(path: &str) -> Result<RfcLib, ConnectorError> {
        let rfc_api: Container<RfcApi> =
            unsafe { Container::load(path) }.map_err(|source| ConnectorError::LibraryLoad {
                library: path.to_string(),
                source,
            })?;
        log::debug!("loaded RFC library {}", path);
        Ok(RfcLib { rfc_api })
    }

    pub fn api(&self) -> &RfcApi {
        &self.rfc_api
    }
}

/// Turn an RFC return code into a `Result`, decoding the error info.
pub(crate) fn check(rc: c_uint, err: &RawErrorInfo) -> Result<(), RfcErrorInfo> {
    if RfcRc::from_raw(rc).is_ok() {
        Ok(())
    } else {
        Err(err.decode())
    }
}
