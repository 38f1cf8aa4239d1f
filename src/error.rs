use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Various kinds of RFC errors
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcRc {
    RfcOk,                        // /< Everything O.K. Used by every function
    RfcCommunicationFailure,      // /< Error in Network & Communication layer
    RfcLogonFailure, // /< Unable to logon to SAP system. Invalid password, user locked, etc.
    RfcAbapRuntimeFailure, // /< SAP system runtime error (SYSTEM_FAILURE): Shortdump on the backend side
    RfcAbapMessage,        // /< The called function module raised an E-, A- or X-Message
    RfcAbapException, // /< The called function module raised an Exception (RAISE or MESSAGE ... RAISING)
    RfcClosed,        // /< Connection closed by the other side
    RfcCanceled,      // /< No longer used
    RfcTimeout,       // /< Time out
    RfcMemoryInsufficient, // /< Memory insufficient
    RfcVersionMismatch, // /< Version mismatch
    RfcInvalidProtocol, // /< The received data has an unsupported format
    RfcSerializationFailure, // /< A problem while serializing or deserializing RFM parameters
    RfcInvalidHandle, // /< An invalid handle was passed to an API call
    RfcRetry, // /< RfcListenAndDispatch did not receive an Rfc request during the timeout period
    RfcExternalFailure, // /< Error in external custom code. Results in SYSTEM_FAILURE
    RfcExecuted, // /< Inbound tRfc Call already executed
    RfcNotFound, // /< Function or structure definition not found (Metadata API)
    RfcNotSupported, // /< The operation is not supported on that handle
    RfcIllegalState, // /< The operation is not supported on that handle at the current point of time
    RfcInvalidParameter, // /< An invalid parameter was passed to an API call, (e.g. invalid name, type or length)
    RfcCodepageConversionFailure, // /< Codepage conversion error
    RfcConversionFailure, // /< Error while converting a parameter to the correct data type
    RfcBufferTooSmall, // /< The given buffer was to small to hold the entire parameter. Data has been truncated.
    RfcTableMoveBof,   // /< Trying to move the current position before the first row of the table
    RfcTableMoveEof,   // /< Trying to move the current position after the last row of the table
    RfcStartSapguiFailure, // /< Failed to start and attach SAPGUI to the Rfc connection
    RfcAbapClassException, // /< The called function module raised a class based exception
    RfcUnknownError,   // /< "Something" went wrong, but I don't know what...
    RfcAuthorizationFailure, // /< Authorization check error

    RfcConnector = 65536, // raised by this crate, not by the RFC library
}

const RFC_RC_TABLE: [RfcRc; 30] = [
    RfcRc::RfcOk,
    RfcRc::RfcCommunicationFailure,
    RfcRc::RfcLogonFailure,
    RfcRc::RfcAbapRuntimeFailure,
    RfcRc::RfcAbapMessage,
    RfcRc::RfcAbapException,
    RfcRc::RfcClosed,
    RfcRc::RfcCanceled,
    RfcRc::RfcTimeout,
    RfcRc::RfcMemoryInsufficient,
    RfcRc::RfcVersionMismatch,
    RfcRc::RfcInvalidProtocol,
    RfcRc::RfcSerializationFailure,
    RfcRc::RfcInvalidHandle,
    RfcRc::RfcRetry,
    RfcRc::RfcExternalFailure,
    RfcRc::RfcExecuted,
    RfcRc::RfcNotFound,
    RfcRc::RfcNotSupported,
    RfcRc::RfcIllegalState,
    RfcRc::RfcInvalidParameter,
    RfcRc::RfcCodepageConversionFailure,
    RfcRc::RfcConversionFailure,
    RfcRc::RfcBufferTooSmall,
    RfcRc::RfcTableMoveBof,
    RfcRc::RfcTableMoveEof,
    RfcRc::RfcStartSapguiFailure,
    RfcRc::RfcAbapClassException,
    RfcRc::RfcUnknownError,
    RfcRc::RfcAuthorizationFailure,
];

impl RfcRc {
    /// Return true if the result was RfcOk (no error)
    pub fn is_ok(&self) -> bool {
        self == &RfcRc::RfcOk
    }

    /// Decode a raw return code as handed out by the RFC library.
    /// Codes this crate does not know become `RfcUnknownError`.
    pub fn from_raw(raw: u32) -> RfcRc {
        if raw == RfcRc::RfcConnector as u32 {
            return RfcRc::RfcConnector;
        }
        RFC_RC_TABLE
            .get(raw as usize)
            .copied()
            .unwrap_or(RfcRc::RfcUnknownError)
    }
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcErrorGroup {
    Ok,
    AbapApplicationFailure,
    AbapRuntimeFailure,
    LogonFailure,
    CommunicationFailure,
    ExternalRuntimeFailure,
    ExternalApplicationFailure,
    ExternalAuthorizationFailure,

    Connector = 65536,
}

impl RfcErrorGroup {
    pub fn from_raw(raw: u32) -> RfcErrorGroup {
        match raw {
            0 => RfcErrorGroup::Ok,
            1 => RfcErrorGroup::AbapApplicationFailure,
            2 => RfcErrorGroup::AbapRuntimeFailure,
            3 => RfcErrorGroup::LogonFailure,
            4 => RfcErrorGroup::CommunicationFailure,
            5 => RfcErrorGroup::ExternalRuntimeFailure,
            6 => RfcErrorGroup::ExternalApplicationFailure,
            7 => RfcErrorGroup::ExternalAuthorizationFailure,
            _ => RfcErrorGroup::Connector,
        }
    }
}

/// Error reported by the gateway. For the NetWeaver RFC library this is a
/// decoded `RFC_ERROR_INFO`; other gateways fill in what they know.
#[derive(Clone, PartialEq, Eq)]
pub struct RfcErrorInfo {
    pub code: RfcRc,
    pub group: RfcErrorGroup,
    pub key: String,
    pub message: String,
    pub abap_msg_class: String,
    pub abap_msg_type: String,
    pub abap_msg_number: String,
    pub abap_msg_v1: String,
    pub abap_msg_v2: String,
    pub abap_msg_v3: String,
    pub abap_msg_v4: String,
}

impl RfcErrorInfo {
    /// An error that did not originate in the RFC library.
    pub fn custom(msg: &str) -> RfcErrorInfo {
        RfcErrorInfo::with_code(RfcRc::RfcConnector, msg)
    }

    pub fn with_code(code: RfcRc, msg: &str) -> RfcErrorInfo {
        let group = if code == RfcRc::RfcConnector {
            RfcErrorGroup::Connector
        } else {
            RfcErrorGroup::ExternalRuntimeFailure
        };
        RfcErrorInfo {
            code,
            group,
            key: String::new(),
            message: msg.to_string(),
            abap_msg_class: String::new(),
            abap_msg_type: String::new(),
            abap_msg_number: String::new(),
            abap_msg_v1: String::new(),
            abap_msg_v2: String::new(),
            abap_msg_v3: String::new(),
            abap_msg_v4: String::new(),
        }
    }

    /// True if the backend raised an ABAP message (class, type and number set).
    pub fn has_abap_message(&self) -> bool {
        !self.abap_msg_class.is_empty() && !self.abap_msg_number.is_empty()
    }
}

impl fmt::Debug for RfcErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RfcErrorInfo")
            .field("code", &self.code)
            .field("group", &self.group)
            .field("key", &self.key)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for RfcErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.key, self.message)
        }
    }
}

impl std::error::Error for RfcErrorInfo {}

pub type GatewayResult<T> = std::result::Result<T, RfcErrorInfo>;

/// Every failure surfaced by the connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Command or connection is not usable as configured
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("function '{command}' could not be resolved on the backend")]
    CommandResolution {
        command: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("parameter '{parameter}' was rejected by function '{command}'")]
    ParameterBinding {
        command: String,
        parameter: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("function '{command}' could not be enlisted in the transaction: {message}")]
    TransactionEnlist {
        command: String,
        message: String,
        #[source]
        source: Option<RfcErrorInfo>,
    },

    #[error("function '{command}' failed on the backend")]
    Invocation {
        command: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("metadata of table '{table}' could not be read")]
    TableMetadata {
        table: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("value of column '{column}' in table '{table}' (row {row}) could not be read")]
    RowExtraction {
        table: String,
        column: String,
        row: usize,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("table '{table}' could not be positioned on row {row}")]
    RowPositioning {
        table: String,
        row: usize,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("destination '{destination}' could not be opened")]
    ConnectionOpen {
        destination: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("configuration of destination '{destination}' could not be registered")]
    ConnectionRegistration {
        destination: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("transaction on destination '{destination}' could not be started")]
    TransactionBegin {
        destination: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("transaction commit failed: {message}")]
    TransactionCommit {
        message: String,
        #[source]
        source: Option<RfcErrorInfo>,
    },

    #[error("transaction rollback failed: {message}")]
    TransactionRollback {
        message: String,
        #[source]
        source: Option<RfcErrorInfo>,
    },

    #[error("session error: {message}")]
    Session {
        message: String,
        #[source]
        source: RfcErrorInfo,
    },

    #[error("unable to load the RFC library '{library}'")]
    LibraryLoad {
        library: String,
        #[source]
        source: dlopen::Error,
    },

    #[error("unable to read destination configuration file '{}'", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed destination configuration")]
    ConfigParse {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
