//! Backend type tags and the generic value types results are converted to.

use std::fmt;
use std::str::FromStr;

/// RFC data type
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcType {
    Char = 0,
    Date = 1,
    Bcd = 2,
    Time = 3,
    Byte = 4,
    Table = 5,
    Num = 6,
    Float = 7,
    Int = 8,
    Int2 = 9,
    Int1 = 10,
    Null = 14,
    AbapObject = 16,
    Structure = 17,
    Decf16 = 23,
    Decf34 = 24,
    XmlData = 28,
    String = 29,
    XString = 30,
    Int8 = 31,
    UtcLong = 32,
    UtcSecond = 33,
    UtcMinute = 34,
    DtDay = 35,
    DtMonth = 36,
    TSecond = 37,
    TMinute = 38,
    CDay = 39,
    Box = 40,
    GenericBox = 41,
}

const RFC_TYPES: [RfcType; 30] = [
    RfcType::Char,
    RfcType::Date,
    RfcType::Bcd,
    RfcType::Time,
    RfcType::Byte,
    RfcType::Table,
    RfcType::Num,
    RfcType::Float,
    RfcType::Int,
    RfcType::Int2,
    RfcType::Int1,
    RfcType::Null,
    RfcType::AbapObject,
    RfcType::Structure,
    RfcType::Decf16,
    RfcType::Decf34,
    RfcType::XmlData,
    RfcType::String,
    RfcType::XString,
    RfcType::Int8,
    RfcType::UtcLong,
    RfcType::UtcSecond,
    RfcType::UtcMinute,
    RfcType::DtDay,
    RfcType::DtMonth,
    RfcType::TSecond,
    RfcType::TMinute,
    RfcType::CDay,
    RfcType::Box,
    RfcType::GenericBox,
];

impl RfcType {
    /// Decode the numeric `RFCTYPE` used by the RFC library.
    pub fn from_raw(raw: u32) -> Option<RfcType> {
        RFC_TYPES.iter().copied().find(|t| *t as u32 == raw)
    }

    /// The backend's name for this type, e.g. `NUM` or `INT2`.
    pub fn tag(&self) -> &'static str {
        match self {
            RfcType::Char => "CHAR",
            RfcType::Date => "DATE",
            RfcType::Bcd => "BCD",
            RfcType::Time => "TIME",
            RfcType::Byte => "BYTE",
            RfcType::Table => "TABLE",
            RfcType::Num => "NUM",
            RfcType::Float => "FLOAT",
            RfcType::Int => "INT",
            RfcType::Int2 => "INT2",
            RfcType::Int1 => "INT1",
            RfcType::Null => "NULL",
            RfcType::AbapObject => "ABAPOBJECT",
            RfcType::Structure => "STRUCTURE",
            RfcType::Decf16 => "DECF16",
            RfcType::Decf34 => "DECF34",
            RfcType::XmlData => "XMLDATA",
            RfcType::String => "STRING",
            RfcType::XString => "XSTRING",
            RfcType::Int8 => "INT8",
            RfcType::UtcLong => "UTCLONG",
            RfcType::UtcSecond => "UTCSECOND",
            RfcType::UtcMinute => "UTCMINUTE",
            RfcType::DtDay => "DTDAY",
            RfcType::DtMonth => "DTMONTH",
            RfcType::TSecond => "TSECOND",
            RfcType::TMinute => "TMINUTE",
            RfcType::CDay => "CDAY",
            RfcType::Box => "BOX",
            RfcType::GenericBox => "GENERIC_BOX",
        }
    }
}

impl fmt::Display for RfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RfcType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RFC_TYPES
            .iter()
            .copied()
            .find(|t| t.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown RFC type tag '{}'", s))
    }
}

/// RFC enabled functions can take different kinds of parameters.
/// This enum specified the kind.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RfcDirection {
    /// A parameter goes from the caller to the callee
    RfcImport = 1,
    /// A parameter goes from the callee to the caller
    RfcExport = 2,
    /// A parameter goes in both directions
    RfcChanging = 1 | 2,
    /// Tables are a special kind of parameter. They go in
    /// both directions.
    RfcTables = 1 | 2 | 4,
}

impl RfcDirection {
    pub fn from_raw(raw: u32) -> Option<RfcDirection> {
        match raw {
            1 => Some(RfcDirection::RfcImport),
            2 => Some(RfcDirection::RfcExport),
            3 => Some(RfcDirection::RfcChanging),
            7 => Some(RfcDirection::RfcTables),
            _ => None,
        }
    }

    /// Keyword used for this direction in function metadata text.
    pub fn keyword(&self) -> &'static str {
        match self {
            RfcDirection::RfcImport => "IMPORTING",
            RfcDirection::RfcExport => "EXPORTING",
            RfcDirection::RfcChanging => "CHANGING",
            RfcDirection::RfcTables => "TABLES",
        }
    }
}

/// Schema of one field of a structure or table line, as reported by the
/// backend. `length` is the declared (non-Unicode) length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub field_type: RfcType,
    pub length: u32,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, field_type: RfcType, length: u32) -> FieldDesc {
        FieldDesc {
            name: name.into(),
            field_type,
            length,
        }
    }

    /// The generic type values of this field are converted to.
    pub fn value_type(&self) -> ValueType {
        map_field_type(self.field_type, self.length)
    }
}

/// Generic column type of a materialized result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bytes,
    Int32,
    UInt8,
    Int16,
    Int64,
    Float64,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bytes => "bytes",
            ValueType::Int32 => "i32",
            ValueType::UInt8 => "u8",
            ValueType::Int16 => "i16",
            ValueType::Int64 => "i64",
            ValueType::Float64 => "f64",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

/// One cell of a materialized result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(Vec<u8>),
    Int32(i32),
    UInt8(u8),
    Int16(i16),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bytes(_) => ValueType::Bytes,
            Value::Int32(_) => ValueType::Int32,
            Value::UInt8(_) => ValueType::UInt8,
            Value::Int16(_) => ValueType::Int16,
            Value::Int64(_) => ValueType::Int64,
            Value::Float64(_) => ValueType::Float64,
            Value::String(_) => ValueType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Any integer cell widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
        }
    }
}

/// Map a backend field type and its declared length to a generic type.
///
/// `NUM` fields are digit strings on the backend; they become i32 up to nine
/// digits, i64 up to nineteen and stay text beyond that. Every type without
/// a rule of its own is read as text.
pub fn map_field_type(field_type: RfcType, length: u32) -> ValueType {
    match field_type {
        RfcType::Byte => ValueType::Bytes,
        RfcType::Int => ValueType::Int32,
        RfcType::Int1 => ValueType::UInt8,
        RfcType::Int2 => ValueType::Int16,
        RfcType::Float => ValueType::Float64,
        RfcType::Num if length <= 9 => ValueType::Int32,
        RfcType::Num if length <= 19 => ValueType::Int64,
        _ => ValueType::String,
    }
}
