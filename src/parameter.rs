//! Values bound to an RFC call before it is invoked.

/// A value that can be bound to an RFC parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum RfcValue {
    String(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    /// Fields of a structure parameter, set by name.
    Structure(Vec<(String, RfcValue)>),
    /// Rows appended to a table parameter, each one a structure.
    Table(Vec<Vec<(String, RfcValue)>>),
}

impl RfcValue {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RfcValue::String(_) => "string",
            RfcValue::Bytes(_) => "bytes",
            RfcValue::Int(_) => "int",
            RfcValue::Float(_) => "float",
            RfcValue::Structure(_) => "structure",
            RfcValue::Table(_) => "table",
        }
    }
}

impl From<&str> for RfcValue {
    fn from(v: &str) -> Self {
        RfcValue::String(v.to_string())
    }
}

impl From<String> for RfcValue {
    fn from(v: String) -> Self {
        RfcValue::String(v)
    }
}

impl From<Vec<u8>> for RfcValue {
    fn from(v: Vec<u8>) -> Self {
        RfcValue::Bytes(v)
    }
}

impl From<&[u8]> for RfcValue {
    fn from(v: &[u8]) -> Self {
        RfcValue::Bytes(v.to_vec())
    }
}

impl From<i32> for RfcValue {
    fn from(v: i32) -> Self {
        RfcValue::Int(i64::from(v))
    }
}

impl From<i64> for RfcValue {
    fn from(v: i64) -> Self {
        RfcValue::Int(v)
    }
}

impl From<f64> for RfcValue {
    fn from(v: f64) -> Self {
        RfcValue::Float(v)
    }
}

/// A named parameter of an RFC call.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: RfcValue,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<RfcValue>) -> Parameter {
        Parameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered parameters of a command. The same name may appear more than
/// once; all occurrences are bound in order, so the last one wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Parameters {
        Parameters::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<RfcValue>) {
        self.items.push(Parameter::new(name, value));
    }

    pub fn push(&mut self, parameter: Parameter) {
        self.items.push(parameter);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    /// The value that wins at bind time for `name` (case insensitive).
    pub fn effective_value(&self, name: &str) -> Option<&RfcValue> {
        self.items
            .iter()
            .rev()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Extend<Parameter> for Parameters {
    fn extend<I: IntoIterator<Item = Parameter>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}
