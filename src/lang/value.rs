use serde::{Deserialize, Serialize};

/// The storage type of a symbol.
///
/// `Invalid` marks declarations the language accepts syntactically but cannot
/// store (array types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Double,
    String,
    Invalid,
}

impl DataType {
    /// Zero value a freshly declared variable of this type starts with.
    pub fn default_value(self) -> Value {
        match self {
            DataType::Integer | DataType::Invalid => Value::Int(0),
            DataType::Double => Value::Real(0.0),
            DataType::String => Value::Text(String::new()),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Integer => write!(f, "Integer"),
            DataType::Double => write!(f, "Double"),
            DataType::String => write!(f, "String"),
            DataType::Invalid => write!(f, "Invalid"),
        }
    }
}

/// Value held by a symbol-table slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer; the only type arithmetic and branch quads operate on.
    Int(i64),

    /// Floating-point number. Stored, moved and printed only.
    Real(f64),

    /// String literal text.
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Integer,
            Value::Real(_) => DataType::Double,
            Value::Text(_) => DataType::String,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}
