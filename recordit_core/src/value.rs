/// A backend-agnostic representation of a bound parameter or column value.
///
/// `List` only ever appears as a bound parameter: it stands for the whole
/// collection behind an `IN ?` fragment and is expanded by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "integer",
            Value::F64(_) => "real",
            Value::String(_) => "text",
            Value::Bytes(_) => "blob",
            Value::List(_) => "list",
        }
    }
}

/// Failure to read a field or convert a column value into a Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: i64 },
    #[error("missing column `{0}` in row")]
    MissingColumn(String),
    #[error("column `{column}`: {source}")]
    Column {
        column: String,
        #[source]
        source: Box<MappingError>,
    },
    #[error("field `{field}` of `{entity}` could not be read")]
    UnreadableField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("`{0}` has no persistable fields")]
    NothingToSave(&'static str),
}

/// Conversion from a column [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, MappingError>;
}

fn mismatch(expected: &'static str, found: &Value) -> MappingError {
    MappingError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

macro_rules! integer_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::I64(v as i64)
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, MappingError> {
                    match value {
                        Value::I64(i) => <$t>::try_from(i).map_err(|_| MappingError::OutOfRange {
                            target: stringify!($t),
                            value: i,
                        }),
                        Value::Bool(b) => Ok(b as $t),
                        other => Err(mismatch(stringify!($t), &other)),
                    }
                }
            }
        )*
    };
}

integer_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F64(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::Bool(b) => Ok(b),
            // SQLite and MySQL store booleans as 0/1
            Value::I64(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::F64(f) => Ok(f),
            Value::I64(i) => Ok(i as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(MappingError::TypeMismatch {
                        expected: "char",
                        found: "text",
                    }),
                }
            }
            other => Err(mismatch("char", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
