use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of literal types a data property can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Boolean,
    Integer,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    String,
    /// Free-form date text normalized to an ISO-8601 UTC timestamp.
    Date,
}

impl ScalarKind {
    /// The `xsd:` datatype suffix used in rendered literals.
    pub const fn xsd_type(self) -> &'static str {
        match self {
            Self::Boolean => "xsd:boolean",
            Self::Integer => "xsd:integer",
            Self::Float => "xsd:float",
            Self::Double => "xsd:double",
            Self::String => "xsd:string",
            Self::Date => "xsd:date",
        }
    }

    /// The name used in mapping documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "string" => Ok(Self::String),
            "date" => Ok(Self::Date),
            other => Err(other.to_string()),
        }
    }
}
