//! Value cells and type descriptors for parameters.
//!
//! `ParamType` is the closed set of parameter kinds, fixed at construction.
//! `ParamValue` is the runtime value a parameter holds. `TypeInfo` describes
//! the type of a generic parameter structurally, so that foreign-engine types
//! like `CImgList<float>` compare by content instead of by raw string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The closed enumeration of parameter kinds.
///
/// The tag never changes after a parameter is constructed. `Generic`
/// parameters carry a separately mutable [`TypeInfo`] used for compatibility
/// checks at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    UInt,
    Float,
    Str,
    FileName,
    Color,
    Enum,
    Generic,
    Command,
    TextInfo,
    Group,
}

impl ParamType {
    /// Whether this kind of parameter may be a connection endpoint at all.
    /// Commands, text-info labels and group headers carry no flowing value.
    pub fn is_connectable(self) -> bool {
        !matches!(self, ParamType::Command | ParamType::TextInfo | ParamType::Group)
    }

    /// The value a freshly constructed parameter of this kind holds.
    pub fn default_value(self) -> ParamValue {
        match self {
            ParamType::Bool => ParamValue::Bool(false),
            ParamType::Int => ParamValue::Int(0),
            ParamType::UInt | ParamType::Enum => ParamValue::UInt(0),
            ParamType::Float => ParamValue::Float(0.0),
            ParamType::Str => ParamValue::Str(String::new()),
            ParamType::FileName => ParamValue::Path(PathBuf::new()),
            ParamType::Color => ParamValue::Color([0.0, 0.0, 0.0, 1.0]),
            ParamType::Generic | ParamType::Command | ParamType::TextInfo | ParamType::Group => {
                ParamValue::Null
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::UInt => "uint",
            ParamType::Float => "float",
            ParamType::Str => "string",
            ParamType::FileName => "filename",
            ParamType::Color => "color",
            ParamType::Enum => "enum",
            ParamType::Generic => "generic",
            ParamType::Command => "command",
            ParamType::TextInfo => "textinfo",
            ParamType::Group => "group",
        };
        write!(f, "{}", name)
    }
}

/// Runtime value held by a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    Color([f32; 4]),
    /// Opaque payload for generic parameters; the engine never interprets it.
    Opaque(serde_json::Value),
    /// Aggregate value of a one-or-more input fed by several connections.
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// List -> scalar adapter: a one-element list collapses to its element,
    /// anything else passes through unchanged.
    pub fn into_scalar(self) -> ParamValue {
        match self {
            ParamValue::List(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        }
    }

    /// Scalar -> list adapter: a list passes through, `Null` becomes the
    /// empty list, any scalar becomes a one-element list.
    pub fn into_list(self) -> Vec<ParamValue> {
        match self {
            ParamValue::List(items) => items,
            ParamValue::Null => Vec::new(),
            other => vec![other],
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::UInt(u) => write!(f, "{}", u),
            ParamValue::Float(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Path(p) => write!(f, "{}", p.display()),
            ParamValue::Color(c) => write!(f, "({}, {}, {}, {})", c[0], c[1], c[2], c[3]),
            ParamValue::Opaque(v) => write!(f, "{}", v),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Structural type descriptor of a generic parameter.
///
/// Parsed from foreign type names such as `CImgList<float>`. Both the base
/// name and the template argument are lowercased at parse time, so comparison
/// is case-insensitive by construction and immune to whitespace differences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    base: String,
    template: Option<String>,
}

impl TypeInfo {
    /// Infers a descriptor from a type-name string, splitting off a single
    /// trailing `<...>` template suffix when present.
    pub fn parse(name: &str) -> TypeInfo {
        let trimmed = name.trim();
        if let Some(open) = trimmed.find('<') {
            if let Some(stripped) = trimmed[open + 1..].strip_suffix('>') {
                return TypeInfo {
                    base: trimmed[..open].trim().to_lowercase(),
                    template: Some(stripped.trim().to_lowercase()),
                };
            }
        }
        TypeInfo {
            base: trimmed.to_lowercase(),
            template: None,
        }
    }

    /// Builds a descriptor from a base name and an explicit template argument.
    pub fn with_template(base: &str, template: &str) -> TypeInfo {
        TypeInfo {
            base: base.trim().to_lowercase(),
            template: Some(template.trim().to_lowercase()),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(t) => write!(f, "{}<{}>", self.base, t),
            None => write!(f, "{}", self.base),
        }
    }
}
