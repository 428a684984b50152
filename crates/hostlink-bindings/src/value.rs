//! Values that cross the host boundary.

use std::fmt;

use serde::Serialize;

use hostlink_common::HostError;

/// Opaque reference to a value living in the host.
///
/// A handle is only meaningful to the host that issued it. Programs hand
/// handles they are done with back through [`Host::release`](crate::Host::release).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HostHandle(u32);

impl HostHandle {
    /// Wrap a raw handle value received from a host.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property value, method argument, or method result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(HostHandle),
}

/// Kind tag of a [`HostValue`], shared with the wasm import ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ValueKind {
    Undefined = 0,
    Null = 1,
    Bool = 2,
    Number = 3,
    String = 4,
    Object = 5,
}

impl ValueKind {
    /// Decode an ABI kind tag.
    pub fn from_i32(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Undefined),
            1 => Some(Self::Null),
            2 => Some(Self::Bool),
            3 => Some(Self::Number),
            4 => Some(Self::String),
            5 => Some(Self::Object),
            _ => None,
        }
    }

    /// Lower-case name, as used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
        }
    }
}

impl HostValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Undefined => ValueKind::Undefined,
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// The handle of an object value.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotAnObject`] for primitives, `null` and `undefined`.
    pub fn as_handle(&self) -> Result<HostHandle, HostError> {
        match self {
            Self::Object(handle) => Ok(*handle),
            other => Err(HostError::NotAnObject {
                found: other.kind().name().to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// `true` for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    /// Consume a string value.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidArgument`] naming `what` when the value is
    /// not a string.
    pub fn into_string(self, what: &str) -> Result<String, HostError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(HostError::invalid_argument(format!(
                "{what}: expected string, found {}",
                other.kind().name()
            ))),
        }
    }
}

/// String conversion used wherever the host coerces a value to text.
impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Self::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Object(_) => f.write_str("[object]"),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<HostHandle> for HostValue {
    fn from(value: HostHandle) -> Self {
        Self::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_handle() {
        let handle = HostHandle::from_raw(3);
        assert_eq!(HostValue::Object(handle).as_handle(), Ok(handle));

        let err = HostValue::from("h1").as_handle().unwrap_err();
        assert_eq!(
            err,
            HostError::NotAnObject {
                found: "string".into()
            }
        );
    }

    #[test]
    fn test_display_coercion() {
        assert_eq!(HostValue::Undefined.to_string(), "undefined");
        assert_eq!(HostValue::Null.to_string(), "null");
        assert_eq!(HostValue::from(true).to_string(), "true");
        assert_eq!(HostValue::from(42).to_string(), "42");
        assert_eq!(HostValue::from(1.5).to_string(), "1.5");
        assert_eq!(HostValue::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(HostValue::from(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(HostValue::from(f64::NAN).to_string(), "NaN");
        assert_eq!(HostValue::from("oh hi mark").to_string(), "oh hi mark");
        assert_eq!(
            HostValue::Object(HostHandle::from_raw(0)).to_string(),
            "[object]"
        );
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for value in [
            HostValue::Undefined,
            HostValue::Null,
            HostValue::Bool(false),
            HostValue::Number(0.0),
            HostValue::String(String::new()),
            HostValue::Object(HostHandle::from_raw(1)),
        ] {
            let kind = value.kind();
            assert_eq!(ValueKind::from_i32(kind as i32), Some(kind));
        }
        assert_eq!(ValueKind::from_i32(17), None);
    }

    #[test]
    fn test_into_string() {
        assert_eq!(
            HostValue::from("x").into_string("title").unwrap(),
            "x".to_string()
        );
        assert!(HostValue::Null.into_string("title").is_err());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(HostHandle::from_raw(7).to_string(), "#7");
    }
}
