//! Engine value handles
//!
//! [`ScriptValue`] is how engine-side values cross into the agent: the
//! arguments handed to the injected script helper and the results it returns.
//! It owns no lifetime decisions; object groups live on the engine side.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Opaque reference to an engine object that has no JSON form, such as a DOM
/// node or a raw call frame chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub u64);

/// A value living in the script engine.
///
/// Arrays and objects are shared and mutable, like their engine counterparts,
/// which also means they can form cycles.
#[derive(Clone, Default)]
pub enum ScriptValue {
    /// No value at all, e.g. a call stack of a VM-internal pause.
    #[default]
    Empty,
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(String),
    /// An array, elements in index order.
    Array(Rc<RefCell<Vec<ScriptValue>>>),
    /// A plain object, properties in insertion order.
    Object(Rc<RefCell<IndexMap<String, ScriptValue>>>),
    /// An engine object only the engine can look into, such as a DOM node.
    Handle(EngineHandle),
}

/// Why a [`ScriptValue`] could not be marshaled to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToJsonError {
    /// The object graph nests deeper than the allowed depth, or is cyclic.
    DepthExceeded,
    /// The value holds an [`EngineHandle`].
    Opaque,
}

impl ScriptValue {
    /// Creates an array value.
    #[must_use]
    pub fn array(items: Vec<ScriptValue>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    /// Creates an object value from its own enumerable properties.
    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ScriptValue)>,
    {
        let map = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        Self::Object(Rc::new(RefCell::new(map)))
    }

    /// Returns `true` for [`ScriptValue::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the engine handle if this value is one.
    #[must_use]
    pub fn as_handle(&self) -> Option<EngineHandle> {
        match self {
            Self::Handle(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Builds a value tree from JSON.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => {
                Self::object(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))))
            }
        }
    }

    /// Marshals the value to JSON, nesting at most `max_depth` containers.
    ///
    /// `Empty` and `Undefined` become `null`, as do non-finite numbers.
    /// Integral numbers are emitted as JSON integers.
    ///
    /// # Errors
    ///
    /// Fails with [`ToJsonError::DepthExceeded`] when the graph is deeper than
    /// `max_depth` (which every cycle is) and with [`ToJsonError::Opaque`] when
    /// an engine handle is reached.
    pub fn to_json(&self, max_depth: usize) -> Result<Value, ToJsonError> {
        match self {
            Self::Empty | Self::Undefined | Self::Null => Ok(Value::Null),
            Self::Boolean(b) => Ok(Value::Bool(*b)),
            Self::Number(n) => Ok(number_to_json(*n)),
            Self::String(s) => Ok(Value::String(s.clone())),
            Self::Array(items) => {
                let depth = max_depth.checked_sub(1).ok_or(ToJsonError::DepthExceeded)?;
                items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json(depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Self::Object(properties) => {
                let depth = max_depth.checked_sub(1).ok_or(ToJsonError::DepthExceeded)?;
                let mut map = Map::new();
                for (key, value) in properties.borrow().iter() {
                    map.insert(key.clone(), value.to_json(depth)?);
                }
                Ok(Value::Object(map))
            }
            Self::Handle(_) => Err(ToJsonError::Opaque),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => write!(f, "Boolean({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            // Shallow on purpose: containers may be cyclic.
            Self::Array(items) => write!(f, "Array(len = {})", items.borrow().len()),
            Self::Object(properties) => {
                f.debug_set().entries(properties.borrow().keys()).finish()
            }
            Self::Handle(handle) => write!(f, "{handle:?}"),
        }
    }
}
