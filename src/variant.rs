use std::collections::HashMap;

use zbus::zvariant::{OwnedValue, Value};

/// A transport variant unwrapped into a plain owned value.
///
/// D-Bus hands property payloads over as tagged variants, often nested
/// (the metadata dictionary wraps every entry in another variant layer).
/// `PlainValue` is the fully unwrapped form the reconciliation logic and
/// metadata accessors work with.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    /// Boolean value
    Bool(bool),

    /// Integer value; unsigned 64-bit wire values are narrowed
    Int(i64),

    /// Floating point value
    Float(f64),

    /// String, object path or signature value
    Text(String),

    /// Array or structure fields
    List(Vec<PlainValue>),

    /// Dictionary with string keys
    Map(HashMap<String, PlainValue>),
}

impl PlainValue {
    /// The boolean value, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as an integer. Floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// The value as a float. Integers widen losslessly enough for rates
    /// and volumes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// The string value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// String-list view: a list of strings, or a bare string as a
    /// single-element list. Some players report `xesam:artist` both ways.
    pub fn as_text_list(&self) -> Option<Vec<String>> {
        match self {
            Self::List(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            Self::Text(value) => Some(vec![value.clone()]),
            _ => None,
        }
    }
}

/// Recursively unwrap a tagged D-Bus value into a [`PlainValue`].
///
/// Numeric types narrow to `i64`/`f64`, string-like types (strings, object
/// paths, signatures) become text, containers decode element-wise and
/// nested variants unwrap transparently. Values with no plain
/// representation (file descriptors) yield `None` and are skipped by
/// callers.
pub fn plain(value: &Value<'_>) -> Option<PlainValue> {
    match value {
        Value::Bool(value) => Some(PlainValue::Bool(*value)),
        Value::U8(value) => Some(PlainValue::Int(i64::from(*value))),
        Value::I16(value) => Some(PlainValue::Int(i64::from(*value))),
        Value::U16(value) => Some(PlainValue::Int(i64::from(*value))),
        Value::I32(value) => Some(PlainValue::Int(i64::from(*value))),
        Value::U32(value) => Some(PlainValue::Int(i64::from(*value))),
        Value::I64(value) => Some(PlainValue::Int(*value)),
        // narrowed; positions and lengths fit comfortably
        Value::U64(value) => Some(PlainValue::Int(*value as i64)),
        Value::F64(value) => Some(PlainValue::Float(*value)),
        Value::Str(value) => Some(PlainValue::Text(value.to_string())),
        Value::Signature(value) => Some(PlainValue::Text(value.to_string())),
        Value::ObjectPath(value) => Some(PlainValue::Text(value.to_string())),
        Value::Value(inner) => plain(inner),
        Value::Array(items) => Some(PlainValue::List(
            items.iter().filter_map(plain).collect(),
        )),
        Value::Structure(fields) => Some(PlainValue::List(
            fields.fields().iter().filter_map(plain).collect(),
        )),
        Value::Dict(_) => {
            let entries: HashMap<String, OwnedValue> = value.try_clone().ok()?.try_into().ok()?;
            let mut map = HashMap::new();
            for (key, entry) in &entries {
                if let Some(entry) = plain(entry) {
                    map.insert(key.clone(), entry);
                }
            }
            Some(PlainValue::Map(map))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use zbus::zvariant::Value;

    use super::{PlainValue, plain};

    #[test]
    fn primitives_unwrap() {
        assert_eq!(plain(&Value::from(true)), Some(PlainValue::Bool(true)));
        assert_eq!(plain(&Value::from(42_i32)), Some(PlainValue::Int(42)));
        assert_eq!(plain(&Value::from(1.5_f64)), Some(PlainValue::Float(1.5)));
        assert_eq!(
            plain(&Value::from("hello")),
            Some(PlainValue::Text("hello".to_string()))
        );
    }

    #[test]
    fn u64_narrows_to_i64() {
        assert_eq!(
            plain(&Value::U64(1_230_000)),
            Some(PlainValue::Int(1_230_000))
        );
    }

    #[test]
    fn nested_variants_unwrap_transparently() {
        let nested = Value::Value(Box::new(Value::from(0.5_f64)));
        assert_eq!(plain(&nested), Some(PlainValue::Float(0.5)));
    }

    #[test]
    fn arrays_decode_element_wise() {
        let value = Value::from(vec!["one", "two"]);
        assert_eq!(
            plain(&value),
            Some(PlainValue::List(vec![
                PlainValue::Text("one".to_string()),
                PlainValue::Text("two".to_string()),
            ]))
        );
    }

    #[test]
    fn dicts_decode_to_string_keyed_maps() {
        let mut source = HashMap::new();
        source.insert("mpris:length", 240_000_000_i64);
        let decoded = plain(&Value::from(source));

        let mut expected = HashMap::new();
        expected.insert("mpris:length".to_string(), PlainValue::Int(240_000_000));
        assert_eq!(decoded, Some(PlainValue::Map(expected)));
    }

    #[test]
    fn text_list_accepts_bare_strings() {
        let bare = PlainValue::Text("Solo Artist".to_string());
        assert_eq!(
            bare.as_text_list(),
            Some(vec!["Solo Artist".to_string()])
        );
    }
}
