//! Store-native document model. Firestore documents are open field maps whose
//! values carry a type tag on the wire; `Value` mirrors the subset this
//! pipeline reads and writes, with a native timestamp arm that plain JSON
//! lacks.
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// A document is an ordered field map. Order follows the source that built
/// it, which keeps narration and wire payloads deterministic across runs.
pub type Document = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Convert plain JSON into the typed model. Integral numbers become
    /// `Int` (the store distinguishes integer and double fields); date
    /// strings stay strings until the normalizer promotes them.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Build a document from a JSON object's fields.
pub fn document_from_json(map: &serde_json::Map<String, JsonValue>) -> Document {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_scalars_and_nesting() {
        let json = json!({
            "nome": "Furadeira",
            "quantidade": 3,
            "peso": 1.5,
            "ativo": true,
            "obs": null,
            "tags": ["eletrica", "bancada"],
            "meta": { "origem": "doacao" }
        });
        let doc = document_from_json(json.as_object().unwrap());

        assert_eq!(doc.get("nome"), Some(&Value::Str("Furadeira".into())));
        assert_eq!(doc.get("quantidade"), Some(&Value::Int(3)));
        assert_eq!(doc.get("peso"), Some(&Value::Double(1.5)));
        assert_eq!(doc.get("ativo"), Some(&Value::Bool(true)));
        assert_eq!(doc.get("obs"), Some(&Value::Null));
        assert_eq!(
            doc.get("tags"),
            Some(&Value::Array(vec![
                Value::Str("eletrica".into()),
                Value::Str("bancada".into())
            ]))
        );
        match doc.get("meta") {
            Some(Value::Map(meta)) => {
                assert_eq!(meta.get("origem"), Some(&Value::Str("doacao".into())));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn integral_floats_stay_integers() {
        // serde_json reports 7 as i64 even when the producer wrote a float-ish 7.
        let json = json!({ "n": 7 });
        let doc = document_from_json(json.as_object().unwrap());
        assert_eq!(doc.get("n"), Some(&Value::Int(7)));
    }
}
