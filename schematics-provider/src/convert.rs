//! Helpers for moving values between attribute maps and wire types
//!
//! Readers return `Ok(None)` for absent attributes and a `State` error when an
//! attribute holds a value of the wrong type. Writers skip `None`, so absent
//! wire fields never show up as attributes.

use serde::Serialize;
use serde::de::DeserializeOwned;

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Value};

/// Typed view over an attribute map (or a nested block)
pub struct AttrReader<'a> {
    attrs: &'a Attributes,
    path: String,
}

impl<'a> AttrReader<'a> {
    pub fn new(attrs: &'a Attributes) -> Self {
        Self {
            attrs,
            path: String::new(),
        }
    }

    fn nested(attrs: &'a Attributes, path: String) -> Self {
        Self { attrs, path }
    }

    fn qualified(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn mismatch(&self, key: &str, expected: &str, got: &Value) -> ProviderError {
        ProviderError::state(format!(
            "attribute '{}': expected {}, got {}",
            self.qualified(key),
            expected,
            got.type_name()
        ))
    }

    pub fn string(&self, key: &str) -> ProviderResult<Option<String>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(key, "String", other)),
        }
    }

    pub fn bool(&self, key: &str) -> ProviderResult<Option<bool>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(key, "Bool", other)),
        }
    }

    pub fn int(&self, key: &str) -> ProviderResult<Option<i64>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(self.mismatch(key, "Int", other)),
        }
    }

    pub fn float(&self, key: &str) -> ProviderResult<Option<f64>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(*f)),
            Some(Value::Int(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(self.mismatch(key, "Float", other)),
        }
    }

    pub fn strings(&self, key: &str) -> ProviderResult<Option<Vec<String>>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.mismatch(&format!("{}[{}]", key, i), "String", other)),
                })
                .collect::<ProviderResult<Vec<_>>>()
                .map(Some),
            Some(other) => Err(self.mismatch(key, "List", other)),
        }
    }

    /// Free-form JSON objects (e.g. KPI indicators)
    pub fn json_list(&self, key: &str) -> ProviderResult<Option<Vec<serde_json::Value>>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => Ok(Some(items.iter().map(Value::to_json).collect())),
            Some(other) => Err(self.mismatch(key, "List", other)),
        }
    }

    /// Convert a nested block with `f`
    pub fn block<T>(
        &self,
        key: &str,
        f: impl FnOnce(&AttrReader<'_>) -> ProviderResult<T>,
    ) -> ProviderResult<Option<T>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::Map(map)) => f(&AttrReader::nested(map, self.qualified(key))).map(Some),
            Some(other) => Err(self.mismatch(key, "Block", other)),
        }
    }

    /// Convert each block of a list with `f`, keeping order
    pub fn blocks<T>(
        &self,
        key: &str,
        mut f: impl FnMut(&AttrReader<'_>) -> ProviderResult<T>,
    ) -> ProviderResult<Option<Vec<T>>> {
        match self.attrs.get(key) {
            None => Ok(None),
            Some(Value::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", self.qualified(key), i);
                    match item {
                        Value::Map(map) => out.push(f(&AttrReader::nested(map, path))?),
                        other => return Err(self.mismatch(&format!("{}[{}]", key, i), "Block", other)),
                    }
                }
                Ok(Some(out))
            }
            Some(other) => Err(self.mismatch(key, "List", other)),
        }
    }
}

/// Builds an attribute map from optional wire fields
#[derive(Default)]
pub struct AttrWriter {
    attrs: Attributes,
}

impl AttrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(&mut self, key: &str, value: &Option<String>) -> &mut Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), Value::String(v.clone()));
        }
        self
    }

    pub fn bool(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), Value::Bool(v));
        }
        self
    }

    pub fn int(&mut self, key: &str, value: Option<i64>) -> &mut Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), Value::Int(v));
        }
        self
    }

    pub fn float(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), Value::Float(v));
        }
        self
    }

    pub fn strings(&mut self, key: &str, value: &Option<Vec<String>>) -> &mut Self {
        if let Some(items) = value {
            let list = items.iter().map(|s| Value::String(s.clone())).collect();
            self.attrs.insert(key.to_string(), Value::List(list));
        }
        self
    }

    /// Free-form JSON list; `null` elements (and `null` object members) have no
    /// attribute form and are left out
    pub fn json_list(&mut self, key: &str, value: &Option<Vec<serde_json::Value>>) -> &mut Self {
        if let Some(items) = value {
            let list = items.iter().filter_map(Value::from_json).collect();
            self.attrs.insert(key.to_string(), Value::List(list));
        }
        self
    }

    pub fn block<T>(
        &mut self,
        key: &str,
        value: &Option<T>,
        f: impl FnOnce(&T) -> Attributes,
    ) -> &mut Self {
        if let Some(v) = value {
            self.attrs.insert(key.to_string(), Value::Map(f(v)));
        }
        self
    }

    pub fn blocks<T>(
        &mut self,
        key: &str,
        value: &Option<Vec<T>>,
        f: impl Fn(&T) -> Attributes,
    ) -> &mut Self {
        if let Some(items) = value {
            let list = items.iter().map(|v| Value::Map(f(v))).collect();
            self.attrs.insert(key.to_string(), Value::List(list));
        }
        self
    }

    pub fn finish(&mut self) -> Attributes {
        std::mem::take(&mut self.attrs)
    }
}

// =============================================================================
// Partial requests
// =============================================================================

fn to_object<T: Serialize>(value: &T) -> ProviderResult<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProviderError::state("request did not serialize to an object")),
        Err(e) => Err(ProviderError::state("failed to serialize request").with_cause(e)),
    }
}

fn from_object<T: DeserializeOwned>(
    map: serde_json::Map<String, serde_json::Value>,
) -> ProviderResult<T> {
    serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| ProviderError::state("failed to build request").with_cause(e))
}

/// Keep only the named wire fields of `desired` (PATCH bodies)
pub fn select_fields<T>(desired: &T, fields: &[&str]) -> ProviderResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut map = to_object(desired)?;
    map.retain(|k, _| fields.contains(&k.as_str()));
    from_object(map)
}

/// Replace the named wire fields of `base` with those of `desired`
///
/// A field absent from `desired` is removed from the result.
pub fn overlay_fields<T>(base: &T, desired: &T, fields: &[&str]) -> ProviderResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = to_object(base)?;
    let desired = to_object(desired)?;
    for field in fields {
        match desired.get(*field) {
            Some(v) => {
                merged.insert(field.to_string(), v.clone());
            }
            None => {
                merged.remove(*field);
            }
        }
    }
    from_object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_path_of_mismatch() {
        let mut inner = Attributes::new();
        inner.insert("state".to_string(), Value::Int(1));
        let mut attrs = Attributes::new();
        attrs.insert("user_state".to_string(), Value::Map(inner));

        let reader = AttrReader::new(&attrs);
        let err = reader
            .block("user_state", |b| b.string("state"))
            .unwrap_err();
        assert!(err.to_string().contains("user_state.state"));
        assert_eq!(err.kind, schematics_core::provider::ErrorKind::State);
    }

    #[test]
    fn absent_attributes_read_as_none() {
        let attrs = Attributes::new();
        let reader = AttrReader::new(&attrs);
        assert_eq!(reader.string("name").unwrap(), None);
        assert_eq!(reader.strings("tags").unwrap(), None);
        assert!(reader.blocks("queries", |_| Ok(())).unwrap().is_none());
    }

    #[test]
    fn writer_skips_none() {
        let attrs = AttrWriter::new()
            .string("name", &Some("a".to_string()))
            .string("description", &None)
            .bool("force", None)
            .strings("tags", &Some(vec![]))
            .finish();

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("tags"), Some(&Value::List(vec![])));
    }

    #[test]
    fn json_list_leaves_out_nulls() {
        let indicators = Some(vec![
            serde_json::json!({"cpu": "low", "memory": null}),
            serde_json::Value::Null,
            serde_json::json!({"disk": "ok"}),
        ]);
        let attrs = AttrWriter::new()
            .json_list("infra_indicators", &indicators)
            .finish();

        let items = attrs["infra_indicators"].as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_map().unwrap().len(), 1);
        assert_eq!(items[1].as_map().unwrap()["disk"], Value::from("ok"));
    }

    #[test]
    fn select_and_overlay_fields() {
        use crate::models::Policy;

        let desired = Policy {
            name: Some("new".to_string()),
            description: Some("desc".to_string()),
            ..Default::default()
        };
        let patch = select_fields(&desired, &["name"]).unwrap();
        assert_eq!(patch.name.as_deref(), Some("new"));
        assert!(patch.description.is_none());

        let current = Policy {
            name: Some("old".to_string()),
            location: Some("us-south".to_string()),
            tags: Some(vec!["a".to_string()]),
            ..Default::default()
        };
        let merged = overlay_fields(&current, &desired, &["name", "tags"]).unwrap();
        assert_eq!(merged.name.as_deref(), Some("new"));
        assert_eq!(merged.location.as_deref(), Some("us-south"));
        assert!(merged.tags.is_none());
    }

    #[test]
    fn float_accepts_integer_attribute() {
        let mut attrs = Attributes::new();
        attrs.insert("elapsed".to_string(), Value::Int(3));
        assert_eq!(AttrReader::new(&attrs).float("elapsed").unwrap(), Some(3.0));
    }
}
