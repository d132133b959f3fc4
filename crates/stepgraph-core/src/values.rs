// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A literal value passed to a step.
///
/// Values are shared behind an `Arc` so that steps, graphs and rendered
/// records can hold them without deep copies.
#[derive(Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct ValueRef(Arc<serde_json::Value>);

impl std::fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Default for ValueRef {
    fn default() -> Self {
        Self::new(serde_json::Value::Null)
    }
}

impl Serialize for ValueRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValueRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Self::new)
    }
}

impl schemars::JsonSchema for ValueRef {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "Value".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "description": "Any JSON value (object, array, string, number, boolean, or null)"
        })
    }
}

impl<T: Into<serde_json::Value>> From<T> for ValueRef {
    fn from(value: T) -> Self {
        Self::new(value.into())
    }
}

impl ValueRef {
    pub fn new(value: serde_json::Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &serde_json::Value {
        self.0.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl AsRef<serde_json::Value> for ValueRef {
    fn as_ref(&self) -> &serde_json::Value {
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_ref_from() {
        assert_eq!(ValueRef::from(2).value(), &json!(2));
        assert_eq!(ValueRef::from("text").value(), &json!("text"));
        assert!(ValueRef::default().is_null());
    }

    #[test]
    fn test_value_ref_serializes_transparently() {
        let value = ValueRef::from(json!({"a": [1, 2]}));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":[1,2]}"#);

        let parsed: ValueRef = serde_json::from_str(r#"{"a":[1,2]}"#).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_value_ref_yaml() {
        let value = ValueRef::from(json!({"limit": 2, "filter": {"active": true}, "name": "rows"}));
        insta::assert_yaml_snapshot!(value, @r###"
        limit: 2
        filter:
          active: true
        name: rows
        "###);

        let parsed: ValueRef =
            serde_yaml_ng::from_str("limit: 2\nfilter:\n  active: true\nname: rows\n").unwrap();
        assert_eq!(parsed, value);
    }
}
