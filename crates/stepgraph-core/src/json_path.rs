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

use std::fmt;

use error_stack::report;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{FlowError, Result};

/// A single segment of a path into a step output.
#[derive(Debug, Clone, PartialEq, Hash, Eq)]
pub enum PathPart {
    /// Access a field by name
    Field(String),
    /// Access an array element by index
    Index(usize),
}

impl PathPart {
    /// Whether a field name can be written with dot notation.
    pub fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            }
            _ => false,
        }
    }
}

/// A path into the output of a step, as a sequence of [`PathPart`]s.
///
/// Serializes as a string (`$`, `$.field`, `$.items[0]`, `$["odd key"]`)
/// but keeps the structured form internally.
#[derive(Debug, Clone, PartialEq, Hash, Eq, Default)]
pub struct JsonPath(Vec<PathPart>);

impl JsonPath {
    /// Create a new empty path, referring to the whole value.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_parts(parts: Vec<PathPart>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[PathPart] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return a new path with `part` appended. The receiver is unchanged.
    pub fn with(&self, part: PathPart) -> Self {
        let mut parts = Vec::with_capacity(self.0.len() + 1);
        parts.extend(self.0.iter().cloned());
        parts.push(part);
        Self(parts)
    }

    pub fn with_field(&self, name: impl Into<String>) -> Self {
        self.with(PathPart::Field(name.into()))
    }

    pub fn with_index(&self, index: usize) -> Self {
        self.with(PathPart::Index(index))
    }

    /// Parse a string path.
    ///
    /// Accepts `$`-rooted paths (`$.a[0]["b c"]`) and, for convenience, a bare
    /// field name without the leading `$`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::new());
        }

        let Some(s) = s.strip_prefix('$') else {
            return Ok(Self(vec![PathPart::Field(s.to_string())]));
        };

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '[' => {
                    while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
                    match chars.peek() {
                        Some(&quote @ ('"' | '\'')) => {
                            chars.next();
                            parts.push(PathPart::Field(parse_quoted(&mut chars, quote)?));
                            while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
                            if chars.next() != Some(']') {
                                return Err(invalid_path(
                                    "Expected ']' after quoted field name in path",
                                ));
                            }
                        }
                        _ => {
                            let mut bracket_content = String::new();
                            let mut found_end = false;

                            for ch in chars.by_ref() {
                                if ch == ']' {
                                    found_end = true;
                                    break;
                                }
                                bracket_content.push(ch);
                            }

                            if !found_end {
                                return Err(invalid_path("Unclosed bracket '[' in path"));
                            }

                            let bracket_content = bracket_content.trim();
                            let Ok(index) = bracket_content.parse::<usize>() else {
                                return Err(invalid_path(format!(
                                    "Invalid index '{bracket_content}' in path. Expected a number or a quoted string."
                                )));
                            };
                            parts.push(PathPart::Index(index));
                        }
                    }
                }
                '.' => {
                    let mut field_name = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch == '[' || ch == '.' {
                            break;
                        }
                        field_name.push(ch);
                        chars.next();
                    }

                    if field_name.is_empty() {
                        return Err(invalid_path("Empty field name after '.'"));
                    }
                    parts.push(PathPart::Field(field_name));
                }
                _ => {
                    return Err(invalid_path(format!(
                        "Invalid character '{ch}' in path after $ or ']'. Expected '.' or '['"
                    )));
                }
            }
        }

        Ok(Self(parts))
    }
}

/// Read a quoted field name up to the closing `quote`, resolving escapes.
///
/// Escapes follow JSON, plus `\'` inside single quotes.
fn parse_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Result<String> {
    let mut literal = String::from('"');
    loop {
        match chars.next() {
            None => return Err(invalid_path("Unclosed bracket '[' in path")),
            Some(ch) if ch == quote => break,
            Some('\\') => match chars.next() {
                Some('\'') if quote == '\'' => literal.push('\''),
                Some(escaped) => {
                    literal.push('\\');
                    literal.push(escaped);
                }
                None => return Err(invalid_path("Unclosed bracket '[' in path")),
            },
            // Only reachable inside single quotes.
            Some('"') => literal.push_str("\\\""),
            Some(ch) => literal.push(ch),
        }
    }
    literal.push('"');

    serde_json::from_str(&literal)
        .map_err(|e| invalid_path(format!("Invalid quoted field name {literal} in path: {e}")))
}

fn invalid_path(message: impl Into<String>) -> error_stack::Report<FlowError> {
    report!(FlowError::InvalidPath {
        message: message.into(),
    })
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for part in &self.0 {
            match part {
                PathPart::Field(name) if PathPart::is_identifier(name) => write!(f, ".{name}")?,
                // JSON quoting, which `parse` reverses.
                PathPart::Field(name) => {
                    write!(f, "[{}]", serde_json::Value::from(name.as_str()))?
                }
                PathPart::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for JsonPath {
    type Err = error_stack::Report<FlowError>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for JsonPath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct JsonPathVisitor;

        impl Visitor<'_> for JsonPathVisitor {
            type Value = JsonPath;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a path string")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                JsonPath::parse(value).map_err(|e| de::Error::custom(e.current_context()))
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(JsonPath::new())
            }
        }

        deserializer.deserialize_any(JsonPathVisitor)
    }
}

impl schemars::JsonSchema for JsonPath {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "JsonPath".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "description": "Path into the referenced step output. `$` is the whole output.",
            "examples": ["$", "$.field", "$[0]", "$.field[0].nested", "$[\"odd key\"]"]
        })
    }
}

impl<S: Into<String>> FromIterator<S> for JsonPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| PathPart::Field(s.into())).collect())
    }
}
