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

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stepgraph_core::{JsonPath, PathPart, ValueRef};

/// How the engine obtains the value of one step input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputTransform {
    /// # StaticInput
    /// A literal value.
    Static { value: ValueRef },
    /// # ExpressionInput
    /// An expression over the results of earlier steps, e.g. `results.a.rows[0]`.
    Javascript { expr: String },
}

impl InputTransform {
    /// Expression selecting `path` within the result of step `step_id`.
    pub fn result_expr(step_id: &str, path: &JsonPath) -> String {
        let mut expr = String::from("results");
        push_field(&mut expr, step_id);
        for part in path.parts() {
            match part {
                PathPart::Field(name) => push_field(&mut expr, name),
                PathPart::Index(index) => {
                    expr.push('[');
                    expr.push_str(&index.to_string());
                    expr.push(']');
                }
            }
        }
        expr
    }
}

fn push_field(expr: &mut String, name: &str) {
    if PathPart::is_identifier(name) {
        expr.push('.');
        expr.push_str(name);
    } else {
        expr.push('[');
        // A JSON string literal is also a valid JavaScript string literal.
        expr.push_str(&serde_json::Value::from(name).to_string());
        expr.push(']');
    }
}

/// One step of the rendered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderedStep {
    /// Identifier of the step, unique within the list.
    pub id: String,
    /// Language of `content`, as understood by the engine.
    pub language: String,
    /// Standalone source of the step implementation.
    pub content: String,
    /// Inputs of the step, keyed by parameter name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_transforms: IndexMap<String, InputTransform>,
}

/// The ordered step list handed to the execution engine.
///
/// Steps appear in execution order: every step comes after the steps whose
/// results it uses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StepList(Vec<RenderedStep>);

impl StepList {
    pub fn new(steps: Vec<RenderedStep>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[RenderedStep] {
        &self.0
    }

    pub fn get(&self, id: &str) -> Option<&RenderedStep> {
        self.0.iter().find(|step| step.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|step| step.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<RenderedStep> {
        self.0
    }
}

impl IntoIterator for StepList {
    type Item = RenderedStep;
    type IntoIter = std::vec::IntoIter<RenderedStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// JSON Schema describing the serialized step list.
pub fn step_list_schema() -> serde_json::Value {
    schemars::schema_for!(StepList).to_value()
}
