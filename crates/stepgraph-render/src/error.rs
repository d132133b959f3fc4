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

/// Errors raised while rendering a flow.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Source unavailable for step '{step}'")]
    SourceUnavailable { step: String },
    #[error("Source for step '{step}' does not start with a function definition")]
    MissingDefinition { step: String },
    #[error("Source for step '{step}' defines '{found}'")]
    NameMismatch { step: String, found: String },
    #[error("Function for step '{step}' has no body")]
    MissingBody { step: String },
    #[error("Source for step '{step}' has an unterminated string or unbalanced brackets")]
    MalformedSource { step: String },
    #[error("Step not found: {step_id}")]
    StepNotFound { step_id: String },
    #[error("Failed to serialize step list")]
    Serialization,
}

pub type Result<T> = std::result::Result<T, error_stack::Report<RenderError>>;
