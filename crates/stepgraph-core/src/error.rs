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

/// Errors raised while describing a flow.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("too many arguments for step '{step}': expected at most {expected}, got {given}")]
    TooManyArguments {
        step: String,
        expected: usize,
        given: usize,
    },
    #[error("step '{step}' has no parameter named '{parameter}'")]
    UnknownParameter { step: String, parameter: String },
    #[error("parameter '{parameter}' of step '{step}' was given more than once")]
    DuplicateArgument { step: String, parameter: String },
    #[error("step '{step}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { step: String, parameter: String },
    #[error("invalid path: {message}")]
    InvalidPath { message: String },
}

pub type Result<T> = std::result::Result<T, error_stack::Report<FlowError>>;
