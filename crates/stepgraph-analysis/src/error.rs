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

/// Error types for flow analysis
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Cyclic dependency between steps: {}", steps.join(", "))]
    CyclicDependency { steps: Vec<String> },
    #[error("Step not found: {step_id}")]
    StepNotFound { step_id: String },
}

pub type Result<T> = std::result::Result<T, error_stack::Report<AnalysisError>>;
