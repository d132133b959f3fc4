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

//! Rendering of collected flows into the step-list format consumed by the
//! execution engine.

mod config;
mod error;
mod record;
mod render;
mod source;

pub use config::{ConfigError, OutputFormat, RenderConfig};
pub use error::{RenderError, Result};
pub use record::{InputTransform, RenderedStep, StepList, step_list_schema};
pub use render::Renderer;
pub use source::{SourceExtractor, standalone_source};
