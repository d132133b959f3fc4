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

//! Build flows declaratively and render them into an ordered step list.
//!
//! Calls to a [`StepFn`] record [`Step`]s instead of running anything. Passing
//! one step (or a [`Reference`] into its result) to another call wires a
//! dependency. [`build`] collects everything reachable from the final step,
//! orders it so dependencies come first, and renders each step's standalone
//! source for the execution engine.
//!
//! ```
//! use stepgraph::{RenderConfig, StepFn, build_steps, call};
//!
//! let load = StepFn::new("load", Vec::<String>::new())
//!     .with_source("def load():\n    return {\"rows\": [1, 2, 3]}\n");
//! let total = StepFn::new("total", ["rows"])
//!     .with_source("def total(rows):\n    return sum(rows)\n");
//!
//! let result = call!(total, call!(load).unwrap().at("rows")).unwrap();
//! let steps = build_steps(&result, &RenderConfig::default()).unwrap();
//!
//! assert_eq!(steps.ids().collect::<Vec<_>>(), vec!["load", "total"]);
//! assert_eq!(steps.steps()[1].content, "def main(rows):\n    return sum(rows)\n");
//! ```

use error_stack::{Report, ResultExt as _};
use thiserror::Error;

pub use stepgraph_analysis::{AnalysisError, FlowGraph, collect, topological_order};
pub use stepgraph_core::{
    FlowError, Input, JsonPath, PathPart, Reference, SourceFn, Step, StepFn, ValueRef, call,
};
pub use stepgraph_render::{
    ConfigError, InputTransform, OutputFormat, RenderConfig, RenderError, RenderedStep, Renderer,
    StepList, step_list_schema,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("Failed to schedule flow ending at step '{0}'")]
    Schedule(String),
    #[error("Failed to render flow ending at step '{0}'")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Report<BuildError>>;

/// Collect, order and render the flow ending at `terminal`.
///
/// No step implementation is executed. Sources are only read here, once per
/// implementation.
pub fn build_steps(terminal: &Step, config: &RenderConfig) -> Result<StepList> {
    build_with(terminal, config, |renderer, graph, order| {
        renderer.render(graph, order)
    })
}

/// Like [`build_steps`], serialized in the configured [`OutputFormat`].
///
/// Either the whole document is produced or an error is returned.
pub fn build(terminal: &Step, config: &RenderConfig) -> Result<String> {
    build_with(terminal, config, |renderer, graph, order| {
        renderer.render_document(graph, order)
    })
}

fn build_with<T>(
    terminal: &Step,
    config: &RenderConfig,
    render: impl FnOnce(&mut Renderer, &FlowGraph, &[String]) -> stepgraph_render::Result<T>,
) -> Result<T> {
    let graph = collect(terminal);
    let order = graph
        .schedule()
        .change_context_lazy(|| BuildError::Schedule(graph.terminal().to_string()))?;
    log::debug!("Execution order: {order:?}");

    let mut renderer = Renderer::new(config.clone());
    render(&mut renderer, &graph, &order)
        .change_context_lazy(|| BuildError::Render(graph.terminal().to_string()))
}
