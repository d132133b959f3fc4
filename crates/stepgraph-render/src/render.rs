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

use error_stack::{ResultExt as _, report};
use indexmap::IndexMap;
use stepgraph_analysis::FlowGraph;
use stepgraph_core::{Input, Step};

use crate::{
    InputTransform, OutputFormat, RenderConfig, RenderError, RenderedStep, Result, SourceExtractor,
    StepList,
};

/// Renders scheduled flow graphs into step lists.
///
/// Extracted sources are cached for the lifetime of the renderer, so a
/// renderer should not outlive one flow build if sources may change.
pub struct Renderer {
    config: RenderConfig,
    extractor: SourceExtractor,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let extractor = SourceExtractor::new(config.entrypoint.clone());
        Self { config, extractor }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the steps of `graph` in the given order.
    pub fn render(&mut self, graph: &FlowGraph, order: &[String]) -> Result<StepList> {
        let steps = order
            .iter()
            .map(|id| {
                let step = graph.node(id).ok_or_else(|| {
                    report!(RenderError::StepNotFound {
                        step_id: id.clone()
                    })
                })?;
                self.render_step(graph, id, step)
                    .attach_printable_lazy(|| format!("while rendering step '{id}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Rendered {} steps from {} implementations",
            steps.len(),
            self.extractor.cached()
        );
        Ok(StepList::new(steps))
    }

    fn render_step(&mut self, graph: &FlowGraph, id: &str, step: &Step) -> Result<RenderedStep> {
        let content = self.extractor.extract(step.implementation())?;

        let input_transforms = step
            .inputs()
            .iter()
            .map(|(name, input)| {
                let transform = match input {
                    Input::Literal(value) => InputTransform::Static {
                        value: value.clone(),
                    },
                    Input::Ref(reference) => {
                        let target = graph.node_id(reference.target()).ok_or_else(|| {
                            report!(RenderError::StepNotFound {
                                step_id: reference.target().id().to_string()
                            })
                        })?;
                        InputTransform::Javascript {
                            expr: InputTransform::result_expr(target, reference.path()),
                        }
                    }
                };
                Ok((name.clone(), transform))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        Ok(RenderedStep {
            id: id.to_string(),
            language: self.config.language.clone(),
            content: content.to_string(),
            input_transforms,
        })
    }

    /// Serialize a step list in the configured format.
    pub fn serialize(&self, steps: &StepList) -> Result<String> {
        match self.config.format {
            OutputFormat::Yaml => {
                serde_yaml_ng::to_string(steps).change_context(RenderError::Serialization)
            }
            OutputFormat::Json => serde_json::to_string_pretty(steps)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .change_context(RenderError::Serialization),
        }
    }

    /// Render and serialize in one go.
    pub fn render_document(&mut self, graph: &FlowGraph, order: &[String]) -> Result<String> {
        let steps = self.render(graph, order)?;
        self.serialize(&steps)
    }
}
