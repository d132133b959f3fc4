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

use error_stack::report;
use indexmap::{IndexMap, IndexSet};

use crate::{AnalysisError, DependenciesBuilder, DependencyTracker, Result};

/// Order `nodes` so that every node comes after all the nodes it depends on.
///
/// `edges` maps a node to the nodes it depends on. When several nodes are
/// ready at once, the one listed first in `nodes` is scheduled first, so the
/// result is deterministic for a given input.
///
/// Fails with [`AnalysisError::CyclicDependency`] if no such order exists and
/// with [`AnalysisError::StepNotFound`] if an edge names an unknown node.
pub fn topological_order<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: &IndexMap<String, IndexSet<String>>,
) -> Result<Vec<String>> {
    let mut builder = DependenciesBuilder::new(nodes);
    for (step, depends_on) in edges {
        for dependency in depends_on {
            builder
                .add_dependency(step, dependency)
                .map_err(|e| e.attach_printable(format!("in dependencies of step '{step}'")))?;
        }
    }
    let dependencies = builder.finish();
    let steps = dependencies.len();

    let mut tracker = DependencyTracker::new(dependencies);
    let mut ready = tracker.unblocked_steps();
    let mut order = Vec::with_capacity(steps);

    loop {
        let next = ready.iter().next();
        let Some(step) = next else {
            break;
        };
        ready.remove(step);
        order.push(tracker.step_name(step).to_string());
        ready.union_with(&tracker.complete_step(step));
    }

    if order.len() < steps {
        let remaining: Vec<String> = tracker
            .incomplete_steps()
            .iter()
            .map(|step| tracker.step_name(step).to_string())
            .collect();
        log::debug!("Unable to schedule steps {remaining:?}: dependency cycle");
        return Err(report!(AnalysisError::CyclicDependency { steps: remaining }));
    }

    log::debug!("Scheduled {} steps: {order:?}", order.len());
    Ok(order)
}
