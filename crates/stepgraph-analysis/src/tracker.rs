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

use std::{collections::HashMap, sync::Arc};

use bit_set::BitSet;
use error_stack::report;

use crate::{AnalysisError, Result};

/// Builds a dependency graph over a fixed set of steps.
pub struct DependenciesBuilder {
    step_names: Vec<String>,
    step_names_to_index: HashMap<String, usize>,
    /// For each step, a bitset of the steps that depend on it.
    step_dependents: Vec<BitSet>,
    /// For each step, a bitset of the steps that it depends on.
    step_dependencies: Vec<BitSet>,
}

impl DependenciesBuilder {
    /// Create a builder for the given steps. Indices follow iteration order.
    pub fn new<S: Into<String>>(step_names: impl IntoIterator<Item = S>) -> Self {
        let step_names: Vec<String> = step_names.into_iter().map(Into::into).collect();
        let steps = step_names.len();
        let step_names_to_index = step_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        Self {
            step_names,
            step_names_to_index,
            step_dependents: vec![BitSet::with_capacity(steps); steps],
            step_dependencies: vec![BitSet::with_capacity(steps); steps],
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.step_names_to_index.get(name).copied().ok_or_else(|| {
            report!(AnalysisError::StepNotFound {
                step_id: name.to_string(),
            })
        })
    }

    /// Record that `step` must run after `depends_on`.
    pub fn add_dependency(&mut self, step: &str, depends_on: &str) -> Result<()> {
        let step = self.index_of(step)?;
        let depends_on = self.index_of(depends_on)?;
        if self.step_dependencies[step].insert(depends_on) {
            self.step_dependents[depends_on].insert(step);
        }
        Ok(())
    }

    /// Finish building the dependency graph.
    pub fn finish(self) -> Arc<Dependencies> {
        Arc::new(Dependencies {
            steps: self.step_names.len(),
            step_names: self.step_names,
            step_dependents: self.step_dependents,
            step_dependencies: self.step_dependencies,
        })
    }
}

/// Information about dependencies between steps.
#[derive(Debug)]
pub struct Dependencies {
    steps: usize,
    step_names: Vec<String>,
    /// For each step, a bitset of the steps that depend on it.
    step_dependents: Vec<BitSet>,
    /// For each step, a bitset of the steps that it depends on.
    step_dependencies: Vec<BitSet>,
}

impl Dependencies {
    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    pub fn step_name(&self, step: usize) -> &str {
        &self.step_names[step]
    }

    pub fn dependencies(&self, step: usize) -> &BitSet {
        &self.step_dependencies[step]
    }

    pub fn dependents(&self, step: usize) -> &BitSet {
        &self.step_dependents[step]
    }
}

/// Tracks which steps are unblocked as steps are completed.
pub struct DependencyTracker {
    dependencies: Arc<Dependencies>,
    /// For each step, the count of remaining dependencies.
    blocking: Vec<usize>,
    /// For each step, whether it has been completed.
    completed: BitSet,
}

impl DependencyTracker {
    pub fn new(dependencies: Arc<Dependencies>) -> Self {
        let blocking = dependencies
            .step_dependencies
            .iter()
            .map(|d| d.len())
            .collect();
        let completed = BitSet::with_capacity(dependencies.steps);
        Self {
            dependencies,
            blocking,
            completed,
        }
    }

    /// Return the name of the given step.
    pub fn step_name(&self, step: usize) -> &str {
        self.dependencies.step_name(step)
    }

    /// Return the set of all steps that are currently runnable.
    pub fn unblocked_steps(&self) -> BitSet {
        let mut unblocked: BitSet = self
            .blocking
            .iter()
            .enumerate()
            .filter(|(_, blocking)| **blocking == 0)
            .map(|(step, _)| step)
            .collect();
        unblocked.difference_with(&self.completed);
        unblocked
    }

    /// Return the set of steps not yet completed.
    pub fn incomplete_steps(&self) -> BitSet {
        let mut incomplete: BitSet = (0..self.dependencies.steps).collect();
        incomplete.difference_with(&self.completed);
        incomplete
    }

    /// Mark the given step as completed.
    ///
    /// Return a set of newly runnable steps.
    pub fn complete_step(&mut self, step: usize) -> BitSet {
        if !self.completed.insert(step) {
            return BitSet::new();
        }

        let mut unblocked = BitSet::with_capacity(self.dependencies.steps);
        for dependent in self.dependencies.step_dependents[step].iter() {
            self.blocking[dependent] -= 1;
            if self.blocking[dependent] == 0 && !self.completed.contains(dependent) {
                unblocked.insert(dependent);
            }
        }
        unblocked
    }
}
