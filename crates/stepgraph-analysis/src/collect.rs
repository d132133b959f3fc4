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

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use stepgraph_core::Step;

use crate::{Result, topological_order};

/// The dependency graph reachable from a terminal step.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    terminal: String,
    /// Node id -> step, in discovery order.
    nodes: IndexMap<String, Step>,
    /// Node id -> ids of the steps it depends on. Steps without dependencies
    /// have no entry.
    edges: IndexMap<String, IndexSet<String>>,
    /// Step identity -> node id.
    ids: HashMap<Step, String>,
}

impl FlowGraph {
    /// Id of the terminal step the graph was collected from.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn nodes(&self) -> &IndexMap<String, Step> {
        &self.nodes
    }

    pub fn edges(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Step> {
        self.nodes.get(id)
    }

    /// The node id assigned to `step`, if it is part of this graph.
    ///
    /// This usually equals [`Step::id`], but differs when several distinct
    /// steps share an implementation name.
    pub fn node_id(&self, step: &Step) -> Option<&str> {
        self.ids.get(step).map(String::as_str)
    }

    /// Ids of the steps that `id` depends on.
    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> + '_ {
        self.edges
            .get(id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Order the nodes so every step comes after the steps it depends on.
    pub fn schedule(&self) -> Result<Vec<String>> {
        topological_order(self.nodes.keys().map(String::as_str), &self.edges)
    }
}

/// Collect every step reachable from `terminal` through references.
///
/// Each step is visited once, even when several steps depend on it. Distinct
/// steps sharing an implementation name get distinct node ids: the first one
/// discovered keeps the name, later ones get `<name>_2`, `<name>_3`, ...
pub fn collect(terminal: &Step) -> FlowGraph {
    let mut nodes: IndexMap<String, Step> = IndexMap::new();
    let mut ids: HashMap<Step, String> = HashMap::new();
    let mut name_counts: HashMap<String, usize> = HashMap::new();

    let mut stack = vec![terminal.clone()];
    while let Some(step) = stack.pop() {
        if ids.contains_key(&step) {
            continue;
        }

        let id = assign_id(step.id(), &nodes, &mut name_counts);
        log::trace!("Collected step '{id}': {step}");
        ids.insert(step.clone(), id.clone());
        nodes.insert(id, step.clone());

        // Reversed so the first declared input is explored first.
        stack.extend(step.upstream().rev().cloned());
    }

    // Every referenced step was pushed and therefore assigned an id above.
    let edges: IndexMap<String, IndexSet<String>> = nodes
        .iter()
        .filter_map(|(id, step)| {
            let deps: IndexSet<String> = step
                .upstream()
                .filter_map(|upstream| ids.get(upstream).cloned())
                .collect();
            (!deps.is_empty()).then(|| (id.clone(), deps))
        })
        .collect();

    let terminal = ids.get(terminal).cloned().unwrap_or_default();
    log::debug!(
        "Collected {} steps ({} with dependencies) from terminal step '{terminal}'",
        nodes.len(),
        edges.len()
    );

    FlowGraph {
        terminal,
        nodes,
        edges,
        ids,
    }
}

fn assign_id(
    name: &str,
    nodes: &IndexMap<String, Step>,
    name_counts: &mut HashMap<String, usize>,
) -> String {
    let count = name_counts.entry(name.to_string()).or_insert(0);
    loop {
        *count += 1;
        let candidate = if *count == 1 {
            name.to_string()
        } else {
            format!("{name}_{count}")
        };
        if !nodes.contains_key(&candidate) {
            if *count > 1 {
                log::debug!("Step id '{name}' is used by another step; using '{candidate}'");
            }
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepgraph_core::{StepFn, call};

    fn no_params(name: &str) -> StepFn {
        StepFn::new(name, Vec::<String>::new())
    }

    fn edge_list(graph: &FlowGraph) -> Vec<(String, Vec<String>)> {
        graph
            .edges()
            .iter()
            .map(|(id, deps)| (id.clone(), deps.iter().cloned().collect()))
            .collect()
    }

    #[test]
    fn test_dependency_completeness() {
        let d = no_params("d");
        let a = StepFn::new("a", ["x"]);
        let b = StepFn::new("b", ["n"]);
        let c = StepFn::new("c", ["x", "y"]);

        let r_a = call!(a, call!(d).unwrap()).unwrap();
        let r_b = call!(b, 2).unwrap();
        let r_c = call!(c, r_a, r_b).unwrap();

        let graph = collect(&r_c);
        let mut ids: Vec<&str> = graph.nodes().keys().map(String::as_str).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(
            edge_list(&graph),
            vec![
                ("c".to_string(), vec!["a".to_string(), "b".to_string()]),
                ("a".to_string(), vec!["d".to_string()]),
            ]
        );
        assert_eq!(graph.dependencies("b").count(), 0);
        assert_eq!(graph.terminal(), "c");
    }

    #[test]
    fn test_diamond_visits_shared_step_once() {
        let d = no_params("d");
        let a = StepFn::new("a", ["x"]);
        let b = StepFn::new("b", ["x"]);
        let c = StepFn::new("c", ["x", "y"]);

        let r_d = call!(d).unwrap();
        let r_c = call!(
            c,
            call!(a, &r_d).unwrap(),
            call!(b, r_d.at("field")).unwrap()
        )
        .unwrap();

        let graph = collect(&r_c);
        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.nodes().keys().filter(|id| id.starts_with('d')).count(),
            1
        );
        assert_eq!(graph.node_id(&r_d), Some("d"));
        assert_eq!(graph.dependencies("a").collect::<Vec<_>>(), vec!["d"]);
        assert_eq!(graph.dependencies("b").collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn test_repeated_reference_produces_single_edge() {
        let d = no_params("d");
        let c = StepFn::new("c", ["x", "y"]);

        let r_d = call!(d).unwrap();
        let r_c = call!(c, r_d.at("left"), r_d.at("right")).unwrap();

        let graph = collect(&r_c);
        assert_eq!(graph.dependencies("c").collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn test_same_name_distinct_steps_get_unique_ids() {
        let a = StepFn::new("a", ["x"]);
        let inner = call!(a, 1).unwrap();
        let outer = call!(a, &inner).unwrap();

        let graph = collect(&outer);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.node_id(&outer), Some("a"));
        assert_eq!(graph.node_id(&inner), Some("a_2"));
        assert_eq!(graph.dependencies("a").collect::<Vec<_>>(), vec!["a_2"]);
    }

    #[test]
    fn test_generated_id_skips_taken_names() {
        let a = StepFn::new("a", ["x"]);
        let a_2 = StepFn::new("a_2", ["x"]);
        let join = StepFn::new("join", ["x", "y", "z"]);

        let first = call!(a, 1).unwrap();
        let explicit = call!(a_2, 2).unwrap();
        let second = call!(a, 3).unwrap();
        let terminal = call!(join, &first, &explicit, &second).unwrap();

        let graph = collect(&terminal);
        assert_eq!(graph.node_id(&first), Some("a"));
        assert_eq!(graph.node_id(&explicit), Some("a_2"));
        assert_eq!(graph.node_id(&second), Some("a_3"));
    }

    #[test]
    fn test_closure_property() {
        let d = no_params("d");
        let a = StepFn::new("a", ["x"]);
        let c = StepFn::new("c", ["x", "y"]);

        let r_d = call!(d).unwrap();
        let r_c = call!(c, call!(a, &r_d).unwrap(), r_d.index(0)).unwrap();

        let graph = collect(&r_c);
        for deps in graph.edges().values() {
            for dep in deps {
                assert!(graph.node(dep).is_some(), "missing node {dep}");
            }
        }
    }

    #[test]
    fn test_single_step() {
        let d = no_params("d");
        let graph = collect(&call!(d).unwrap());
        assert_eq!(graph.len(), 1);
        assert!(graph.edges().is_empty());
        assert_eq!(graph.schedule().unwrap(), vec!["d"]);
    }
}
