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

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::{Input, JsonPath, Reference, StepFn};

/// A deferred unit of work in a flow.
///
/// A step records which implementation to run and the inputs bound to its
/// parameters. It is created by calling a [`StepFn`] and is never executed
/// here. Cloning a `Step` yields another handle to the same node; identity
/// (not the id string) is what distinguishes two steps.
#[derive(Clone)]
pub struct Step(Arc<StepInner>);

struct StepInner {
    inputs: IndexMap<String, Input>,
    implementation: StepFn,
}

impl Step {
    pub(crate) fn new(implementation: StepFn, inputs: IndexMap<String, Input>) -> Self {
        Self(Arc::new(StepInner {
            inputs,
            implementation,
        }))
    }

    /// Identifier of the step, taken from the implementation name.
    ///
    /// Not unique: two calls of the same implementation share it.
    pub fn id(&self) -> &str {
        self.0.implementation.name()
    }

    /// The inputs bound to this step, in parameter declaration order.
    pub fn inputs(&self) -> &IndexMap<String, Input> {
        &self.0.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.0.inputs.get(name)
    }

    pub fn implementation(&self) -> &StepFn {
        &self.0.implementation
    }

    /// Reference the whole output of this step.
    pub fn whole(&self) -> Reference {
        Reference::whole(self.clone())
    }

    /// Reference a field of this step's output.
    pub fn at(&self, name: impl Into<String>) -> Reference {
        Reference::new(self.clone(), JsonPath::new().with_field(name))
    }

    /// Reference an element of this step's (array) output.
    pub fn index(&self, index: usize) -> Reference {
        Reference::new(self.clone(), JsonPath::new().with_index(index))
    }

    /// Steps referenced by the inputs, in input order, with repeats.
    pub fn upstream(&self) -> impl DoubleEndedIterator<Item = &Step> + '_ {
        self.0.inputs.values().filter_map(Input::step)
    }

    /// Whether `self` and `other` are handles to the same node.
    pub fn same_as(&self, other: &Step) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable key for identity-based maps within one flow build.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Step {}

impl std::hash::Hash for Step {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.id())?;
        for (index, (name, input)) in self.0.inputs.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={input}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id())
            .field("inputs", &self.0.inputs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{StepFn, call};

    #[test]
    fn test_step_display() {
        let d = StepFn::new("d", Vec::<String>::new());
        let a = StepFn::new("a", ["x", "scale"]);

        let r_d = call!(d).unwrap();
        let r_a = call!(a, r_d.at("rows"), 3).unwrap();

        assert_eq!(r_d.to_string(), "d()");
        assert_eq!(r_a.to_string(), "a(x=ref(d, $.rows), scale=3)");
    }

    #[test]
    fn test_identity_not_id() {
        let d = StepFn::new("d", Vec::<String>::new());
        let first = call!(d).unwrap();
        let second = call!(d).unwrap();

        assert_eq!(first.id(), second.id());
        assert!(!first.same_as(&second));
        assert!(first.same_as(&first.clone()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_upstream_lists_only_references() {
        let d = StepFn::new("d", Vec::<String>::new());
        let b = StepFn::new("b", ["n"]);
        let c = StepFn::new("c", ["x", "y", "z"]);

        let r_d = call!(d).unwrap();
        let r_b = call!(b, 2).unwrap();
        let r_c = call!(c, &r_d, "literal", r_b.at("out")).unwrap();

        let upstream: Vec<&str> = r_c.upstream().map(|s| s.id()).collect();
        assert_eq!(upstream, vec!["d", "b"]);
        assert!(r_b.upstream().next().is_none());
    }
}
