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

use crate::{JsonPath, Step};

/// A symbolic handle to (part of) the eventual output of a [`Step`].
///
/// References are immutable. [`Reference::at`] and [`Reference::index`]
/// return a new, deeper reference over the same step.
#[derive(Clone, PartialEq)]
pub struct Reference {
    target: Step,
    path: JsonPath,
}

impl Reference {
    pub fn new(target: Step, path: JsonPath) -> Self {
        Self { target, path }
    }

    /// A reference to the whole output of `target`.
    pub fn whole(target: Step) -> Self {
        Self::new(target, JsonPath::new())
    }

    pub fn target(&self) -> &Step {
        &self.target
    }

    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// Access a field of the referenced value.
    pub fn at(&self, name: impl Into<String>) -> Reference {
        Self::new(self.target.clone(), self.path.with_field(name))
    }

    /// Access an element of the referenced array.
    pub fn index(&self, index: usize) -> Reference {
        Self::new(self.target.clone(), self.path.with_index(index))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref({}, {})", self.target.id(), self.path)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("target", &self.target.id())
            .field("path", &self.path.to_string())
            .finish()
    }
}
