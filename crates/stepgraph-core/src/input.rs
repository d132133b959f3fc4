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

use crate::{JsonPath, Reference, Step, ValueRef};

/// A value bound to a step parameter.
///
/// Either a concrete literal, or a [`Reference`] into the output of another
/// step that will only exist once the flow runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Literal(ValueRef),
    Ref(Reference),
}

impl Input {
    pub fn literal(value: impl Into<ValueRef>) -> Self {
        Self::Literal(value.into())
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Ref(reference) => Some(reference),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&ValueRef> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Ref(_) => None,
        }
    }

    /// The step this input depends on, if any.
    pub fn step(&self) -> Option<&Step> {
        self.as_reference().map(Reference::target)
    }

    pub fn path(&self) -> Option<&JsonPath> {
        self.as_reference().map(Reference::path)
    }
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Ref(reference) => write!(f, "{reference}"),
        }
    }
}

// A step used directly as an argument stands for its whole output.
impl From<Step> for Input {
    fn from(step: Step) -> Self {
        Self::Ref(Reference::whole(step))
    }
}

impl From<&Step> for Input {
    fn from(step: &Step) -> Self {
        Self::Ref(Reference::whole(step.clone()))
    }
}

impl From<Reference> for Input {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

impl From<&Reference> for Input {
    fn from(reference: &Reference) -> Self {
        Self::Ref(reference.clone())
    }
}

impl From<ValueRef> for Input {
    fn from(value: ValueRef) -> Self {
        Self::Literal(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Input {
                fn from(value: $ty) -> Self {
                    Self::Literal(ValueRef::from(value))
                }
            }
        )*
    };
}

literal_from!(
    serde_json::Value,
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    String,
    &str,
);
