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

//! Symbolic building blocks for declaratively defined flows.
//!
//! Calling a [`StepFn`] never runs anything. It captures the arguments and
//! returns a [`Step`], a node in a graph that is later collected, ordered and
//! rendered into a step list for an external engine.
//!
//! ```
//! use stepgraph_core::{StepFn, call};
//!
//! let d = StepFn::new("d", Vec::<String>::new());
//! let a = StepFn::new("a", ["x"]);
//! let b = StepFn::new("b", ["n"]);
//! let c = StepFn::new("c", ["left", "right"]);
//!
//! let r_a = call!(a, call!(d).unwrap()).unwrap();
//! let r_b = call!(b, 2).unwrap();
//! let r_c = call!(c, r_a.at("items"), r_b).unwrap();
//! assert_eq!(r_c.id(), "c");
//! ```

mod error;
mod input;
mod json_path;
mod macros;
mod reference;
mod step;
mod step_fn;
pub mod values;

pub use error::{FlowError, Result};
pub use input::Input;
pub use json_path::{JsonPath, PathPart};
pub use reference::Reference;
pub use step::Step;
pub use step_fn::{SourceFn, StepFn};
pub use values::ValueRef;
