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

use error_stack::report;
use indexmap::IndexMap;

use crate::{FlowError, Input, Result, Step};

/// Lazily supplies the source text of a step implementation.
pub type SourceFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Clone)]
enum StepSource {
    Text(Arc<str>),
    Lazy(SourceFn),
}

/// A step implementation that can be called to create [`Step`]s.
///
/// Calling a `StepFn` does not run it: the arguments are bound to the declared
/// parameters and captured in a new `Step`. The implementation's source is
/// registered up front and only read when the flow is rendered.
///
/// Clones share identity. Two `StepFn`s created separately are different
/// implementations even if their names match.
#[derive(Clone)]
pub struct StepFn(Arc<StepFnInner>);

struct StepFnInner {
    name: String,
    params: Vec<String>,
    source: Option<StepSource>,
}

impl StepFn {
    /// Declare an implementation with the given name and parameter names.
    pub fn new<S: Into<String>>(name: impl Into<String>, params: impl IntoIterator<Item = S>) -> Self {
        Self(Arc::new(StepFnInner {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            source: None,
        }))
    }

    /// Register the source text of the implementation.
    ///
    /// Returns a new implementation; steps created from `self` before this
    /// call are not affected.
    pub fn with_source(self, source: impl Into<Arc<str>>) -> Self {
        self.with(StepSource::Text(source.into()))
    }

    /// Register a function producing the source text on demand.
    pub fn with_source_fn(
        self,
        source: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.with(StepSource::Lazy(Arc::new(source)))
    }

    fn with(self, source: StepSource) -> Self {
        Self(Arc::new(StepFnInner {
            name: self.0.name.clone(),
            params: self.0.params.clone(),
            source: Some(source),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn params(&self) -> &[String] {
        &self.0.params
    }

    pub fn has_source(&self) -> bool {
        self.0.source.is_some()
    }

    /// Retrieve the registered source, if any.
    pub fn load_source(&self) -> Option<String> {
        match self.0.source.as_ref()? {
            StepSource::Text(text) => Some(text.to_string()),
            StepSource::Lazy(source) => source(),
        }
    }

    pub fn same_as(&self, other: &StepFn) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Create a step with positional arguments only.
    pub fn call(&self, args: Vec<Input>) -> Result<Step> {
        self.call_with(args, Vec::<(String, Input)>::new())
    }

    /// Create a step from positional and keyword arguments.
    ///
    /// Positional arguments bind to parameters in declaration order. The
    /// resulting inputs are ordered by parameter declaration; parameters left
    /// unbound are omitted. An implementation declaring the same parameter
    /// twice cannot be called.
    pub fn call_with<K: Into<String>>(
        &self,
        args: Vec<Input>,
        kwargs: impl IntoIterator<Item = (K, Input)>,
    ) -> Result<Step> {
        let params = self.params();
        if let Some((position, repeated)) = params
            .iter()
            .enumerate()
            .find(|(position, param)| params[..*position].contains(*param))
        {
            return Err(report!(FlowError::DuplicateParameter {
                step: self.name().to_string(),
                parameter: repeated.clone(),
            })
            .attach_printable(format!("repeated at position {position}")));
        }
        if args.len() > params.len() {
            return Err(report!(FlowError::TooManyArguments {
                step: self.name().to_string(),
                expected: params.len(),
                given: args.len(),
            }));
        }

        let mut slots: Vec<Option<Input>> = args.into_iter().map(Some).collect();
        slots.resize(params.len(), None);

        for (key, value) in kwargs {
            let key = key.into();
            let Some(position) = params.iter().position(|p| *p == key) else {
                return Err(report!(FlowError::UnknownParameter {
                    step: self.name().to_string(),
                    parameter: key,
                })
                .attach_printable(format!("declared parameters: {params:?}")));
            };
            if slots[position].is_some() {
                return Err(report!(FlowError::DuplicateArgument {
                    step: self.name().to_string(),
                    parameter: key,
                }));
            }
            slots[position] = Some(value);
        }

        let inputs: IndexMap<String, Input> = params
            .iter()
            .zip(slots)
            .filter_map(|(param, slot)| slot.map(|input| (param.clone(), input)))
            .collect();

        log::trace!("Captured step '{}' with {} inputs", self.name(), inputs.len());
        Ok(Step::new(self.clone(), inputs))
    }
}

impl PartialEq for StepFn {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for StepFn {}

impl std::hash::Hash for StepFn {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for StepFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepFn")
            .field("name", &self.0.name)
            .field("params", &self.0.params)
            .field("has_source", &self.has_source())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::call;

    #[test]
    fn test_positional_binding() {
        let c = StepFn::new("c", ["x", "y"]);
        let step = call!(c, 1, "two").unwrap();

        let names: Vec<&str> = step.inputs().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(step.input("y"), Some(&Input::from("two")));
        assert_eq!(step.id(), "c");
        assert!(step.implementation().same_as(&c));
    }

    #[test]
    fn test_keyword_binding_follows_declaration_order() {
        let c = StepFn::new("c", ["x", "y", "z"]);
        let step = call!(c, 1; z = 3, y = 2).unwrap();

        let names: Vec<&str> = step.inputs().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_unbound_parameters_are_omitted() {
        let c = StepFn::new("c", ["x", "y"]);
        let step = call!(c; y = 2).unwrap();
        assert_eq!(step.inputs().len(), 1);
        assert!(step.input("x").is_none());
    }

    #[test]
    fn test_too_many_arguments() {
        let b = StepFn::new("b", ["n"]);
        let err = call!(b, 1, 2).unwrap_err();
        assert_eq!(
            err.current_context(),
            &FlowError::TooManyArguments {
                step: "b".to_string(),
                expected: 1,
                given: 2,
            }
        );
    }

    #[test]
    fn test_unknown_and_duplicate_keywords() {
        let b = StepFn::new("b", ["n"]);

        let err = call!(b; m = 1).unwrap_err();
        assert!(matches!(
            err.current_context(),
            FlowError::UnknownParameter { parameter, .. } if parameter == "m"
        ));

        let err = call!(b, 1; n = 2).unwrap_err();
        assert!(matches!(
            err.current_context(),
            FlowError::DuplicateArgument { parameter, .. } if parameter == "n"
        ));
    }

    #[test]
    fn test_repeated_parameter_is_rejected() {
        let c = StepFn::new("c", ["x", "y", "x"]);
        let err = call!(c, 1, 2, 3).unwrap_err();
        assert_eq!(
            err.current_context(),
            &FlowError::DuplicateParameter {
                step: "c".to_string(),
                parameter: "x".to_string(),
            }
        );
        assert!(call!(c).is_err());
    }

    #[test]
    fn test_calling_does_not_load_source() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let d = StepFn::new("d", Vec::<String>::new()).with_source_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("def d():\n    return 1\n".to_string())
        });

        let _ = call!(d).unwrap();
        let _ = call!(d).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        assert!(d.load_source().is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_source_creates_new_implementation() {
        let plain = StepFn::new("d", Vec::<String>::new());
        let sourced = plain.clone().with_source("def d():\n    pass\n");

        assert!(!plain.has_source());
        assert!(sourced.has_source());
        assert!(!plain.same_as(&sourced));
        assert_eq!(sourced.load_source().as_deref(), Some("def d():\n    pass\n"));
    }
}
