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

/// Call a [`StepFn`](crate::StepFn), converting each argument with
/// [`Input::from`](crate::Input).
///
/// Positional arguments come first; keyword arguments follow a `;`.
///
/// ```
/// use stepgraph_core::{StepFn, call};
///
/// let fetch = StepFn::new("fetch", ["url", "retries"]);
/// let step = call!(fetch, "https://example.com"; retries = 3).unwrap();
/// assert_eq!(step.inputs().len(), 2);
/// ```
#[macro_export]
macro_rules! call {
    ($f:expr $(, $arg:expr)* ; $($key:ident = $value:expr),+ $(,)?) => {
        $f.call_with(
            ::std::vec![$($crate::Input::from($arg)),*],
            [$((::std::stringify!($key), $crate::Input::from($value))),+],
        )
    };
    ($f:expr $(, $arg:expr)*) => {
        $f.call(::std::vec![$($crate::Input::from($arg)),*])
    };
}
