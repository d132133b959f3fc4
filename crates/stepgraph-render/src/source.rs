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
use std::sync::Arc;

use error_stack::report;
use stepgraph_core::StepFn;

use crate::{RenderError, Result};

/// Tabs advance to the next multiple of this width, as in Python.
const TAB_SIZE: usize = 8;

/// Extracts standalone source for step implementations.
///
/// Each distinct implementation is loaded and processed once; later requests
/// for the same implementation are served from the cache.
pub struct SourceExtractor {
    entrypoint: Option<String>,
    cache: HashMap<StepFn, Arc<str>>,
}

impl SourceExtractor {
    /// Create an extractor. If `entrypoint` is set, extracted functions are
    /// renamed to it.
    pub fn new(entrypoint: Option<String>) -> Self {
        Self {
            entrypoint,
            cache: HashMap::new(),
        }
    }

    pub fn extract(&mut self, implementation: &StepFn) -> Result<Arc<str>> {
        if let Some(content) = self.cache.get(implementation) {
            log::trace!("Reusing extracted source for '{}'", implementation.name());
            return Ok(content.clone());
        }

        let step = implementation.name();
        let source = match implementation.load_source() {
            Some(source) if !source.trim().is_empty() => source,
            Some(_) => {
                return Err(report!(RenderError::SourceUnavailable {
                    step: step.to_string()
                })
                .attach_printable("registered source is empty"));
            }
            None => {
                return Err(report!(RenderError::SourceUnavailable {
                    step: step.to_string()
                })
                .attach_printable("no source registered for this implementation"));
            }
        };

        let content: Arc<str> = standalone_source(step, &source, self.entrypoint.as_deref())?.into();
        log::debug!("Extracted {} lines of source for '{step}'", content.lines().count());
        self.cache.insert(implementation.clone(), content.clone());
        Ok(content)
    }

    /// Number of distinct implementations extracted so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Turn the source of function `name` into a standalone definition.
///
/// Leading decorators are dropped, the definition and its body are
/// de-indented, and anything after the end of the function body is ignored.
/// With `entrypoint` set, the function is renamed to it; if the body refers to
/// the original name, an alias binding that name is appended.
pub fn standalone_source(name: &str, source: &str, entrypoint: Option<&str>) -> Result<String> {
    let missing_definition = || {
        report!(RenderError::MissingDefinition {
            step: name.to_string()
        })
    };
    let malformed = |reason: &str| {
        report!(RenderError::MalformedSource {
            step: name.to_string()
        })
        .attach_printable(reason.to_string())
    };

    let lines: Vec<&str> = source.lines().collect();
    let mut index = 0;

    // Skip blank lines and decorators, including decorators spanning lines.
    loop {
        let Some(line) = lines.get(index) else {
            return Err(missing_definition());
        };
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            index += 1;
        } else if trimmed.starts_with('@') {
            let mut scanner = LineScanner::default();
            scanner.scan(trimmed);
            index += 1;
            while scanner.is_open() && index < lines.len() {
                scanner.scan(lines[index]);
                index += 1;
            }
        } else {
            break;
        }
    }

    let def_line = lines[index];
    let indent = indentation(def_line);
    let header = def_line.trim_start();
    let (prefix, after_def) = if let Some(rest) = header.strip_prefix("async def ") {
        ("async def ", rest)
    } else if let Some(rest) = header.strip_prefix("def ") {
        ("def ", rest)
    } else {
        return Err(missing_definition().attach_printable(format!("found: {header}")));
    };

    let after_def = after_def.trim_start();
    let found: String = after_def
        .chars()
        .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
        .collect();
    let signature = &after_def[found.len()..];
    if found.is_empty() || !signature.trim_start().starts_with('(') {
        return Err(missing_definition().attach_printable(format!("found: {header}")));
    }
    if found != name {
        return Err(report!(RenderError::NameMismatch {
            step: name.to_string(),
            found,
        }));
    }

    let mut output = vec![format!("{prefix}{}{signature}", entrypoint.unwrap_or(name))];

    // The signature may continue over several lines.
    let mut scanner = LineScanner::default();
    let mut code = scanner.scan(header);
    index += 1;
    while scanner.is_open() && index < lines.len() {
        output.push(dedent(lines[index], indent));
        code = scanner.scan(lines[index]);
        index += 1;
    }
    if scanner.is_open() || scanner.is_malformed() {
        return Err(malformed("signature is not closed"));
    }
    let expects_body = code.trim_end().ends_with(':');

    let mut body_lines = 0;
    while index < lines.len() {
        let line = lines[index];
        if scanner.is_open() {
            // Continuation of a string or bracket; its indentation is free.
            output.push(if indentation(line) >= indent {
                dedent(line, indent)
            } else {
                line.to_string()
            });
        } else if line.trim().is_empty() {
            output.push(String::new());
        } else if indentation(line) > indent {
            output.push(dedent(line, indent));
            body_lines += 1;
        } else {
            break;
        }
        scanner.scan(line);
        index += 1;
    }

    if scanner.is_open() || scanner.is_malformed() {
        return Err(malformed(
            "unterminated string or unbalanced brackets in function body",
        ));
    }
    if expects_body && body_lines == 0 {
        return Err(report!(RenderError::MissingBody {
            step: name.to_string()
        }));
    }
    if index < lines.len() {
        log::debug!(
            "Ignoring {} source lines after the definition of '{name}'",
            lines.len() - index
        );
    }

    while output.last().is_some_and(|line| line.is_empty()) {
        output.pop();
    }
    if let Some(entrypoint) = entrypoint.filter(|entrypoint| *entrypoint != name)
        && output[1..].iter().any(|line| mentions(line, name))
    {
        // Keeps recursive calls working after the rename.
        output.push(String::new());
        output.push(format!("{name} = {entrypoint}"));
    }

    let mut content = output.join("\n");
    content.push('\n');
    Ok(content)
}

/// Whether `name` occurs in `line` as a whole identifier.
fn mentions(line: &str, name: &str) -> bool {
    let is_ident = |ch: char| ch.is_alphanumeric() || ch == '_';
    line.match_indices(name).any(|(start, _)| {
        let end = start + name.len();
        !line[..start].chars().next_back().is_some_and(is_ident)
            && !line[end..].chars().next().is_some_and(is_ident)
    })
}

#[derive(Debug, Clone, Copy)]
struct OpenString {
    quote: u8,
    triple: bool,
}

/// Tracks brackets and string literals across the lines of Python source.
#[derive(Debug, Default)]
struct LineScanner {
    depth: isize,
    string: Option<OpenString>,
    malformed: bool,
}

impl LineScanner {
    /// Inside a string literal or an unclosed bracket.
    fn is_open(&self) -> bool {
        self.depth > 0 || self.string.is_some()
    }

    /// Saw an unterminated single-line string or an unmatched closing bracket.
    fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// Scan one line, returning it without any trailing comment.
    fn scan<'a>(&mut self, line: &'a str) -> &'a str {
        let bytes = line.as_bytes();
        let mut i = 0;
        let mut code_end = bytes.len();
        while i < bytes.len() {
            let byte = bytes[i];
            match self.string {
                Some(open) => {
                    if byte == b'\\' {
                        i += 1;
                    } else if byte == open.quote {
                        if !open.triple {
                            self.string = None;
                        } else if bytes[i..].starts_with(&[byte; 3]) {
                            self.string = None;
                            i += 2;
                        }
                    }
                }
                None => match byte {
                    b'#' => {
                        code_end = i;
                        break;
                    }
                    b'"' | b'\'' => {
                        let triple = bytes[i..].starts_with(&[byte; 3]);
                        self.string = Some(OpenString {
                            quote: byte,
                            triple,
                        });
                        if triple {
                            i += 2;
                        }
                    }
                    b'(' | b'[' | b'{' => self.depth += 1,
                    b')' | b']' | b'}' => {
                        self.depth -= 1;
                        if self.depth < 0 {
                            self.malformed = true;
                            self.depth = 0;
                        }
                    }
                    _ => {}
                },
            }
            i += 1;
        }

        // Single-quoted strings end with the line unless it ends in a backslash.
        if let Some(open) = self.string
            && !open.triple
            && !line.ends_with('\\')
        {
            self.string = None;
            self.malformed = true;
        }
        &line[..code_end]
    }
}

/// Width of the leading whitespace of `line`.
fn indentation(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
            _ => break,
        }
    }
    width
}

/// Remove `width` columns of leading whitespace from `line`.
fn dedent(line: &str, width: usize) -> String {
    let mut column = 0;
    for (offset, ch) in line.char_indices() {
        if column >= width {
            return format!("{}{}", " ".repeat(column - width), &line[offset..]);
        }
        match ch {
            ' ' => column += 1,
            '\t' => column = (column / TAB_SIZE + 1) * TAB_SIZE,
            _ => return line[offset..].to_string(),
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_strips_decorator_and_indentation() {
        let source = r#"
    @step
    def d():
        rows = [1, 2, 3]
        return {"rows": rows}
"#;
        let content = standalone_source("d", source, None).unwrap();
        insta::assert_snapshot!(content, @r###"
        def d():
            rows = [1, 2, 3]
            return {"rows": rows}
        "###);
    }

    #[test]
    fn test_multi_line_decorator_and_signature() {
        let source = r#"
        @step(
            retries=3,
        )
        async def fetch(
            url: str,
            timeout: int = 10,
        ) -> dict:
            # fetch the page
            return {"url": url}

        result = fetch("x")
"#;
        let content = standalone_source("fetch", source, Some("main")).unwrap();
        similar_asserts::assert_eq!(
            content,
            "async def main(\n    url: str,\n    timeout: int = 10,\n) -> dict:\n    # fetch the page\n    return {\"url\": url}\n"
        );
    }

    #[test]
    fn test_keeps_inner_blank_lines_and_nested_blocks() {
        let source = "def a(x):\n    if x:\n\n        return 1\n    return 0\n\n\n";
        let content = standalone_source("a", source, None).unwrap();
        assert_eq!(
            content,
            "def a(x):\n    if x:\n\n        return 1\n    return 0\n"
        );
    }

    #[test]
    fn test_tabs_are_expanded() {
        let source = "\tdef a():\n\t    return 1\n";
        let content = standalone_source("a", source, None).unwrap();
        assert_eq!(content, "def a():\n    return 1\n");
    }

    #[test]
    fn test_one_line_function() {
        let content = standalone_source("b", "  def b(n): return n * 2\n", Some("main")).unwrap();
        assert_eq!(content, "def main(n): return n * 2\n");
    }

    #[test]
    fn test_source_errors() {
        let err = standalone_source("a", "x = 1\n", None).unwrap_err();
        assert_eq!(
            err.current_context(),
            &RenderError::MissingDefinition {
                step: "a".to_string()
            }
        );

        let err = standalone_source("a", "@step\n", None).unwrap_err();
        assert!(matches!(
            err.current_context(),
            RenderError::MissingDefinition { .. }
        ));

        let err = standalone_source("a", "def b():\n    pass\n", None).unwrap_err();
        assert_eq!(
            err.current_context(),
            &RenderError::NameMismatch {
                step: "a".to_string(),
                found: "b".to_string()
            }
        );

        let err = standalone_source("a", "def a():\nx = 1\n", None).unwrap_err();
        assert_eq!(
            err.current_context(),
            &RenderError::MissingBody {
                step: "a".to_string()
            }
        );
    }

    #[test]
    fn test_triple_quoted_string_does_not_end_body() {
        let source = r#"
    @step
    def d():
        text = """
header
  # not a comment
"""
        rows = [
1, 2,
        ]
        return text, rows

result = d()
"#;
        let content = standalone_source("d", source, None).unwrap();
        similar_asserts::assert_eq!(
            content,
            "def d():\n    text = \"\"\"\nheader\n  # not a comment\n\"\"\"\n    rows = [\n1, 2,\n    ]\n    return text, rows\n"
        );
    }

    #[test]
    fn test_hash_and_brackets_inside_strings() {
        let source = "def d(sep=\"#\"):\n    return sep  # separator\n\nresult = d()\nprint(result)\n";
        let content = standalone_source("d", source, None).unwrap();
        assert_eq!(content, "def d(sep=\"#\"):\n    return sep  # separator\n");

        let source = "@step(name=\"[\")\ndef d(open=\"(\", close=')'):\n    return open + close\n\nresult = d()\n";
        let content = standalone_source("d", source, None).unwrap();
        assert_eq!(content, "def d(open=\"(\", close=')'):\n    return open + close\n");

        let source = "def d():\n    return 'it\\'s ('\n\nresult = d()\n";
        let content = standalone_source("d", source, None).unwrap();
        assert_eq!(content, "def d():\n    return 'it\\'s ('\n");
    }

    #[test]
    fn test_unterminated_source_is_an_error() {
        let malformed = |source: &str| {
            let err = standalone_source("d", source, None).unwrap_err();
            assert_eq!(
                err.current_context(),
                &RenderError::MalformedSource {
                    step: "d".to_string()
                },
                "source: {source:?}"
            );
        };

        malformed("def d():\n    text = \"\"\"\n    never closed\n");
        malformed("def d(x,\n      y=\")\"\n");
        malformed("def d():\n    return 'oops\n");
        malformed("def d():\n    return x)\n");
    }

    #[test]
    fn test_recursive_function_keeps_its_name() {
        let source = "def fact(n):\n    return 1 if n <= 1 else n * fact(n - 1)\n";
        let content = standalone_source("fact", source, Some("main")).unwrap();
        assert_eq!(
            content,
            "def main(n):\n    return 1 if n <= 1 else n * fact(n - 1)\n\nfact = main\n"
        );

        let source = "def f(x):\n    return f_x(x)\n";
        let content = standalone_source("f", source, Some("main")).unwrap();
        assert_eq!(content, "def main(x):\n    return f_x(x)\n");

        let content = standalone_source("fact", "def fact(n):\n    return fact\n", None).unwrap();
        assert_eq!(content, "def fact(n):\n    return fact\n");
    }

    #[test]
    fn test_missing_source() {
        let mut extractor = SourceExtractor::new(None);

        let unregistered = StepFn::new("d", Vec::<String>::new());
        let err = extractor.extract(&unregistered).unwrap_err();
        assert_eq!(
            err.current_context(),
            &RenderError::SourceUnavailable {
                step: "d".to_string()
            }
        );

        let empty = StepFn::new("d", Vec::<String>::new()).with_source("  \n");
        assert!(matches!(
            extractor.extract(&empty).unwrap_err().current_context(),
            RenderError::SourceUnavailable { .. }
        ));

        let lazy = StepFn::new("d", Vec::<String>::new()).with_source_fn(|| None);
        assert!(extractor.extract(&lazy).is_err());
        assert_eq!(extractor.cached(), 0);
    }

    #[test]
    fn test_extraction_is_cached_per_implementation() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let d = StepFn::new("d", Vec::<String>::new()).with_source_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("def d():\n    return 1\n".to_string())
        });
        let other = StepFn::new("d", Vec::<String>::new()).with_source("def d():\n    return 2\n");

        let mut extractor = SourceExtractor::new(Some("main".to_string()));
        let first = extractor.extract(&d).unwrap();
        let second = extractor.extract(&d.clone()).unwrap();
        let third = extractor.extract(&other).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(&*first, "def main():\n    return 1\n");
        assert_eq!(&*third, "def main():\n    return 2\n");
        assert_eq!(extractor.cached(), 2);
    }
}
