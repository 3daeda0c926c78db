//! `!code` macros.
//!
//! A line like `// !code helpers/sum.js` in a code file pulls in the
//! contents of `__lib/helpers/sum.js` when the directory is loaded. The
//! inlined text is wrapped in begin/end marker lines naming the fragment,
//! so writing the document back out can fold the block into the directive
//! again. Only code files go through here, never JSON.

use crate::error::{DirectoryError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory (under the design root) holding shared fragments.
pub const LIB_DIR: &str = "__lib";

static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*//\s*!code\s+(\S+)\s*$").expect("valid directive regex"));

static BEGIN_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*// !begin code (\S+)\s*$").expect("valid begin regex"));

static END_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*// !end code (\S+)\s*$").expect("valid end regex"));

/// The directive line for a fragment, without a line terminator.
pub fn directive(path: &str) -> String {
    format!("// !code {}", path)
}

pub fn begin_marker(path: &str) -> String {
    format!("// !begin code {}", path)
}

pub fn end_marker(path: &str) -> String {
    format!("// !end code {}", path)
}

/// Returns the fragment path if `line` is a `!code` directive.
pub fn directive_path(line: &str) -> Option<&str> {
    capture(&DIRECTIVE, line)
}

fn capture<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    regex
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Expands `!code` directives against a `__lib` directory.
#[derive(Debug, Clone)]
pub struct MacroExpander {
    lib_root: PathBuf,
}

impl MacroExpander {
    /// Creates an expander reading fragments from `<root>/__lib`.
    pub fn new(root: &Path) -> Self {
        Self {
            lib_root: root.join(LIB_DIR),
        }
    }

    /// Reads a fragment by its path relative to `__lib`.
    pub fn read_from_lib(&self, path: &str) -> Result<String> {
        let full = self.lib_root.join(path);
        fs::read_to_string(&full).map_err(|source| DirectoryError::MissingLibrary {
            path: full,
            source,
        })
    }

    /// Expands a single line (terminator included, if any).
    ///
    /// Lines that aren't directives come back unchanged.
    pub fn expand_line(&self, line: &str) -> Result<String> {
        let Some(path) = directive_path(line) else {
            return Ok(line.to_string());
        };

        debug!("Expanding !code {}", path);
        let body = self.read_from_lib(path)?;

        let mut expanded = String::with_capacity(body.len() + 2 * path.len() + 40);
        expanded.push_str(&begin_marker(path));
        expanded.push('\n');
        expanded.push_str(&body);
        if !body.is_empty() && !body.ends_with('\n') {
            expanded.push('\n');
        }
        expanded.push_str(&end_marker(path));
        expanded.push('\n');
        Ok(expanded)
    }

    /// Expands every directive in `source`, line by line.
    pub fn expand(&self, source: &str) -> Result<String> {
        source
            .split_inclusive('\n')
            .map(|line| self.expand_line(line))
            .collect()
    }
}

/// Folds expanded blocks back into `!code` directives.
///
/// Repeatedly takes the first begin marker that has a later end marker for
/// the same fragment and replaces that whole span with the directive. A
/// begin marker with no matching end marker is left alone.
pub fn contract(source: &str) -> String {
    let mut lines: Vec<String> = source.split_inclusive('\n').map(str::to_owned).collect();

    while let Some((start, end, path)) = find_block(&lines) {
        let mut replacement = directive(&path);
        if lines[end].ends_with('\n') {
            replacement.push('\n');
        }
        lines.splice(start..=end, std::iter::once(replacement));
    }

    lines.concat()
}

fn find_block(lines: &[String]) -> Option<(usize, usize, String)> {
    lines.iter().enumerate().find_map(|(start, line)| {
        let path = capture(&BEGIN_MARKER, line)?;
        let offset = lines[start + 1..]
            .iter()
            .position(|candidate| capture(&END_MARKER, candidate) == Some(path))?;
        Some((start, start + 1 + offset, path.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn expander_with_lib(files: &[(&str, &str)]) -> (tempfile::TempDir, MacroExpander) {
        let dir = tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(LIB_DIR).join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let expander = MacroExpander::new(dir.path());
        (dir, expander)
    }

    #[test]
    fn test_directive_detection() {
        assert_eq!(directive_path(" // !code foo/bar.js "), Some("foo/bar.js"));
        assert_eq!(directive_path("//!code foo.js\n"), Some("foo.js"));
        assert_eq!(directive_path(" var foo = 'bar'; "), None);
        assert_eq!(directive_path("x = 1; // !code foo.js"), None);
    }

    #[test]
    fn test_normal_lines_pass_through() {
        let (_dir, expander) = expander_with_lib(&[]);
        assert_eq!(
            expander.expand_line(" var foo = 'bar'; ").unwrap(),
            " var foo = 'bar'; "
        );
    }

    #[test]
    fn test_expand_inlines_fragment() {
        let (_dir, expander) =
            expander_with_lib(&[("foo.js", "function foo () { return \"foo\"; }\n")]);

        let source = "// !code foo.js\nfunction bar () { return \"bar\"; }\n";
        assert_eq!(
            expander.expand(source).unwrap(),
            "// !begin code foo.js\n\
             function foo () { return \"foo\"; }\n\
             // !end code foo.js\n\
             function bar () { return \"bar\"; }\n"
        );
    }

    #[test]
    fn test_expand_terminates_fragment_without_newline() {
        let (_dir, expander) = expander_with_lib(&[("nested/x.js", "var x = 1;")]);
        assert_eq!(
            expander.expand_line("  // !code nested/x.js").unwrap(),
            "// !begin code nested/x.js\nvar x = 1;\n// !end code nested/x.js\n"
        );
    }

    #[test]
    fn test_missing_fragment_is_an_error() {
        let (_dir, expander) = expander_with_lib(&[]);
        let err = expander.expand("// !code nope.js\n").unwrap_err();
        assert!(matches!(err, DirectoryError::MissingLibrary { .. }));
    }

    #[test]
    fn test_contract_strips_lib_code() {
        let js = "// !begin code foo.js\n\
                  function foo () { return 'foo'; }\n\
                  // !end code foo.js\n\
                  // !begin code bar.js\n\
                  function bar () { return 'bar'; }\n\
                  // !end code bar.js\n\
                  function baz () { return 'baz'; }\n";

        assert_eq!(
            contract(js),
            "// !code foo.js\n// !code bar.js\nfunction baz () { return 'baz'; }\n"
        );
    }

    #[test]
    fn test_contract_leaves_unterminated_block() {
        let js = "// !begin code foo.js\nfunction foo () {}\n";
        assert_eq!(contract(js), js);
    }

    #[test]
    fn test_contract_skips_unmatched_begin_and_folds_later_block() {
        let js = "// !begin code a.js\n\
                  // !begin code b.js\n\
                  b();\n\
                  // !end code b.js\n";
        assert_eq!(contract(js), "// !begin code a.js\n// !code b.js\n");
    }

    #[test]
    fn test_expand_after_contract_is_identity() {
        let (_dir, expander) = expander_with_lib(&[
            ("foo.js", "function foo () {}\n"),
            ("bar.js", "function bar () {}\n"),
        ]);

        let source = "// !code foo.js\nvar a;\n  // !code bar.js\n";
        let expanded = expander.expand(source).unwrap();
        let contracted = contract(&expanded);

        assert_eq!(contracted, "// !code foo.js\nvar a;\n// !code bar.js\n");
        assert_eq!(expander.expand(&contracted).unwrap(), expanded);
    }
}
