//! Static inspection of artifact bodies: notebook detection, function
//! discovery, and naming of follow-up test files.

use crate::scripts::parser::ScriptArtifact;
use regex::Regex;
use std::sync::LazyLock;

/// `def name(` at the start of a line, optionally `async`.
static TOP_LEVEL_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:async[ \t]+)?def[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*\(")
        .expect("top-level def regex must compile")
});

/// Whether `body` contains any of `signatures` (plotting or dataframe imports).
pub fn is_notebook(body: &str, signatures: &[String]) -> bool {
    signatures.iter().any(|s| body.contains(s.as_str()))
}

/// Names of top-level functions defined in `body`, in order of appearance.
///
/// Methods and nested functions are indented and therefore skipped.
pub fn find_functions(body: &str) -> Vec<String> {
    TOP_LEVEL_DEF_RE
        .captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// One `test_<name>` file per artifact that defines at least one function.
pub fn test_file_names(artifacts: &[ScriptArtifact]) -> Vec<String> {
    artifacts
        .iter()
        .filter(|a| !a.function_names.is_empty())
        .map(|a| format!("test_{}", a.name))
        .collect()
}

/// "Please make 1 test file and call it test_a" or
/// "Please make 3 test files and call them test_a, test_b, and test_c".
pub fn test_files_sentence(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [only] => Some(format!("Please make 1 test file and call it {only}")),
        [init @ .., last] => Some(format!(
            "Please make {} test files and call them {}, and {last}",
            names.len(),
            init.join(", ")
        )),
    }
}
