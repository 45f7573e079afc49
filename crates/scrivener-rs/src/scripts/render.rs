//! Writing artifacts to disk as Python scripts or Jupyter notebooks.
//!
//! Scripts get an interpreter line and, when there is a prompt, a docstring
//! holding it. Notebooks are nbformat v4 documents: a markdown cell with the
//! prompt, a code cell with the imports, and a code cell with the rest.

use crate::scripts::parser::{ArtifactKind, ScriptArtifact};
use crate::{Error, Result};
use regex::Regex;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

static UNSAFE_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9_\-.]").expect("unsafe filename char regex must compile")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^import [\w.]+(?: as \w+)?(?:, ?[\w.]+(?: as \w+)?)*\s*$")
        .expect("import regex must compile")
});

static FROM_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from [\w.]+ import .+").expect("from-import regex must compile")
});

pub const SCRIPT_MARKER: &str = "#!/usr/bin/env python";

/// `name` with unsafe characters replaced by `_` and `extension` appended
/// unless already present.
pub fn safe_filename(name: &str, extension: &str) -> String {
    let mut safe = UNSAFE_CHAR_RE.replace_all(name, "_").into_owned();
    if !safe.ends_with(extension) {
        safe.push_str(extension);
    }
    safe
}

/// [`safe_filename`] inside `run_dir`, creating the directory.
pub fn safe_filepath(name: &str, extension: &str, run_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(run_dir).map_err(|e| Error::io(run_dir, e))?;
    Ok(run_dir.join(safe_filename(name, extension)))
}

pub fn render_script(prompt: &str, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + prompt.len() + 32);
    out.push_str(SCRIPT_MARKER);
    out.push('\n');
    if !prompt.is_empty() {
        out.push_str("\"\"\"\n");
        out.push_str(&prompt.replace("\"\"\"", "```"));
        out.push_str("\n\"\"\"\n");
    }
    out.push_str(body);
    out
}

/// Split `body` right after its last top-level import line.
///
/// Without any import line the first part is empty.
pub fn split_imports(body: &str) -> (String, String) {
    let lines: Vec<&str> = body.split('\n').collect();
    let last_import = lines
        .iter()
        .rposition(|line| IMPORT_RE.is_match(line) || FROM_IMPORT_RE.is_match(line));
    match last_import {
        Some(idx) => (lines[..=idx].join("\n"), lines[idx + 1..].join("\n")),
        None => (String::new(), body.to_string()),
    }
}

/// nbformat stores multi-line text as a list of lines, newlines kept.
fn source_lines(text: &str) -> Value {
    Value::Array(
        text.split_inclusive('\n')
            .map(|l| Value::String(l.to_string()))
            .collect(),
    )
}

fn code_cell(source: &str) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": source_lines(source),
    })
}

pub fn render_notebook(prompt: &str, body: &str) -> Result<String> {
    let (imports, code) = split_imports(body);
    let notebook = json!({
        "cells": [
            {
                "cell_type": "markdown",
                "metadata": {},
                "source": source_lines(&format!("# User Prompt:\n\n{prompt}\n")),
            },
            code_cell(&imports),
            code_cell(&code),
        ],
        "metadata": {
            "language_info": {
                "codemirror_mode": {"name": "ipython", "version": 3},
                "file_extension": ".py",
                "mimetype": "text/x-python",
                "name": "python",
                "nbconvert_exporter": "python",
                "pygments_lexer": "ipython3",
            }
        },
        "nbformat": 4,
        "nbformat_minor": 4,
    });
    Ok(serde_json::to_string_pretty(&notebook)?)
}

/// Write one artifact into `run_dir` in the format its kind calls for.
pub fn save_artifact(artifact: &ScriptArtifact, prompt: &str, run_dir: &Path) -> Result<PathBuf> {
    let contents = match artifact.kind {
        ArtifactKind::Notebook => render_notebook(prompt, &artifact.body)?,
        ArtifactKind::Script => render_script(prompt, &artifact.body),
    };
    let path = safe_filepath(&artifact.name, artifact.kind.extension(), run_dir)?;
    std::fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
    info!("Saved {}", path.display());
    Ok(path)
}

pub fn save_artifacts(
    artifacts: &[ScriptArtifact],
    prompt: &str,
    run_dir: &Path,
) -> Result<Vec<PathBuf>> {
    artifacts
        .iter()
        .map(|a| save_artifact(a, prompt, run_dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitized_and_extended() {
        assert_eq!(safe_filename("my script!", ".py"), "my_script_.py");
        assert_eq!(safe_filename("ok-name.v2", ".py"), "ok-name.v2.py");
        assert_eq!(safe_filename("done.py", ".py"), "done.py");
        assert_eq!(safe_filename("../escape", ".py"), ".._escape.py");
    }

    #[test]
    fn script_starts_with_marker_and_prompt_docstring() {
        let rendered = render_script("say \"\"\"hi\"\"\"", "print('hi')\n");
        assert_eq!(
            rendered,
            "#!/usr/bin/env python\n\"\"\"\nsay ```hi```\n\"\"\"\nprint('hi')\n"
        );
    }

    #[test]
    fn empty_prompt_means_no_docstring() {
        assert_eq!(render_script("", "x = 1"), "#!/usr/bin/env python\nx = 1");
    }

    #[test]
    fn imports_split_after_last_import() {
        let body = "import numpy as np\nfrom os import path\nimport matplotlib.pyplot as plt\n\nx = np.zeros(3)\n# import later\n";
        let (imports, code) = split_imports(body);
        assert_eq!(
            imports,
            "import numpy as np\nfrom os import path\nimport matplotlib.pyplot as plt"
        );
        assert_eq!(code, "\nx = np.zeros(3)\n# import later\n");
    }

    #[test]
    fn indented_imports_do_not_count() {
        let (imports, code) = split_imports("def f():\n    import os\n    return os");
        assert!(imports.is_empty());
        assert_eq!(code, "def f():\n    import os\n    return os");
    }

    #[test]
    fn notebook_has_prompt_and_two_code_cells() {
        let rendered = render_notebook("plot it", "import pandas as pd\ndf = pd.DataFrame()").unwrap();
        let nb: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(nb["nbformat"], 4);
        let cells = nb["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0]["cell_type"], "markdown");
        assert_eq!(cells[0]["source"][2], "plot it\n");
        assert_eq!(cells[1]["source"], json!(["import pandas as pd"]));
        assert_eq!(cells[2]["source"], json!(["df = pd.DataFrame()"]));
    }

    #[test]
    fn artifacts_land_in_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("run");
        let artifacts = vec![
            ScriptArtifact {
                name: "calc".into(),
                body: "print(1)".into(),
                kind: ArtifactKind::Script,
                function_names: vec![],
            },
            ScriptArtifact {
                name: "chart".into(),
                body: "import matplotlib.pyplot as plt".into(),
                kind: ArtifactKind::Notebook,
                function_names: vec![],
            },
        ];
        let paths = save_artifacts(&artifacts, "", &run_dir).unwrap();
        assert_eq!(paths, vec![run_dir.join("calc.py"), run_dir.join("chart.ipynb")]);
        assert!(std::fs::read_to_string(&paths[0]).unwrap().starts_with(SCRIPT_MARKER));
        let nb: Value = serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
        assert_eq!(nb["cells"][2]["source"], json!([]));
    }
}
