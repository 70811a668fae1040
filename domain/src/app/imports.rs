//! Best-effort import scanning for generated Python code.
//!
//! Derives the list of third-party libraries an app needs by reading its
//! `import` / `from ... import` statements. This is a static heuristic,
//! not a real import resolver: it takes the top-level module name and
//! filters out a small set of standard-library modules that commonly show
//! up in generated data apps.

use std::collections::BTreeSet;

/// Standard-library modules to exclude from the dependency list.
const PYTHON_STDLIB: &[&str] = &[
    "os", "sys", "io", "re", "json", "csv", "math", "time", "datetime", "random", "collections",
    "itertools", "functools", "pathlib", "typing", "string", "statistics", "urllib", "base64",
];

/// Scan code for imported libraries, returning sorted unique top-level
/// module names with stdlib modules filtered out.
pub fn scan_required_libraries(code: &str) -> Vec<String> {
    let mut libraries = BTreeSet::new();

    for line in code.lines() {
        let line = line.trim_start();
        let module = if let Some(rest) = line.strip_prefix("import ") {
            // "import pandas as pd, numpy" — take every comma-separated target
            for target in rest.split(',') {
                if let Some(name) = top_level_module(target) {
                    libraries.insert(name);
                }
            }
            continue;
        } else if let Some(rest) = line.strip_prefix("from ") {
            rest.split_whitespace().next()
        } else {
            None
        };

        if let Some(module) = module
            && let Some(name) = top_level_module(module)
        {
            libraries.insert(name);
        }
    }

    libraries.into_iter().collect()
}

/// Extract the top-level module name from an import target, dropping
/// submodules and `as` aliases. Returns `None` for stdlib and relative
/// imports.
fn top_level_module(target: &str) -> Option<String> {
    let name = target.split_whitespace().next()?;
    let top = name.split('.').next()?;
    if top.is_empty() || !top.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    if PYTHON_STDLIB.contains(&top) {
        return None;
    }
    Some(top.to_string())
}
