//! Source/test classification heuristics.

use serde::{Deserialize, Serialize};

/// Which side of the source/test split something falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Source,
    Test,
}

const TEST_DIR_SEGMENTS: &[&str] = &["/test/", "\\test\\", "/tests/", "\\tests\\"];
const TEST_FILE_SUFFIXES: &[&str] = &["Test.java", "Tests.java", "Spec.java", "IT.java"];
const TEST_NAME_FRAGMENTS: &[&str] = &["test.java", "_test.", ".test.", ".spec."];
const TEST_TEXT_MARKERS: &[&str] = &["Test", "test/", "/test/", "@Test"];

/// Whether a file path looks like a test file.
pub fn is_test_path(path: &str) -> bool {
    TEST_DIR_SEGMENTS.iter().any(|s| path.contains(s))
        || TEST_FILE_SUFFIXES.iter().any(|s| path.ends_with(s))
        || TEST_NAME_FRAGMENTS.iter().any(|s| path.contains(s))
}

/// Whether result text was produced in a test context.
pub fn has_test_markers(text: &str) -> bool {
    TEST_TEXT_MARKERS.iter().any(|m| text.contains(m))
}

/// Scope of a file path.
pub fn path_scope(path: &str) -> Scope {
    if is_test_path(path) {
        Scope::Test
    } else {
        Scope::Source
    }
}

/// Scope of an identifier found in text.
pub fn element_scope(id: &str, test_context: bool) -> Scope {
    if test_context || id.contains("Test") {
        Scope::Test
    } else {
        Scope::Source
    }
}
