//! Programming language detection for code content.

use regex::Regex;
use std::sync::LazyLock;

/// Fallback when nothing matches
pub const PLAINTEXT: &str = "plaintext";

struct LanguagePattern {
    language: &'static str,
    patterns: Vec<Regex>,
}

fn compile(language: &'static str, sources: &[&str]) -> LanguagePattern {
    LanguagePattern {
        language,
        patterns: sources
            .iter()
            .map(|src| Regex::new(src).expect("language pattern must compile"))
            .collect(),
    }
}

/// Checked in order; the first language with any matching pattern wins.
static LANGUAGE_PATTERNS: LazyLock<Vec<LanguagePattern>> = LazyLock::new(|| {
    vec![
        compile(
            "rust",
            &[
                r"\bfn\s+\w+\s*[<(]",
                r"\blet\s+mut\b",
                r"\bimpl(<[^>]*>)?\s+\w",
                r"(?m)^\s*use\s+\w+(::\w+)+",
                r"\b(println|vec|format)!\(",
                r"&mut\s",
            ],
        ),
        compile(
            "python",
            &[
                r"(?m)^\s*def\s+\w+\(.*\)\s*(->\s*[^:]+)?:\s*$",
                r"(?m)^\s*from\s+[\w.]+\s+import\s",
                r"(?m)^\s*import\s+[\w.]+(\s+as\s+\w+)?\s*$",
                r"(?m)^\s*class\s+\w+(\([^)]*\))?:\s*$",
                r"\bself\.\w+\s*=",
            ],
        ),
        compile(
            "java",
            &[
                r"\bpublic\s+(static\s+)?(final\s+)?(class|interface|void)\b",
                r"System\.out\.print",
                r"(?m)^\s*import\s+java\.",
            ],
        ),
        compile(
            "cpp",
            &[r"\bstd::\w+", r"#include\s*<iostream>", r"\bcout\s*<<"],
        ),
        compile(
            "c",
            &[
                r#"(?m)^\s*#include\s*[<"]"#,
                r"\bint\s+main\s*\(",
                r"\bprintf\s*\(",
                r"\bmalloc\s*\(",
            ],
        ),
        compile(
            "typescript",
            &[
                r"(?m)^\s*(export\s+)?interface\s+\w+\s*\{",
                r":\s*(string|number|boolean|any|void)\b",
            ],
        ),
        compile(
            "javascript",
            &[
                r#"(?m)^\s*import\s+.+\s+from\s+['"]"#,
                r#"\brequire\s*\(\s*['"]"#,
                r"(?m)^\s*export\s+(default|const|function|class)\b",
                r"\bconsole\.log\s*\(",
                r"\bfunction\s*\w*\s*\(",
            ],
        ),
        compile(
            "go",
            &[
                r"(?m)^package\s+\w+\s*$",
                r"\bfunc\s+(\(\w+\s+\*?\w+\)\s+)?\w+\s*\(",
                r"\bfmt\.\w+\(",
            ],
        ),
        compile(
            "shell",
            &[
                r"(?m)^#!.*\b(ba|z)?sh\b",
                r"(?m)^\s*(echo|export|sudo|apt-get|chmod|mkdir|cd)\s",
                r"(?m)^\s*if\s+\[",
            ],
        ),
    ]
});

/// Language named by a media type, if recognized
pub fn language_from_media_type(media_type: &str) -> Option<&'static str> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase();
    let language = match essence.as_str() {
        "text/x-rust" | "text/rust" => "rust",
        "text/x-python" | "application/x-python" | "text/python" => "python",
        "text/x-java" | "text/x-java-source" => "java",
        "text/x-c" | "text/x-csrc" | "text/x-chdr" => "c",
        "text/x-c++" | "text/x-c++src" | "text/x-c++hdr" => "cpp",
        "application/javascript" | "text/javascript" | "application/x-javascript" => "javascript",
        "application/typescript" | "text/typescript" | "application/x-typescript" => "typescript",
        "text/x-go" | "text/x-golang" => "go",
        "application/x-sh" | "text/x-sh" | "text/x-shellscript" | "application/x-shellscript" => {
            "shell"
        }
        _ => return None,
    };
    Some(language)
}

/// Detect the language of `text`, preferring a declared media type
pub fn detect_language(text: &str, media_type: Option<&str>) -> String {
    if let Some(language) = media_type.and_then(language_from_media_type) {
        return language.to_string();
    }
    LANGUAGE_PATTERNS
        .iter()
        .find(|lp| lp.patterns.iter().any(|re| re.is_match(text)))
        .map_or(PLAINTEXT, |lp| lp.language)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_wins() {
        assert_eq!(detect_language("def f(): pass", Some("text/x-rust")), "rust");
        assert_eq!(
            detect_language("x", Some("application/javascript; charset=utf-8")),
            "javascript"
        );
    }

    #[test]
    fn detects_by_keywords() {
        assert_eq!(
            detect_language("fn main() {\n    let mut x = 1;\n}", None),
            "rust"
        );
        assert_eq!(
            detect_language("def add(a, b):\n    return a + b\n", None),
            "python"
        );
        assert_eq!(
            detect_language("public class Main {\n  public static void main(String[] a) {}\n}", None),
            "java"
        );
        assert_eq!(
            detect_language("#include <stdio.h>\nint main(void) { return 0; }", None),
            "c"
        );
        assert_eq!(
            detect_language("import React from 'react';\nexport default App;", None),
            "javascript"
        );
        assert_eq!(
            detect_language("interface User {\n  name: string;\n}", None),
            "typescript"
        );
        assert_eq!(
            detect_language("package main\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}", None),
            "go"
        );
        assert_eq!(detect_language("#!/bin/bash\necho hello", None), "shell");
    }

    #[test]
    fn falls_back_to_plaintext() {
        assert_eq!(detect_language("just some words", None), PLAINTEXT);
        assert_eq!(detect_language("x", Some("text/plain")), PLAINTEXT);
    }
}
