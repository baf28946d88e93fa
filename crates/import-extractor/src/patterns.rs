// crates/import-extractor/src/patterns.rs
//! Per-language import-specifier extraction (§4.3 step 3). Regex-only, no
//! compiler or language server — by design (§4.3 Responsibility).

use regex::Regex;
use std::sync::OnceLock;

/// The language family a file belongs to, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    JsTs,
    Python,
    JavaKotlin,
    Go,
    /// Recognized for tree-walk/resolution purposes (§4.3 step 2's
    /// extension set includes Rust/C#/C++/C) but with no import-pattern
    /// rule of its own.
    Other,
}

pub fn family_for_extension(ext: &str) -> Family {
    match ext {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Family::JsTs,
        "py" => Family::Python,
        "java" | "kt" => Family::JavaKotlin,
        "go" => Family::Go,
        _ => Family::Other,
    }
}

/// A raw specifier pulled out of source text, tagged with whether it's a
/// relative path (begins with `.`) — the resolver treats the two cases
/// differently (§4.3 step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub raw: String,
    pub is_relative: bool,
}

fn js_import_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"import\s+[^'";]*from\s*['"]([^'"]+)['"]"#).unwrap())
}

fn js_require() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap())
}

fn py_from_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*from\s+(\.*[\w.]*)\s+import\b").unwrap())
}

fn py_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*import\s+([\w.]+)").unwrap())
}

fn java_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+)\s*;?").unwrap())
}

fn go_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)import\s*\(([^)]*)\)").unwrap())
}

fn go_quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("\"([^\"]+)\"").unwrap())
}

fn go_single_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+(?:\w+\s+)?"([^"]+)""#).unwrap())
}

/// Extract raw specifiers from `content` for the given language family.
pub fn extract_specifiers(family: Family, content: &str) -> Vec<Specifier> {
    match family {
        Family::JsTs => {
            let mut out = Vec::new();
            for caps in js_import_from().captures_iter(content) {
                push_if_relative(&mut out, &caps[1]);
            }
            for caps in js_require().captures_iter(content) {
                push_if_relative(&mut out, &caps[1]);
            }
            out
        }
        Family::Python => {
            let mut out = Vec::new();
            for caps in py_from_import().captures_iter(content) {
                let raw = &caps[1];
                if !raw.is_empty() {
                    out.push(to_specifier(raw));
                }
            }
            for caps in py_import().captures_iter(content) {
                out.push(to_specifier(&caps[1]));
            }
            out
        }
        Family::JavaKotlin => java_import()
            .captures_iter(content)
            .map(|caps| to_specifier(&caps[1]))
            .collect(),
        Family::Go => {
            let mut out = Vec::new();
            for block in go_block().captures_iter(content) {
                for caps in go_quoted().captures_iter(&block[1]) {
                    out.push(to_specifier(&caps[1]));
                }
            }
            for caps in go_single_line().captures_iter(content) {
                out.push(to_specifier(&caps[1]));
            }
            out
        }
        Family::Other => Vec::new(),
    }
}

fn push_if_relative(out: &mut Vec<Specifier>, raw: &str) {
    // JS/TS: "retain only specifiers beginning with `.`" (§4.3 step 3).
    if raw.starts_with('.') {
        out.push(Specifier { raw: raw.to_string(), is_relative: true });
    }
}

fn to_specifier(raw: &str) -> Specifier {
    Specifier { is_relative: raw.starts_with('.'), raw: raw.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_extracts_relative_import_from() {
        let specs = extract_specifiers(Family::JsTs, r#"import {x} from "./b";"#);
        assert_eq!(specs, vec![Specifier { raw: "./b".into(), is_relative: true }]);
    }

    #[test]
    fn js_drops_bare_package_import() {
        let specs = extract_specifiers(Family::JsTs, r#"import React from "react";"#);
        assert!(specs.is_empty());
    }

    #[test]
    fn js_extracts_require() {
        let specs = extract_specifiers(Family::JsTs, r#"const b = require("./b");"#);
        assert_eq!(specs, vec![Specifier { raw: "./b".into(), is_relative: true }]);
    }

    #[test]
    fn python_from_import_translates_dots() {
        let specs = extract_specifiers(Family::Python, "from a.b.c import d\n");
        assert_eq!(specs[0].raw, "a.b.c");
        assert!(!specs[0].is_relative);
    }

    #[test]
    fn python_relative_from_import() {
        let specs = extract_specifiers(Family::Python, "from .sub import d\n");
        assert_eq!(specs[0].raw, ".sub");
        assert!(specs[0].is_relative);
    }

    #[test]
    fn python_plain_import() {
        let specs = extract_specifiers(Family::Python, "import os.path\n");
        assert_eq!(specs[0].raw, "os.path");
    }

    #[test]
    fn java_import_matches_scenario_3() {
        let specs = extract_specifiers(Family::JavaKotlin, "package pkg;\nimport pkg.B;\n");
        assert_eq!(specs, vec![Specifier { raw: "pkg.B".into(), is_relative: false }]);
    }

    #[test]
    fn java_static_import() {
        let specs = extract_specifiers(Family::JavaKotlin, "import static pkg.Util.helper;\n");
        assert_eq!(specs[0].raw, "pkg.Util.helper");
    }

    #[test]
    fn go_block_import() {
        let content = "import (\n\t\"fmt\"\n\t\"github.com/foo/bar\"\n)\n";
        let specs = extract_specifiers(Family::Go, content);
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().any(|s| s.raw == "fmt"));
        assert!(specs.iter().any(|s| s.raw == "github.com/foo/bar"));
    }

    #[test]
    fn go_single_import() {
        let specs = extract_specifiers(Family::Go, "import \"fmt\"\n");
        assert_eq!(specs[0].raw, "fmt");
    }

    #[test]
    fn other_family_yields_nothing() {
        assert!(extract_specifiers(Family::Other, "#include <stdio.h>").is_empty());
    }
}
