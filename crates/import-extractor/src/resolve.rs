// crates/import-extractor/src/resolve.rs
//! Resolve extracted specifiers against the set of in-repo paths
//! (§4.3 step 4).

use crate::patterns::Specifier;
use std::collections::HashMap;

/// Extensions recognized by the tree walk (§4.3 step 2); also the set
/// tried when resolving an extension-less relative specifier.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "java", "kt", "go", "rs", "cs", "cpp", "cc", "c", "h", "hpp",
];

/// Extensions tried for a directory-style import (`./dir` -> `./dir/index.ts`).
const INDEX_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// The enumerated in-repo file set, with a basename index for the
/// non-relative fallback (§4.3 step 4).
pub struct FileSet {
    path_set: std::collections::HashSet<String>,
    /// basename-without-extension -> matching paths, in enumeration order
    /// (ambiguity resolves to "first match in enumeration order", §9).
    basename_index: HashMap<String, Vec<String>>,
}

impl FileSet {
    pub fn new(paths: &[String]) -> Self {
        let mut basename_index: HashMap<String, Vec<String>> = HashMap::new();
        for path in paths {
            let basename = basename_without_extension(path);
            basename_index.entry(basename).or_default().push(path.clone());
        }
        Self { path_set: paths.iter().cloned().collect(), basename_index }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.path_set.contains(path)
    }
}

fn basename_without_extension(path: &str) -> String {
    let basename = path.rsplit('/').next().unwrap_or(path);
    match basename.rsplit_once('.') {
        Some((stem, _ext)) => stem.to_string(),
        None => basename.to_string(),
    }
}

/// Resolve one specifier found in `source_file` to an in-repo path, if any
/// (§4.3 step 4).
pub fn resolve(source_file: &str, specifier: &Specifier, files: &FileSet) -> Option<String> {
    if specifier.is_relative {
        resolve_relative(source_file, &specifier.raw, files)
    } else {
        resolve_absolute(&specifier.raw, files)
    }
}

fn resolve_relative(source_file: &str, raw: &str, files: &FileSet) -> Option<String> {
    let source_dir: Vec<&str> = source_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("").split('/').filter(|s| !s.is_empty()).collect();

    let mut segments: Vec<String> = source_dir.iter().map(|s| s.to_string()).collect();
    for part in specifier_segments(raw) {
        match part.as_str() {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    let base = segments.join("/");

    // Try as-is, then with each recognized extension, then as a directory index.
    if files.contains(&base) {
        return Some(base);
    }
    for ext in RECOGNIZED_EXTENSIONS {
        let candidate = format!("{base}.{ext}");
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in INDEX_EXTENSIONS {
        let candidate = format!("{base}/index.{ext}");
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// JS-style specifiers use `/`; dotted specifiers (Python) use `.`, with
/// leading dots denoting "go up N-1 levels from the current directory".
fn specifier_segments(raw: &str) -> Vec<String> {
    if raw.contains('/') {
        raw.split('/').map(|s| s.to_string()).collect()
    } else {
        let dot_count = raw.chars().take_while(|&c| c == '.').count();
        let rest = &raw[dot_count..];
        let mut segments: Vec<String> = Vec::new();
        for _ in 1..dot_count {
            segments.push("..".to_string());
        }
        if !rest.is_empty() {
            segments.extend(rest.split('.').map(|s| s.to_string()));
        }
        segments
    }
}

/// Absolute (non-relative) specifier: match the last path segment against
/// any file's basename-without-extension; accept only an unambiguous match
/// (§4.3 step 4, §9 Open Questions).
fn resolve_absolute(raw: &str, files: &FileSet) -> Option<String> {
    let last_segment = raw.rsplit(|c| c == '/' || c == '.').next()?;
    if last_segment.is_empty() {
        return None;
    }
    let matches = files.basename_index.get(last_segment)?;
    if matches.len() == 1 {
        Some(matches[0].clone())
    } else {
        tracing::debug!(specifier = raw, candidates = matches.len(), "ambiguous non-relative import, taking first enumeration match");
        matches.first().cloned()
    }
}
