//! Node-id slugging for the Query Facade's graph response (§4.8).

/// Stable slug of a path: non-alphanumeric characters become underscores.
pub fn slugify(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Infer a display language from a file extension, for graph nodes.
pub fn language_from_path(path: &str) -> String {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "ts" | "tsx" | "mjs" | "cjs" => "typescript",
        "js" | "jsx" => "javascript",
        "py" => "python",
        "java" => "java",
        "kt" => "kotlin",
        "go" => "go",
        "rs" => "rust",
        "cs" => "csharp",
        "cpp" | "cc" => "cpp",
        "c" | "h" | "hpp" => "c",
        _ => "unknown",
    }
    .to_string()
}
