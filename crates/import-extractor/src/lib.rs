// crates/import-extractor/src/lib.rs
//! Import Dependency Extractor (§4.3): walks a repository's working tree,
//! pulls import specifiers out of recognized source files with per-language
//! regexes, and resolves each specifier to another in-repo file.
//!
//! Regex-only by design — no compiler front end or language server is
//! involved (§4.3 Responsibility), so this never understands re-exports,
//! aliasing, or conditional imports. It is a best-effort structural graph,
//! not a type-checked one.

pub mod patterns;
pub mod resolve;
pub mod walk;

use reposcope_core::error::RepoError;
use reposcope_types::{FileDependency, UserId};
use resolve::FileSet;
use std::path::Path;
use walk::WalkedFile;

/// Extract every resolvable import edge from a checked-out working tree
/// (§4.3 steps 2-4). Caller attaches `user_id`/`repo_url` scoping.
///
/// Self-loops (a file "importing" itself, e.g. via a barrel re-export back
/// to its own index) are dropped, and duplicate `(source, target)` pairs
/// collapse to one edge — the graph records reachability, not import count.
pub fn extract_dependencies(user_id: UserId, repo_url: &str, working_tree: &Path) -> Vec<FileDependency> {
    let files = walk::walk_source_files(working_tree);
    let file_set = FileSet::new(&walk::all_relative_paths(&files));

    let mut edges = std::collections::BTreeSet::new();

    for file in &files {
        for specifier in specifiers_for(&file) {
            if let Some(target) = resolve::resolve(&file.relative_path, &specifier, &file_set) {
                if target != file.relative_path {
                    edges.insert((file.relative_path.clone(), target));
                }
            }
        }
    }

    edges
        .into_iter()
        .map(|(source, target)| FileDependency::import(user_id, repo_url, source, target))
        .collect()
}

fn specifiers_for(file: &WalkedFile) -> Vec<patterns::Specifier> {
    let Some(ext) = file.relative_path.rsplit('.').next() else { return Vec::new() };
    let family = patterns::family_for_extension(ext);
    patterns::extract_specifiers(family, &file.content)
}

/// Check out the repository at `bare_repo` (a `reposcope-repo-cache`
/// handle's path), extract dependencies, and clean up the temporary
/// working tree regardless of outcome (§4.3 step 1).
pub async fn extract_dependencies_from_bare_repo(
    user_id: UserId,
    repo_url: &str,
    bare_repo: &Path,
    commit_ish: &str,
) -> Result<Vec<FileDependency>, RepoError> {
    let checkout = walk::checkout_working_tree(bare_repo, commit_ish).await?;
    let deps = extract_dependencies(user_id, repo_url, checkout.path());
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// §8 scenario 2: `a.ts` imports `./b`, resolved to `b.ts`.
    #[test]
    fn scenario_2_ts_relative_import() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/a.ts", "import { b } from './b';\n");
        write(tmp.path(), "src/b.ts", "export const b = 1;\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_file, "src/a.ts");
        assert_eq!(deps[0].target_file, "src/b.ts");
        assert_eq!(deps[0].kind, "import");
    }

    /// §8 scenario 3: Java `import pkg.B;` resolves by basename, not by
    /// translating the dotted package to a directory path.
    #[test]
    fn scenario_3_java_basename_import() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/main/java/pkg/A.java", "package pkg;\nimport pkg.B;\n");
        write(tmp.path(), "src/main/java/pkg/B.java", "package pkg;\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_file, "src/main/java/pkg/A.java");
        assert_eq!(deps[0].target_file, "src/main/java/pkg/B.java");
    }

    #[test]
    fn bare_package_import_produces_no_edge() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/a.ts", "import React from 'react';\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert!(deps.is_empty());
    }

    #[test]
    fn self_import_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/index.ts", "import { x } from './index';\nexport const x = 1;\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert!(deps.is_empty());
    }

    #[test]
    fn duplicate_imports_collapse_to_one_edge() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/a.ts", "import { b } from './b';\nimport { c } from './b';\n");
        write(tmp.path(), "src/b.ts", "export const b = 1; export const c = 2;\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn unresolvable_import_produces_no_edge() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "src/a.ts", "import { z } from './missing';\n");

        let deps = extract_dependencies(1, "https://example.com/repo.git", tmp.path());
        assert!(deps.is_empty());
    }
}
