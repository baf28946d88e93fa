// crates/db/src/queries/facade.rs
//! Query Facade (§4.8): five read-only operations over the three
//! intelligence layers, each scoped by `(userId, repoUrl)` (I1, P5).
//!
//! Implemented as inherent `impl Database` methods grouped in their own
//! module, matching the teacher's `queries/sessions.rs` /
//! `queries/dashboard.rs` pattern of one query-group file per concern
//! rather than a separate facade struct.

use crate::{Database, DbResult};
use chrono::NaiveDate;
use reposcope_core::slug::{language_from_path, slugify};
use reposcope_types::{FileChurnStat, GraphEdge, GraphNode, Occurrence, RepoUrl, SymbolInfo, UserId};
use std::collections::{HashSet, VecDeque};

/// Hover result: the innermost covering occurrence plus its symbol metadata.
#[derive(Debug, Clone)]
pub struct HoverResult {
    pub occurrence: Occurrence,
    pub symbol_info: Option<SymbolInfo>,
}

/// One occurrence of a symbol, with the document it lives in (§4.8
/// "references by symbol").
#[derive(Debug, Clone)]
pub struct ReferenceRow {
    pub file_path: String,
    pub occurrence: Occurrence,
}

/// A file's churn rollup over a window, for the hotspots query (§4.8,
/// scenario 6).
#[derive(Debug, Clone)]
pub struct HotspotGroup {
    pub file_path: String,
    pub avg_churn_rate: f64,
    pub total_added: i64,
    pub total_deleted: i64,
    pub total_commits: i64,
    pub weekly_trend: Vec<(NaiveDate, FileChurnStat)>,
}

impl Database {
    /// Hover at `(filePath, line, character)`: the innermost occurrence
    /// covering the position, joined to its `SymbolInfo` (§4.8, P4).
    pub async fn hover_at_position(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        file_path: &str,
        line: i64,
        character: i64,
    ) -> DbResult<Option<HoverResult>> {
        let Some(document_id) = self.find_document_id(user_id, repo_url, file_path).await? else {
            return Ok(None);
        };

        let occurrences = self.occurrences_for_document(document_id).await?;
        let mut covering: Vec<Occurrence> = occurrences.into_iter().filter(|o| o.covers(line, character)).collect();
        // Innermost first: smallest (line span, char span) lexicographically (P4).
        covering.sort_by_key(|o| o.extent());

        let Some(occurrence) = covering.into_iter().next() else {
            return Ok(None);
        };

        let symbol_info = self.find_symbol_info(user_id, repo_url, &occurrence.symbol).await?;
        Ok(Some(HoverResult { occurrence, symbol_info }))
    }

    /// All occurrences of `symbol`, ordered by `(filePath, startLine)` (§4.8).
    pub async fn references_by_symbol(&self, user_id: UserId, repo_url: &RepoUrl, symbol: &str) -> DbResult<Vec<ReferenceRow>> {
        let rows = self.occurrences_by_symbol(user_id, repo_url, symbol).await?;
        Ok(rows.into_iter().map(|(file_path, occurrence)| ReferenceRow { file_path, occurrence }).collect())
    }

    /// Graph of the repo: the full edge set if `root_file` is `None`,
    /// otherwise a BFS from `root_file` up to `depth`, marking edges that
    /// close a cycle back to an already-visited node (§4.8).
    pub async fn graph_of_repo(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        root_file: Option<&str>,
        depth: u32,
    ) -> DbResult<(Vec<GraphNode>, Vec<GraphEdge>)> {
        let all_edges = self.list_file_dependencies(user_id, repo_url).await?;

        let selected_edges: Vec<(String, String, String)> = match root_file {
            None => all_edges.iter().map(|e| (e.source_file.clone(), e.target_file.clone(), e.kind.clone())).collect(),
            Some(root) => {
                let mut visited: HashSet<String> = HashSet::new();
                visited.insert(root.to_string());
                let mut queue: VecDeque<(String, u32)> = VecDeque::new();
                queue.push_back((root.to_string(), 0));
                let mut edges = Vec::new();

                while let Some((node, dist)) = queue.pop_front() {
                    if dist >= depth {
                        continue;
                    }
                    let outgoing = self.outgoing_edges(user_id, repo_url, &node).await?;
                    for edge in outgoing {
                        edges.push((edge.source_file.clone(), edge.target_file.clone(), edge.kind.clone()));
                        if visited.insert(edge.target_file.clone()) {
                            queue.push_back((edge.target_file, dist + 1));
                        }
                    }
                }
                edges
            }
        };

        let mut node_paths: Vec<String> = Vec::new();
        let mut seen_nodes: HashSet<String> = HashSet::new();
        for (src, dst, _) in &selected_edges {
            if seen_nodes.insert(src.clone()) {
                node_paths.push(src.clone());
            }
            if seen_nodes.insert(dst.clone()) {
                node_paths.push(dst.clone());
            }
        }
        if let Some(root) = root_file {
            if seen_nodes.insert(root.to_string()) {
                node_paths.insert(0, root.to_string());
            }
        }

        let nodes: Vec<GraphNode> = node_paths
            .iter()
            .map(|path| GraphNode {
                id: slugify(path),
                label: path.rsplit('/').next().unwrap_or(path).to_string(),
                path: path.clone(),
                language: language_from_path(path),
            })
            .collect();

        // An edge closes a cycle when its target was already on the path
        // to its source, i.e. the target was visited strictly before the
        // edge that points back to it was traversed. A lightweight
        // approximation: an edge closes a cycle if its target already has
        // at least one outgoing edge reaching back toward its source in
        // `selected_edges` (detected via a reachability check).
        let mut edges = Vec::with_capacity(selected_edges.len());
        for (from, to, kind) in &selected_edges {
            let is_cycle = reaches(&selected_edges, to, from);
            edges.push(GraphEdge {
                id: format!("{}__{}", slugify(from), slugify(to)),
                from: from.clone(),
                to: to.clone(),
                kind: kind.clone(),
                is_cycle,
            });
        }

        Ok((nodes, edges))
    }

    /// Hotspots: files whose churn rate exceeds `threshold` within
    /// `window_weeks`, grouped and sorted by average churn descending,
    /// capped at 20 (§4.8, scenario 6).
    pub async fn hotspots(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        window_weeks: i64,
        threshold: f64,
    ) -> DbResult<Vec<HotspotGroup>> {
        let rows = self.churn_rows_above_threshold(user_id, repo_url, window_weeks, threshold).await?;

        let mut by_file: std::collections::BTreeMap<String, Vec<(NaiveDate, FileChurnStat)>> = std::collections::BTreeMap::new();
        for (file_path, week, stat) in rows {
            by_file.entry(file_path).or_default().push((week, stat));
        }

        let mut groups: Vec<HotspotGroup> = by_file
            .into_iter()
            .map(|(file_path, trend)| {
                let total_added: i64 = trend.iter().map(|(_, s)| s.lines_added).sum();
                let total_deleted: i64 = trend.iter().map(|(_, s)| s.lines_deleted).sum();
                let total_commits: i64 = trend.iter().map(|(_, s)| s.commit_count).sum();
                let avg_churn_rate = trend.iter().map(|(_, s)| s.churn_rate).sum::<f64>() / trend.len() as f64;
                HotspotGroup {
                    file_path,
                    avg_churn_rate: (avg_churn_rate * 100.0).round() / 100.0,
                    total_added,
                    total_deleted,
                    total_commits,
                    weekly_trend: trend,
                }
            })
            .collect();

        groups.sort_by(|a, b| b.avg_churn_rate.partial_cmp(&a.avg_churn_rate).unwrap_or(std::cmp::Ordering::Equal));
        groups.truncate(20);
        Ok(groups)
    }

    /// File trend: weekly rows for one file, ordered by `weekStart` (§4.8).
    pub async fn file_trend(
        &self,
        user_id: UserId,
        repo_url: &RepoUrl,
        file_path: &str,
        window_weeks: i64,
    ) -> DbResult<Vec<(NaiveDate, FileChurnStat)>> {
        self.file_churn_trend(user_id, repo_url, file_path, window_weeks).await
    }
}

/// Whether `to` can reach `from` via `edges` (used to flag cycle-closing
/// edges in the graph response).
fn reaches(edges: &[(String, String, String)], from: &str, target: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(from);
    visited.insert(from);

    while let Some(node) = queue.pop_front() {
        if node == target {
            return true;
        }
        for (src, dst, _) in edges {
            if src == node && visited.insert(dst.as_str()) {
                queue.push_back(dst.as_str());
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reposcope_types::FileDependency;

    fn monday(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Scenario 5: hover returns the innermost occurrence.
    #[tokio::test]
    async fn hover_returns_innermost_occurrence() {
        let db = Database::new_in_memory().await.unwrap();
        let doc_id = db
            .upsert_index_document(&reposcope_types::IndexDocument {
                user_id: 1,
                repo_url: "R".to_string(),
                relative_path: "x.ts".to_string(),
                language: "typescript".to_string(),
            })
            .await
            .unwrap();

        let outer = Occurrence { document_id: doc_id, symbol: "outer".into(), start_line: 1, start_char: 0, end_line: 10, end_char: 0, role_flags: Default::default() };
        let inner = Occurrence { document_id: doc_id, symbol: "inner".into(), start_line: 3, start_char: 0, end_line: 5, end_char: 0, role_flags: Default::default() };
        db.replace_occurrences(doc_id, &[outer, inner]).await.unwrap();

        let hover = db.hover_at_position(1, &"R".to_string(), "x.ts", 4, 2).await.unwrap().unwrap();
        assert_eq!(hover.occurrence.symbol, "inner");
        assert_eq!((hover.occurrence.start_line, hover.occurrence.end_line), (3, 5));
    }

    #[tokio::test]
    async fn hover_on_missing_document_is_none() {
        let db = Database::new_in_memory().await.unwrap();
        let hover = db.hover_at_position(1, &"R".to_string(), "missing.ts", 0, 0).await.unwrap();
        assert!(hover.is_none());
    }

    #[tokio::test]
    async fn graph_full_edge_set_when_no_root() {
        let db = Database::new_in_memory().await.unwrap();
        db.replace_file_dependencies(1, &"R".to_string(), &[
            FileDependency::import(1, "R", "a", "b"),
            FileDependency::import(1, "R", "b", "c"),
        ]).await.unwrap();

        let (nodes, edges) = db.graph_of_repo(1, &"R".to_string(), None, 20).await.unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(nodes.len(), 3);
    }

    #[tokio::test]
    async fn graph_marks_cycle_closing_edge() {
        let db = Database::new_in_memory().await.unwrap();
        db.replace_file_dependencies(1, &"R".to_string(), &[
            FileDependency::import(1, "R", "a", "b"),
            FileDependency::import(1, "R", "b", "a"),
        ]).await.unwrap();

        let (_, edges) = db.graph_of_repo(1, &"R".to_string(), Some("a"), 20).await.unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.is_cycle));
    }

    /// Scenario 6: weekly churn rates [30, 40, 10] at threshold 25.0 keeps
    /// two weeks, average 35.00. `added/2` below the 50-line floor yields
    /// `churn_rate == added*2`, so 15/20/5 lines added produce those rates.
    #[tokio::test]
    async fn hotspots_match_scenario_6() {
        let db = Database::new_in_memory().await.unwrap();
        db.upsert_churn_bucket(1, &"R".to_string(), "hot.ts", monday(2024, 1, 1), 15, 0, 2).await.unwrap();
        db.upsert_churn_bucket(1, &"R".to_string(), "hot.ts", monday(2024, 1, 8), 20, 0, 3).await.unwrap();
        db.upsert_churn_bucket(1, &"R".to_string(), "hot.ts", monday(2024, 1, 15), 5, 0, 1).await.unwrap();

        let groups = db.hotspots(1, &"R".to_string(), 3000, 25.0).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].file_path, "hot.ts");
        assert_eq!(groups[0].weekly_trend.len(), 2);
        assert_eq!(groups[0].avg_churn_rate, 35.00);
        assert_eq!(groups[0].total_commits, 5);
    }

    #[tokio::test]
    async fn hotspots_capped_at_twenty_and_sorted_descending() {
        let db = Database::new_in_memory().await.unwrap();
        for i in 0..25 {
            let added = 30 + i;
            db.upsert_churn_bucket(1, &"R".to_string(), &format!("f{i}.ts"), monday(2024, 1, 1), added, 0, 1).await.unwrap();
        }

        let groups = db.hotspots(1, &"R".to_string(), 3000, 25.0).await.unwrap();
        assert_eq!(groups.len(), 20);
        for pair in groups.windows(2) {
            assert!(pair[0].avg_churn_rate >= pair[1].avg_churn_rate);
        }
    }
}
