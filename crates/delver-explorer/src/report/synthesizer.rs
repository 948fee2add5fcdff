//! The report synthesizer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::enrich::{CodeAccess, enrich_pieces};
use super::extract::{
    ClassInfoPieces, FileReadPieces, MethodListPieces, PieceExtractor, SearchResultPieces,
    bold_items, bullet_items,
};
use super::render::{coding_context, structured_context};
use super::{CodeExplorationReport, CodePiece};
use crate::context::PatternExtractor;
use crate::types::{ExplorationResult, ToolExecution};

/// Builds a [`CodeExplorationReport`] from an exploration result.
///
/// Holds no state between calls; the same result always yields the same
/// pieces, up to what the optional [`CodeAccess`] returns.
pub struct ReportSynthesizer {
    extractors: Vec<Box<dyn PieceExtractor>>,
}

impl Default for ReportSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSynthesizer {
    /// Synthesizer with the built-in extractors.
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(FileReadPieces),
                Box::new(MethodListPieces),
                Box::new(SearchResultPieces),
                Box::new(ClassInfoPieces),
            ],
        }
    }

    /// Add an extractor. The first extractor that handles a tool wins.
    pub fn with_extractor(mut self, extractor: impl PieceExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub async fn synthesize(
        &self,
        result: &ExplorationResult,
        code_access: Option<&dyn CodeAccess>,
    ) -> CodeExplorationReport {
        let successful: Vec<&ToolExecution> = result.executions().filter(|e| e.success).collect();

        let discovered: BTreeSet<String> = successful
            .iter()
            .flat_map(|e| PatternExtractor::scan(&e.result))
            .map(|element| element.id)
            .collect();

        let mut pieces = self.collect_pieces(&successful);
        if let Some(access) = code_access {
            enrich_pieces(&mut pieces, access).await;
        }
        pieces.sort_by(|a, b| {
            a.piece_type
                .order()
                .cmp(&b.piece_type.order())
                .then_with(|| a.id.cmp(&b.id))
        });

        let relationships = collect_relationships(&successful);
        let structured = structured_context(&pieces, &relationships);
        let coding = coding_context(
            &result.query,
            &structured,
            result.summary.as_deref(),
            &pieces,
            &relationships,
        );

        tracing::info!(
            session_id = %result.session_id,
            elements = discovered.len(),
            pieces = pieces.len(),
            relationships = relationships.len(),
            "Report synthesized"
        );

        CodeExplorationReport {
            original_query: result.query.clone(),
            timestamp: result.finished_at,
            discovered_elements: discovered.into_iter().collect(),
            code_pieces: pieces,
            relationships,
            structured_context: structured,
            exploration_summary: result.summary.clone(),
            coding_context: coding,
        }
    }

    /// Route each execution to its extractor, deduplicating by id. A later
    /// piece replaces an earlier one only when its fidelity is higher.
    fn collect_pieces(&self, executions: &[&ToolExecution]) -> Vec<CodePiece> {
        let mut pieces: Vec<CodePiece> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for execution in executions {
            let Some(extractor) = self
                .extractors
                .iter()
                .find(|x| x.handles(&execution.tool_name))
            else {
                continue;
            };

            for piece in extractor.extract(execution) {
                match index.get(&piece.id) {
                    Some(&i) => {
                        if piece.piece_type.fidelity() > pieces[i].piece_type.fidelity() {
                            pieces[i] = piece;
                        }
                    }
                    None => {
                        index.insert(piece.id.clone(), pieces.len());
                        pieces.push(piece);
                    }
                }
            }
        }
        pieces
    }
}

/// Relationship, caller and implementation lookups, merged per key.
fn collect_relationships(executions: &[&ToolExecution]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for execution in executions {
        let (key, items) = match execution.tool_name.as_str() {
            "find_relationships" => match execution.param_str("elementId") {
                Some(id) => (id.to_string(), bullet_items(&execution.result)),
                None => continue,
            },
            "find_callers" => match execution.param_str("methodId") {
                Some(id) => (format!("{} <- callers", id), bold_items(&execution.result)),
                None => continue,
            },
            "find_implementations" => match execution.param_str("elementId") {
                Some(id) => (
                    format!("{} <- implementations", id),
                    bold_items(&execution.result),
                ),
                None => continue,
            },
            _ => continue,
        };

        let related = map.entry(key).or_default();
        for item in items {
            if !related.contains(&item) {
                related.push(item);
            }
        }
    }
    map
}
