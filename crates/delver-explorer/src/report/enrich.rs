//! Upgrading signature-level pieces to full implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use super::{CodePiece, PieceType};

/// Looks up the full source of a code element by id.
///
/// Ids are qualified class names (`com.game.Leaderboard`) or member
/// references (`com.game.Leaderboard#addScore`).
#[async_trait]
pub trait CodeAccess: Send + Sync {
    async fn full_code(&self, element_id: &str) -> Option<String>;

    /// Classes `class_name` depends on (supertypes, field types), as
    /// `related_class` pieces.
    async fn related_classes(&self, _class_name: &str) -> Vec<CodePiece> {
        Vec::new()
    }
}

/// Replace method and class pieces with their full code where available,
/// then append the classes related to every class the pieces belong to.
///
/// Signatures become methods and class summaries become classes. Empty
/// lookups leave the piece untouched. A related class never replaces a
/// piece that already has its id.
pub async fn enrich_pieces(pieces: &mut Vec<CodePiece>, access: &dyn CodeAccess) {
    let mut enriched = 0usize;
    for piece in pieces.iter_mut() {
        let Some(upgraded) = piece.piece_type.upgraded() else {
            continue;
        };

        let Some(code) = access.full_code(&piece.id).await else {
            continue;
        };
        if code.trim().is_empty() {
            continue;
        }

        piece.content = code;
        piece.piece_type = upgraded;
        piece
            .metadata
            .insert("enriched".to_string(), Value::Bool(true));
        enriched += 1;
    }

    let mut ids: HashSet<String> = pieces.iter().map(|p| p.id.clone()).collect();
    let mut classes: Vec<String> = Vec::new();
    for class_name in pieces.iter().filter_map(|p| p.class_name.as_ref()) {
        if !classes.contains(class_name) {
            classes.push(class_name.clone());
        }
    }

    let mut related = 0usize;
    for class_name in &classes {
        for piece in access.related_classes(class_name).await {
            if ids.insert(piece.id.clone()) {
                pieces.push(piece);
                related += 1;
            }
        }
    }
    tracing::debug!(enriched, related, total = pieces.len(), "Enriched code pieces");
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed id-to-code lookup for tests.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct MockCodeAccess {
    code: std::collections::HashMap<String, String>,
    related: std::collections::HashMap<String, Vec<CodePiece>>,
}

#[cfg(any(test, feature = "testing"))]
impl MockCodeAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, id: impl Into<String>, code: impl Into<String>) -> Self {
        self.code.insert(id.into(), code.into());
        self
    }

    /// Record `related_id` (with `code`) as related to `class_name`.
    pub fn with_related(
        mut self,
        class_name: impl Into<String>,
        related_id: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        let related_id = related_id.into();
        let simple = related_id.rsplit('.').next().unwrap_or(&related_id).to_string();
        let piece = CodePiece::new(&related_id, PieceType::RelatedClass, code, "java")
            .with_class_name(simple);
        self.related.entry(class_name.into()).or_default().push(piece);
        self
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl CodeAccess for MockCodeAccess {
    async fn full_code(&self, element_id: &str) -> Option<String> {
        self.code.get(element_id).cloned()
    }

    async fn related_classes(&self, class_name: &str) -> Vec<CodePiece> {
        self.related.get(class_name).cloned().unwrap_or_default()
    }
}
