//! Report synthesis.
//!
//! Turns a finished [`ExplorationResult`](crate::types::ExplorationResult)
//! into a [`CodeExplorationReport`]: the discovered identifiers, typed code
//! pieces pulled out of tool results, the relationship map, and two rendered
//! texts (a structural overview and a full coding context).

mod enrich;
mod extract;
mod render;
mod synthesizer;

pub use enrich::{CodeAccess, enrich_pieces};
#[cfg(any(test, feature = "testing"))]
pub use enrich::MockCodeAccess;
pub use extract::{
    ClassInfoPieces, FileReadPieces, MethodListPieces, PieceExtractor, SearchResultPieces,
    detect_code_type, detect_language, fence_for,
};
pub use synthesizer::ReportSynthesizer;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type of an extracted code piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceType {
    File,
    Class,
    RelatedClass,
    Interface,
    Method,
    MethodSignature,
    /// Structural description (fields, member list) without the body.
    ClassInfo,
    Code,
}

impl PieceType {
    /// Rendering order: files first, everything else last.
    pub fn order(&self) -> u8 {
        match self {
            Self::File => 1,
            Self::Class => 2,
            Self::RelatedClass => 3,
            Self::Interface => 4,
            Self::Method => 5,
            Self::MethodSignature => 6,
            Self::ClassInfo | Self::Code => 10,
        }
    }

    /// Signatures, structural summaries and loose snippets rank below full code.
    pub fn fidelity(&self) -> u8 {
        match self {
            Self::MethodSignature | Self::ClassInfo | Self::Code => 0,
            _ => 1,
        }
    }

    /// The full-code type this piece becomes once its source is known.
    pub fn upgraded(&self) -> Option<PieceType> {
        match self {
            Self::MethodSignature | Self::Method => Some(Self::Method),
            Self::ClassInfo | Self::Class => Some(Self::Class),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::RelatedClass => "related_class",
            Self::Interface => "interface",
            Self::Method => "method",
            Self::MethodSignature => "method_signature",
            Self::ClassInfo => "class_info",
            Self::Code => "code",
        }
    }
}

impl std::fmt::Display for PieceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed fragment of code destined for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePiece {
    pub id: String,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub content: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl CodePiece {
    pub fn new(
        id: impl Into<String>,
        piece_type: PieceType,
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            piece_type,
            file_path: None,
            class_name: None,
            content: content.into(),
            language: language.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// The synthesized exploration report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExplorationReport {
    pub original_query: String,
    pub timestamp: DateTime<Utc>,
    /// Identifiers seen in successful tool results, sorted.
    pub discovered_elements: Vec<String>,
    /// Pieces in rendering order.
    pub code_pieces: Vec<CodePiece>,
    pub relationships: BTreeMap<String, Vec<String>>,
    pub structured_context: String,
    pub exploration_summary: Option<String>,
    pub coding_context: String,
}

impl CodeExplorationReport {
    /// Sum of piece content lengths, in characters.
    pub fn total_code_size(&self) -> usize {
        self.code_pieces
            .iter()
            .map(|p| p.content.chars().count())
            .sum()
    }

    /// Short plain-text digest of the report.
    pub fn summary_text(&self) -> String {
        format!(
            "Code Exploration Report\n\
             Query: {}\n\
             Timestamp: {}\n\
             Discovered Elements: {}\n\
             Code Pieces: {}\n\
             Total Code Size: {} characters\n\
             Relationships: {}\n",
            self.original_query,
            self.timestamp.to_rfc3339(),
            self.discovered_elements.len(),
            self.code_pieces.len(),
            self.total_code_size(),
            self.relationships.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_type_order() {
        let mut types = vec![
            PieceType::Code,
            PieceType::MethodSignature,
            PieceType::Method,
            PieceType::Interface,
            PieceType::RelatedClass,
            PieceType::Class,
            PieceType::File,
        ];
        types.sort_by_key(PieceType::order);
        assert_eq!(types[0], PieceType::File);
        assert_eq!(types[6], PieceType::Code);
        assert!(PieceType::Method.fidelity() > PieceType::MethodSignature.fidelity());
        assert!(PieceType::Class.fidelity() > PieceType::ClassInfo.fidelity());
        assert!(PieceType::ClassInfo.order() > PieceType::MethodSignature.order());
    }

    #[test]
    fn test_upgraded_types() {
        assert_eq!(PieceType::ClassInfo.upgraded(), Some(PieceType::Class));
        assert_eq!(PieceType::MethodSignature.upgraded(), Some(PieceType::Method));
        assert_eq!(PieceType::RelatedClass.upgraded(), None);
        assert_eq!(PieceType::File.upgraded(), None);
        assert_eq!(
            serde_json::to_value(PieceType::ClassInfo).unwrap(),
            "class_info"
        );
    }

    #[test]
    fn test_piece_serialization() {
        let piece = CodePiece::new("A#run", PieceType::MethodSignature, "void run()", "java")
            .with_class_name("A");
        let json = serde_json::to_value(&piece).unwrap();
        assert_eq!(json["type"], "method_signature");
        assert_eq!(json["class_name"], "A");
        assert!(json.get("file_path").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_report_totals() {
        let report = CodeExplorationReport {
            original_query: "q".to_string(),
            timestamp: Utc::now(),
            discovered_elements: vec!["com.a.B".to_string()],
            code_pieces: vec![
                CodePiece::new("a", PieceType::File, "abc", "text"),
                CodePiece::new("b", PieceType::Code, "dé", "text"),
            ],
            relationships: BTreeMap::new(),
            structured_context: String::new(),
            exploration_summary: None,
            coding_context: String::new(),
        };
        assert_eq!(report.total_code_size(), 5);
        let text = report.summary_text();
        assert!(text.contains("Discovered Elements: 1"));
        assert!(text.contains("Code Pieces: 2"));
        assert!(text.contains("Total Code Size: 5 characters"));
    }
}
