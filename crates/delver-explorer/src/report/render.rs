//! Markdown rendering of report contexts.

use std::collections::BTreeMap;

use super::{CodePiece, fence_for};

/// Structural overview: files, classes with piece counts, relationships.
pub(crate) fn structured_context(
    pieces: &[CodePiece],
    relationships: &BTreeMap<String, Vec<String>>,
) -> String {
    let mut out = String::from("## Code Structure Overview\n\n");

    let files: Vec<&CodePiece> = pieces
        .iter()
        .filter(|p| p.piece_type == super::PieceType::File)
        .collect();
    if !files.is_empty() {
        out.push_str(&format!("### Files ({})\n", files.len()));
        for file in files {
            out.push_str(&format!(
                "- `{}`\n",
                file.file_path.as_deref().unwrap_or(&file.id)
            ));
        }
        out.push('\n');
    }

    let mut by_class: BTreeMap<&str, usize> = BTreeMap::new();
    for class_name in pieces.iter().filter_map(|p| p.class_name.as_deref()) {
        *by_class.entry(class_name).or_insert(0) += 1;
    }
    if !by_class.is_empty() {
        out.push_str(&format!("### Classes ({})\n", by_class.len()));
        for (class_name, count) in &by_class {
            out.push_str(&format!("- **{}** ({} elements)\n", class_name, count));
        }
        out.push('\n');
    }

    if !relationships.is_empty() {
        out.push_str("### Key Relationships\n");
        for (key, related) in relationships {
            out.push_str(&format!("- **{}**:\n", key));
            for item in related {
                out.push_str(&format!("  - {}\n", item));
            }
        }
        out.push('\n');
    }

    out
}

/// Full coding context: query, overview, summary, every piece untruncated,
/// then relationships. `pieces` must already be in rendering order.
pub(crate) fn coding_context(
    query: &str,
    structured: &str,
    summary: Option<&str>,
    pieces: &[CodePiece],
    relationships: &BTreeMap<String, Vec<String>>,
) -> String {
    let mut out = format!("# Code Context for: {}\n\n", query);
    out.push_str(structured);
    out.push('\n');

    if let Some(summary) = summary {
        out.push_str("## Key Insights\n\n");
        out.push_str(summary);
        out.push_str("\n\n");
    }

    out.push_str("## Relevant Code\n\n");
    for piece in pieces {
        out.push_str(&format!("### {}\n", piece.id));
        if let Some(ref path) = piece.file_path {
            out.push_str(&format!("**File:** `{}`\n", path));
        }
        if let Some(ref class_name) = piece.class_name
            && *class_name != piece.id
        {
            out.push_str(&format!("**Class:** `{}`\n", class_name));
        }
        out.push_str(&format!("**Type:** {}\n\n", piece.piece_type));

        let fence = fence_for(&piece.content);
        out.push_str(&format!("{}{}\n", fence, piece.language));
        out.push_str(&piece.content);
        if !piece.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&fence);
        out.push_str("\n\n");
    }

    if !relationships.is_empty() {
        out.push_str("## Relationships and Dependencies\n\n```\n");
        for (key, related) in relationships {
            out.push_str(&format!("{}:\n", key));
            for item in related {
                out.push_str(&format!("  → {}\n", item));
            }
            out.push('\n');
        }
        out.push_str("```\n");
    }

    out
}
