//! Markdown change log for a [`SnapshotDiff`].
//!
//! The rendering depends only on the diff, so the same two snapshots always
//! produce the same text.

use std::fmt::Write;

use crate::diff::SnapshotDiff;
use crate::snapshot::RuleClause;

fn version_line(version: &str, date: Option<chrono::NaiveDate>) -> String {
    match date {
        Some(d) => format!("{version} ({})", d.format("%Y-%m-%d")),
        None => version.to_string(),
    }
}

fn clause_lines(out: &mut String, clause: &RuleClause) {
    let _ = writeln!(out, "- **{}** ({})", clause.ingredient_name, clause.category);
    if let Some(limit) = clause.max_concentration {
        let _ = writeln!(out, "  - Max concentration: {limit}%");
    }
    if let Some(citation) = &clause.citation {
        let _ = writeln!(out, "  - Source: {citation}");
    }
}

impl SnapshotDiff {
    /// Render the diff as a Markdown change log.
    pub fn render_changelog(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Regulation Changes: {}", self.jurisdiction);
        let _ = writeln!(out);
        let _ = writeln!(out, "**From Version:** {}", version_line(&self.from_version, self.from_date));
        let _ = writeln!(out, "**To Version:** {}", version_line(&self.to_version, self.to_date));
        let _ = writeln!(out);

        let s = &self.summary;
        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "- **Total Changes:** {}", s.total_changes);
        let _ = writeln!(out, "- **Added Clauses:** {}", s.added);
        let _ = writeln!(out, "- **Removed Clauses:** {}", s.removed);
        let _ = writeln!(out, "- **Modified Clauses:** {} ({} high severity)", s.modified, s.high_severity);
        let _ = writeln!(out, "- **Affected Ingredients:** {}", s.affected_ingredients);

        if !self.added.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Added Clauses");
            let _ = writeln!(out);
            for clause in &self.added {
                clause_lines(&mut out, clause);
            }
        }

        if !self.removed.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Removed Clauses");
            let _ = writeln!(out);
            for clause in &self.removed {
                clause_lines(&mut out, clause);
            }
        }

        if !self.modified.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Modified Clauses");
            let _ = writeln!(out);
            for m in &self.modified {
                let _ = writeln!(out, "- **{}** (Clause: {})", m.ingredient_name, m.clause_id);
                for change in &m.changes {
                    let _ = writeln!(
                        out,
                        "  - {}: `{}` → `{}` (severity: {})",
                        change.field,
                        change.old.as_deref().unwrap_or("none"),
                        change.new.as_deref().unwrap_or("none"),
                        change.severity
                    );
                }
            }
        }

        if !self.affected_ingredients.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Affected Ingredients");
            let _ = writeln!(out);
            for (id, name) in self.affected_names() {
                let _ = writeln!(out, "- {name} (`{id}`)");
            }
        }
        out
    }
}
