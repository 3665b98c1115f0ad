//! PlanDocument: the Planner's prose contract, and the AllowedFileSet derived from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FILES_HEADING: &str = "## Files to modify";
pub const CHANGES_HEADING: &str = "## Changes";
pub const CRITERIA_HEADING: &str = "## Success Criteria";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan document is empty")]
    Empty,
    #[error("plan document is missing required heading: {0}")]
    MissingHeading(&'static str),
}

/// Prose produced by the Planner agent. The only contract the Editor may act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    pub movement_id: String,
    pub raw: String,
}

impl PlanDocument {
    pub fn new(movement_id: impl Into<String>, raw: impl Into<String>) -> Result<Self, PlanError> {
        let raw = raw.into();
        let doc = PlanDocument {
            movement_id: movement_id.into(),
            raw,
        };
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.raw.trim().is_empty() {
            return Err(PlanError::Empty);
        }
        for heading in [FILES_HEADING, CHANGES_HEADING, CRITERIA_HEADING] {
            if !self.raw.contains(heading) {
                return Err(PlanError::MissingHeading(heading));
            }
        }
        Ok(())
    }

    /// Text under a `## Heading` up to the next `## ` heading or end of document.
    fn section(&self, heading: &str) -> &str {
        let Some(start) = self.raw.find(heading) else {
            return "";
        };
        let after_heading = &self.raw[start + heading.len()..];
        let end = after_heading
            .match_indices("\n## ")
            .next()
            .map(|(idx, _)| idx)
            .unwrap_or(after_heading.len());
        after_heading[..end].trim()
    }

    pub fn files_section(&self) -> &str {
        self.section(FILES_HEADING)
    }

    pub fn changes_section(&self) -> &str {
        self.section(CHANGES_HEADING)
    }

    /// One success criterion per non-empty bullet/line, stripped of list markers.
    pub fn success_criteria(&self) -> Vec<String> {
        self.section(CRITERIA_HEADING)
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*']).trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect()
    }

    /// Derives the AllowedFileSet from the `## Files to modify` section.
    ///
    /// Each non-empty line, stripped of list markers and backtick quoting, is a path.
    /// The literal word "None" (case-insensitive) yields an empty set.
    pub fn allowed_files(&self) -> AllowedFileSet {
        let section = self.files_section();
        if section.eq_ignore_ascii_case("none") {
            return AllowedFileSet::empty();
        }
        let files: HashSet<String> = section
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(['-', '*'])
                    .trim()
                    .trim_matches('`')
                    .to_string()
            })
            .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("none"))
            .collect();
        AllowedFileSet { files }
    }
}

/// Set of paths extracted from a PlanDocument. The Tool Runtime rejects writes outside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowedFileSet {
    files: HashSet<String>,
}

impl AllowedFileSet {
    pub fn empty() -> Self {
        AllowedFileSet { files: HashSet::new() }
    }

    pub fn from_iter(files: impl IntoIterator<Item = String>) -> Self {
        AllowedFileSet { files: files.into_iter().collect() }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "## Files to modify\n- hello.txt\n\n## Changes\nAppend a goodbye line.\n\n## Success Criteria\n- hello.txt contains \"Goodbye\"\n";

    #[test]
    fn parses_valid_plan() {
        let plan = PlanDocument::new("m1", VALID).unwrap();
        assert_eq!(plan.allowed_files().len(), 1);
        assert!(plan.allowed_files().contains("hello.txt"));
        assert_eq!(plan.success_criteria(), vec!["hello.txt contains \"Goodbye\""]);
    }

    #[test]
    fn rejects_missing_heading() {
        let err = PlanDocument::new("m1", "## Files to modify\nNone\n").unwrap_err();
        assert!(matches!(err, PlanError::MissingHeading(_)));
    }

    #[test]
    fn rejects_empty_document() {
        assert!(matches!(PlanDocument::new("m1", "   "), Err(PlanError::Empty)));
    }

    #[test]
    fn none_files_section_yields_empty_set() {
        let doc = "## Files to modify\nNone\n\n## Changes\nRead only.\n\n## Success Criteria\n- command executed successfully\n";
        let plan = PlanDocument::new("m1", doc).unwrap();
        assert!(plan.allowed_files().is_empty());
    }
}
