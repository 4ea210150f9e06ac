//! Conventional-commit categorization and changelog rendering.

use crate::{error::Result, template::TemplateEngine};
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static SCOPED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\w+\([^)]*\):\s*").expect("scope pattern is valid"));

const EMPTY_SUBJECT: &str = "(no message)";
const SHORT_HASH_LEN: usize = 7;

/// Changelog section a commit is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// `feat:` commits
    Features,
    /// `fix:` commits
    BugFixes,
    /// `chore:` commits
    Maintenance,
    /// Everything else
    Other,
}

impl Category {
    /// Display order of sections in the document.
    pub const ORDER: [Self; 4] = [
        Self::Features,
        Self::BugFixes,
        Self::Maintenance,
        Self::Other,
    ];

    /// Recognized prefixes, matched in this order.
    const PREFIXES: [(&'static str, Self); 3] = [
        ("feat", Self::Features),
        ("fix", Self::BugFixes),
        ("chore", Self::Maintenance),
    ];

    /// Section heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Features => "Features",
            Self::BugFixes => "Bug Fixes",
            Self::Maintenance => "Maintenance",
            Self::Other => "Other",
        }
    }
}

/// A commit as read from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full hexadecimal object id
    pub hash: String,

    /// Committer timestamp in the committer's offset
    pub committed_at: DateTime<FixedOffset>,

    /// Full commit message
    pub message: String,
}

/// One changelog line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    /// First seven characters of the hash
    pub short_hash: String,

    /// Commit date as `YYYY-MM-DD`
    pub date: String,

    /// Subject with any conventional prefix removed
    pub subject: String,

    /// Section the entry belongs to
    pub category: Category,
}

/// A rendered section: a heading and its entries.
#[derive(Debug, Serialize)]
pub(crate) struct Section<'a> {
    pub(crate) title: &'static str,
    pub(crate) entries: Vec<&'a CommitEntry>,
}

/// Classifies a subject line by its conventional-commit prefix.
///
/// # Examples
///
/// ```
/// use sortai::changelog::{categorize, Category};
///
/// assert_eq!(categorize("feat(ui): add button"), Category::Features);
/// assert_eq!(categorize("FIX: crash"), Category::BugFixes);
/// assert_eq!(categorize("docs: typo"), Category::Other);
/// ```
#[must_use]
pub fn categorize(subject: &str) -> Category {
    let subject = subject.trim();
    Category::PREFIXES
        .iter()
        .find(|(prefix, _)| {
            strip_prefix_ignore_case(subject, prefix)
                .is_some_and(|rest| rest.starts_with(':') || rest.starts_with('('))
        })
        .map_or(Category::Other, |(_, category)| *category)
}

/// Strips a recognized `type:` or `type(scope):` prefix from `subject`.
///
/// Falls back to the trimmed subject when nothing would be left.
#[must_use]
pub fn display_subject(subject: &str) -> String {
    let subject = subject.trim();

    for (prefix, _) in Category::PREFIXES {
        let Some(rest) = strip_prefix_ignore_case(subject, prefix) else {
            continue;
        };
        if let Some(message) = rest.strip_prefix(':') {
            return non_empty_or(message.trim_start(), subject);
        }
        if rest.starts_with('(') {
            if let Some(m) = SCOPED_PREFIX.find(subject) {
                return non_empty_or(subject[m.end()..].trim(), subject);
            }
        }
    }
    subject.to_string()
}

/// Turns commit records into changelog entries, preserving order.
#[must_use]
pub fn commits_to_entries(commits: &[CommitRecord]) -> Vec<CommitEntry> {
    commits
        .iter()
        .map(|commit| {
            let first_line = commit.message.lines().next().unwrap_or("").trim();
            let first_line = if first_line.is_empty() {
                EMPTY_SUBJECT
            } else {
                first_line
            };

            CommitEntry {
                short_hash: commit.hash.chars().take(SHORT_HASH_LEN).collect(),
                date: commit.committed_at.format("%Y-%m-%d").to_string(),
                subject: display_subject(first_line),
                category: categorize(first_line),
            }
        })
        .collect()
}

/// Renders entries as a Markdown changelog ending with a single newline.
///
/// Sections follow [`Category::ORDER`]; empty sections are omitted.
///
/// # Errors
///
/// Returns an error if the changelog template cannot be rendered.
pub fn render_markdown(entries: &[CommitEntry]) -> Result<String> {
    let sections: Vec<Section<'_>> = Category::ORDER
        .iter()
        .map(|&category| Section {
            title: category.title(),
            entries: entries.iter().filter(|e| e.category == category).collect(),
        })
        .filter(|section| !section.entries.is_empty())
        .collect();

    TemplateEngine::new()?.render_changelog(&sections)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn non_empty_or(candidate: &str, fallback: &str) -> String {
    if candidate.is_empty() {
        fallback.to_string()
    } else {
        candidate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, date: &str, message: &str) -> CommitRecord {
        CommitRecord {
            hash: hash.to_string(),
            committed_at: DateTime::parse_from_rfc3339(date).unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_categorize_and_display_subjects() {
        let subjects = ["feat(ui): add button", "fix: crash", "docs: typo"];

        let categories: Vec<&str> = subjects.iter().map(|s| categorize(s).title()).collect();
        let rendered: Vec<String> = subjects.iter().map(|s| display_subject(s)).collect();

        assert_eq!(categories, vec!["Features", "Bug Fixes", "Other"]);
        assert_eq!(rendered, vec!["add button", "crash", "docs: typo"]);
    }

    #[test]
    fn test_prefix_needs_separator() {
        assert_eq!(categorize("feature: big"), Category::Other);
        assert_eq!(categorize("fixes everything"), Category::Other);
        assert_eq!(categorize("Chore(deps): bump"), Category::Maintenance);
        assert_eq!(categorize("  feat: padded"), Category::Features);
    }

    #[test]
    fn test_display_subject_keeps_original_when_empty() {
        assert_eq!(display_subject("feat:"), "feat:");
        assert_eq!(display_subject("fix(core):   "), "fix(core):");
        assert_eq!(display_subject("FEAT: Shout"), "Shout");
        assert_eq!(display_subject("chore(ci): bump runner"), "bump runner");
        // Scope without a colon is not a recognized prefix.
        assert_eq!(display_subject("feat(ui) no colon"), "feat(ui) no colon");
    }

    #[test]
    fn test_commits_to_entries() {
        let commits = vec![
            record(
                "0123456789abcdef",
                "2024-03-05T23:30:00-05:00",
                "feat(api): add endpoint\n\nLonger body text.",
            ),
            record("fedcba9876543210", "2024-01-02T10:00:00+00:00", ""),
        ];

        let entries = commits_to_entries(&commits);

        assert_eq!(entries[0].short_hash, "0123456");
        assert_eq!(entries[0].date, "2024-03-05");
        assert_eq!(entries[0].subject, "add endpoint");
        assert_eq!(entries[0].category, Category::Features);
        assert_eq!(entries[1].subject, "(no message)");
        assert_eq!(entries[1].category, Category::Other);
    }

    #[test]
    fn test_render_markdown_groups_in_fixed_order() {
        let commits = vec![
            record("aaaaaaa1", "2024-05-03T12:00:00+00:00", "docs: typo"),
            record("bbbbbbb2", "2024-05-02T12:00:00+00:00", "fix: crash"),
            record("ccccccc3", "2024-05-01T12:00:00+00:00", "feat(ui): add button"),
            record("ddddddd4", "2024-04-30T12:00:00+00:00", "feat: dark mode"),
        ];

        let markdown = render_markdown(&commits_to_entries(&commits)).unwrap();

        assert_eq!(
            markdown,
            "# Changelog\n\
             \n\
             ## Features\n\
             \n\
             - add button (`ccccccc`, 2024-05-01)\n\
             - dark mode (`ddddddd`, 2024-04-30)\n\
             \n\
             ## Bug Fixes\n\
             \n\
             - crash (`bbbbbbb`, 2024-05-02)\n\
             \n\
             ## Other\n\
             \n\
             - docs: typo (`aaaaaaa`, 2024-05-03)\n"
        );
        assert!(!markdown.contains("## Maintenance"));
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_markdown(&[]).unwrap(), "# Changelog\n");
    }

    #[test]
    fn test_output_ends_with_single_newline() {
        let commits = vec![record("abc1234", "2024-01-01T00:00:00Z", "chore: tidy")];
        let markdown = render_markdown(&commits_to_entries(&commits)).unwrap();

        assert!(markdown.ends_with(")\n"));
        assert!(!markdown.ends_with("\n\n"));
    }
}
