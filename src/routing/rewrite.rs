//! Legacy asset path classification and rewriting.
//!
//! The MAP app historically served CMS-managed images from flat
//! `/uploads_cms/<owner>-<kind>-<size>/...` URLs. On disk they now live in a
//! nested `/uploads/<kind>/<owner>/<size>/...` layout. The classifier
//! recognizes the legacy shape and produces the canonical path, so old
//! markup keeps working without the backend ever seeing those requests.
//!
//! # Design Decisions
//! - Patterns are fully anchored; a rule either owns the whole path or does
//!   not fire at all
//! - Matches are extracted into named fields, and a rule with any missing
//!   capture does not fire (no partial rewrite is ever emitted)
//! - Pure string-to-string functions, no I/O

use regex::Regex;

/// A matched legacy asset path, decomposed into its named parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRewrite {
    pub owner: String,
    pub kind: String,
    pub size: String,
    pub rest: String,
}

impl AssetRewrite {
    /// The canonical path the asset lives at on disk.
    pub fn target_path(&self) -> String {
        format!(
            "/uploads/{}/{}/{}/{}",
            self.kind, self.owner, self.size, self.rest
        )
    }
}

/// One rewrite rule: an anchored pattern plus the typed extraction of its
/// captures.
#[derive(Debug)]
struct AssetRule {
    pattern: Regex,
}

impl AssetRule {
    fn cms_uploads() -> Self {
        // Anchored on both ends; sizes are at most 4 digits.
        let pattern =
            Regex::new(r"^/uploads_cms/(?P<owner>\w+)-(?P<kind>\w+)-(?P<size>\d{1,4})/(?P<rest>.+)$")
                .expect("legacy asset pattern is valid");
        Self { pattern }
    }

    fn apply(&self, path: &str) -> Option<AssetRewrite> {
        let captures = self.pattern.captures(path)?;
        // Every named group must have matched, or the rule does not fire.
        let owner = captures.name("owner")?.as_str().to_string();
        let kind = captures.name("kind")?.as_str().to_string();
        let size = captures.name("size")?.as_str().to_string();
        let rest = captures.name("rest")?.as_str().to_string();
        Some(AssetRewrite {
            owner,
            kind,
            size,
            rest,
        })
    }
}

/// Classifies request paths against the rewrite rules, first match wins.
///
/// Compiled once at startup and shared read-only across requests.
#[derive(Debug)]
pub struct PathClassifier {
    rules: Vec<AssetRule>,
}

impl PathClassifier {
    pub fn new() -> Self {
        Self {
            rules: vec![AssetRule::cms_uploads()],
        }
    }

    /// Match a request path against the rules.
    pub fn classify(&self, path: &str) -> Option<AssetRewrite> {
        self.rules.iter().find_map(|rule| rule.apply(path))
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new()
    }
}
