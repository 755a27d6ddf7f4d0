//! Push Classifier — parses the `pre-push` hook's stdin protocol and
//! classifies the push into the touched tags/branches/deletes.
//!
//! Git invokes the `pre-push` hook with the remote name and URL as argv,
//! and feeds one line per ref update on stdin:
//! `<local ref> <local sha1> <remote ref> <remote sha1>`.

use std::io::BufRead;

use thiserror::Error;

/// All-zero SHA1, used by git to signal a ref deletion or a missing ref.
const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

/// Errors from parsing the pre-push hook protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// A stdin line did not have exactly four whitespace-separated fields.
    #[error("malformed pre-push hook line: '{0}'")]
    MalformedLine(String),

    /// Failed to read stdin.
    #[error("failed to read pre-push hook input: {0}")]
    Io(String),
}

/// Result alias for push classification.
pub type PushResult<T> = Result<T, PushError>;

/// One `<local ref> <local sha1> <remote ref> <remote sha1>` update, as fed
/// to the `pre-push` hook on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Local ref being pushed, e.g. `refs/heads/main`. Empty for a delete.
    pub local_ref: String,
    /// SHA1 the local ref points at. All-zero for a delete.
    pub local_sha: String,
    /// Remote ref being updated, e.g. `refs/heads/main`.
    pub remote_ref: String,
    /// SHA1 the remote ref currently points at. All-zero if the ref is new
    /// on the remote.
    pub remote_sha: String,
}

impl RefUpdate {
    /// Parse one stdin line. Fields must be separated by single spaces per
    /// the documented hook protocol.
    pub fn parse(line: &str) -> PushResult<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [local_ref, local_sha, remote_ref, remote_sha] = fields.as_slice() else {
            return Err(PushError::MalformedLine(line.to_string()));
        };
        Ok(Self {
            local_ref: (*local_ref).to_string(),
            local_sha: (*local_sha).to_string(),
            remote_ref: (*remote_ref).to_string(),
            remote_sha: (*remote_sha).to_string(),
        })
    }

    /// `true` if this update deletes the remote ref (all-zero local SHA).
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.local_sha == ZERO_SHA
    }

    /// `true` if the remote ref is `refs/tags/*`.
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.remote_ref.starts_with("refs/tags/")
    }

    /// `true` if the remote ref is `refs/heads/*`.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.remote_ref.starts_with("refs/heads/")
    }

    /// The short name of the ref (strips the `refs/{tags,heads}/` prefix).
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.remote_ref
            .strip_prefix("refs/tags/")
            .or_else(|| self.remote_ref.strip_prefix("refs/heads/"))
            .unwrap_or(&self.remote_ref)
    }
}

/// The classified summary of a push: which tags and branches are touched,
/// and whether any deletes are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushContext {
    /// Remote name the push targets (e.g. `origin`), from hook argv.
    pub remote_name: String,
    /// Remote URL, from hook argv.
    pub remote_url: String,
    /// Short names of tags being created or updated, in stdin order.
    pub tags: Vec<String>,
    /// Short names of branches being created or updated, in stdin order.
    pub branches: Vec<String>,
    /// `true` if any ref update in this push is a deletion.
    pub has_deletes: bool,
    /// The raw ref updates, in stdin order.
    pub updates: Vec<RefUpdate>,
}

/// Parse all `pre-push` hook stdin lines from `reader`.
pub fn parse_updates<R: BufRead>(reader: R) -> PushResult<Vec<RefUpdate>> {
    let mut updates = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| PushError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        updates.push(RefUpdate::parse(&line)?);
    }
    Ok(updates)
}

/// Classify a set of ref updates into a [`PushContext`].
///
/// Deletes (`is_delete()`) are recorded in `has_deletes` but contribute no
/// tag/branch name, since there is nothing new to interpolate or gate on.
#[must_use]
pub fn classify(remote_name: &str, remote_url: &str, updates: Vec<RefUpdate>) -> PushContext {
    let mut ctx = PushContext {
        remote_name: remote_name.to_string(),
        remote_url: remote_url.to_string(),
        ..Default::default()
    };

    for update in &updates {
        if update.is_delete() {
            ctx.has_deletes = true;
            continue;
        }
        if update.is_tag() {
            ctx.tags.push(update.short_name().to_string());
        } else if update.is_branch() {
            ctx.branches.push(update.short_name().to_string());
        }
    }

    ctx.updates = updates;
    ctx
}

/// Outcome of applying the push classifier's decision rules to a
/// classified push, before the `pre-push` stage is allowed to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushDecision {
    /// A ref deletion was pushed; skip all checks.
    SkipDelete,
    /// A pushed tag failed the minimum tag-semantics contract.
    InvalidTag(String),
    /// A pushed tag or branch doesn't match what's currently checked out;
    /// the hook's checks apply only to the current HEAD.
    SkipNotCurrent,
    /// Run the stage.
    Run,
}

/// Minimum tag-semantics contract: non-empty, begins with `v`, contains at
/// least one digit.
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    tag.len() > 1 && tag.starts_with('v') && tag.chars().any(|c| c.is_ascii_digit())
}

/// Apply the push classifier's decision rules (in order): delete pushes
/// skip everything; invalid tag semantics abort before any stage runs;
/// pushes of a tag/branch other than what's currently checked out skip the
/// stage; otherwise the stage runs.
#[must_use]
pub fn decide(
    ctx: &PushContext,
    current_branch: Option<&str>,
    current_tag: Option<&str>,
) -> PushDecision {
    if ctx.has_deletes {
        return PushDecision::SkipDelete;
    }

    for tag in &ctx.tags {
        if !is_valid_tag(tag) {
            return PushDecision::InvalidTag(tag.clone());
        }
    }

    let tag_mismatch = ctx.tags.iter().any(|t| Some(t.as_str()) != current_tag);
    let branch_mismatch = ctx.branches.iter().any(|b| Some(b.as_str()) != current_branch);
    if tag_mismatch || branch_mismatch {
        return PushDecision::SkipNotCurrent;
    }

    PushDecision::Run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_line() {
        let update = RefUpdate::parse(
            "refs/heads/main abc123 refs/heads/main def456",
        )
        .unwrap();
        assert_eq!(update.local_ref, "refs/heads/main");
        assert_eq!(update.local_sha, "abc123");
        assert_eq!(update.remote_ref, "refs/heads/main");
        assert_eq!(update.remote_sha, "def456");
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        assert!(RefUpdate::parse("refs/heads/main abc123").is_err());
    }

    #[test]
    fn delete_detected_by_zero_local_sha() {
        let update = RefUpdate::parse(&format!(
            "(delete) {} refs/heads/old abc123",
            ZERO_SHA
        ))
        .unwrap();
        assert!(update.is_delete());
    }

    #[test]
    fn tag_vs_branch_classification() {
        let tag = RefUpdate::parse("refs/tags/v1.0.0 a refs/tags/v1.0.0 b").unwrap();
        let branch = RefUpdate::parse("refs/heads/main a refs/heads/main b").unwrap();
        assert!(tag.is_tag());
        assert!(!tag.is_branch());
        assert!(branch.is_branch());
        assert!(!branch.is_tag());
    }

    #[test]
    fn short_name_strips_prefix() {
        let tag = RefUpdate::parse("refs/tags/v1.0.0 a refs/tags/v1.0.0 b").unwrap();
        assert_eq!(tag.short_name(), "v1.0.0");
    }

    #[test]
    fn classify_splits_tags_and_branches() {
        let updates = vec![
            RefUpdate::parse("refs/tags/v1.0.0 a refs/tags/v1.0.0 b").unwrap(),
            RefUpdate::parse("refs/heads/main c refs/heads/main d").unwrap(),
        ];
        let ctx = classify("origin", "git@example.com:demo.git", updates);
        assert_eq!(ctx.tags, vec!["v1.0.0".to_string()]);
        assert_eq!(ctx.branches, vec!["main".to_string()]);
        assert!(!ctx.has_deletes);
    }

    #[test]
    fn classify_records_deletes_without_naming() {
        let updates = vec![RefUpdate::parse(&format!(
            "(delete) {} refs/heads/old abc",
            ZERO_SHA
        ))
        .unwrap()];
        let ctx = classify("origin", "git@example.com:demo.git", updates);
        assert!(ctx.has_deletes);
        assert!(ctx.tags.is_empty());
        assert!(ctx.branches.is_empty());
    }

    #[test]
    fn parse_updates_skips_blank_lines() {
        let input = "refs/heads/main a refs/heads/main b\n\nrefs/heads/dev c refs/heads/dev d\n";
        let updates = parse_updates(input.as_bytes()).unwrap();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn valid_tag_requires_v_prefix_and_digit() {
        assert!(is_valid_tag("v1.0.0"));
        assert!(!is_valid_tag("release"));
        assert!(!is_valid_tag("v"));
        assert!(!is_valid_tag("vrelease"));
    }

    #[test]
    fn decide_skips_on_delete() {
        let updates =
            vec![RefUpdate::parse(&format!("(delete) {ZERO_SHA} refs/heads/old abc")).unwrap()];
        let ctx = classify("origin", "url", updates);
        assert_eq!(decide(&ctx, Some("old"), None), PushDecision::SkipDelete);
    }

    #[test]
    fn decide_rejects_invalid_tag() {
        let updates = vec![RefUpdate::parse("refs/tags/release a refs/tags/release b").unwrap()];
        let ctx = classify("origin", "url", updates);
        assert_eq!(
            decide(&ctx, None, Some("release")),
            PushDecision::InvalidTag("release".to_string())
        );
    }

    #[test]
    fn decide_skips_when_branch_not_current() {
        let updates = vec![RefUpdate::parse("refs/heads/feature a refs/heads/feature b").unwrap()];
        let ctx = classify("origin", "url", updates);
        assert_eq!(
            decide(&ctx, Some("main"), None),
            PushDecision::SkipNotCurrent
        );
    }

    #[test]
    fn decide_runs_when_branch_matches_current() {
        let updates = vec![RefUpdate::parse("refs/heads/main a refs/heads/main b").unwrap()];
        let ctx = classify("origin", "url", updates);
        assert_eq!(decide(&ctx, Some("main"), None), PushDecision::Run);
    }

    #[test]
    fn decide_runs_when_tag_matches_current() {
        let updates = vec![RefUpdate::parse("refs/tags/v1.0.0 a refs/tags/v1.0.0 b").unwrap()];
        let ctx = classify("origin", "url", updates);
        assert_eq!(decide(&ctx, None, Some("v1.0.0")), PushDecision::Run);
    }
}
