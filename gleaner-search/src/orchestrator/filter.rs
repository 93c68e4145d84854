//! Rejection policy for fetched candidates.
//!
//! Every check is evaluated so the log line for a rejected candidate carries
//! the full set of reasons, not just the first one that fired.

use std::collections::HashSet;

use crate::types::{FetchResult, RejectReason};

/// Collect every reason `outcome` must not be accepted.
///
/// `outcome` is expected to have the content policy (menu stripping and
/// truncation) already applied. An empty vector means accept.
pub fn rejection_reasons(
    outcome: &FetchResult,
    seen: &HashSet<String>,
    sentinels: &[String],
) -> Vec<RejectReason> {
    let page = match outcome {
        Ok(page) => page,
        Err(_) => return vec![RejectReason::EmptyResponse],
    };

    let mut reasons = Vec::new();
    if page.content.is_empty() {
        reasons.push(RejectReason::ContentEmpty);
    }
    if seen.contains(&page.content) {
        reasons.push(RejectReason::AlreadySeenContent);
    }
    if is_forbidden(&page.content, sentinels) {
        reasons.push(RejectReason::ContentForbidden);
    }
    reasons
}

/// Whether `content` is exactly one of the blocked-access sentinels.
fn is_forbidden(content: &str, sentinels: &[String]) -> bool {
    let content = content.trim();
    !content.is_empty() && sentinels.iter().any(|s| s.trim() == content)
}

/// Render reasons as a comma separated list for logging.
pub fn join_reasons(reasons: &[RejectReason]) -> String {
    reasons
        .iter()
        .map(RejectReason::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailure;
    use crate::types::Passage;

    fn sentinels() -> Vec<String> {
        vec!["Access Denied".into()]
    }

    #[test]
    fn viable_page_has_no_reasons() {
        let outcome = Ok(Passage::new("https://a.com", "A", "text"));
        assert!(rejection_reasons(&outcome, &HashSet::new(), &sentinels()).is_empty());
    }

    #[test]
    fn failed_fetch_is_empty_response() {
        let outcome = Err(FetchFailure::Status(500));
        assert_eq!(
            rejection_reasons(&outcome, &HashSet::new(), &sentinels()),
            vec![RejectReason::EmptyResponse]
        );
    }

    #[test]
    fn empty_content_rejected() {
        let outcome = Ok(Passage::new("https://a.com", "A", ""));
        assert_eq!(
            rejection_reasons(&outcome, &HashSet::new(), &sentinels()),
            vec![RejectReason::ContentEmpty]
        );
    }

    #[test]
    fn seen_content_rejected() {
        let seen: HashSet<String> = ["text1".to_string()].into_iter().collect();
        let outcome = Ok(Passage::new("https://c.com", "", "text1"));
        assert_eq!(
            rejection_reasons(&outcome, &seen, &sentinels()),
            vec![RejectReason::AlreadySeenContent]
        );
    }

    #[test]
    fn sentinel_content_rejected() {
        let outcome = Ok(Passage::new("https://a.com", "Oops", "Access Denied"));
        assert_eq!(
            rejection_reasons(&outcome, &HashSet::new(), &sentinels()),
            vec![RejectReason::ContentForbidden]
        );
    }

    #[test]
    fn sentinel_must_match_whole_content() {
        let outcome = Ok(Passage::new(
            "https://a.com",
            "Story",
            "Access Denied is a film about bureaucracy.",
        ));
        assert!(rejection_reasons(&outcome, &HashSet::new(), &sentinels()).is_empty());
    }

    #[test]
    fn reasons_are_unioned() {
        let seen: HashSet<String> = ["Access Denied".to_string()].into_iter().collect();
        let outcome = Ok(Passage::new("https://a.com", "", "Access Denied"));
        let reasons = rejection_reasons(&outcome, &seen, &sentinels());
        assert_eq!(
            reasons,
            vec![RejectReason::AlreadySeenContent, RejectReason::ContentForbidden]
        );
        assert_eq!(join_reasons(&reasons), "already_seen_content,content_forbidden");
    }
}
