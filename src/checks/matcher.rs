use crate::db::enums::CheckStatus;
use crate::db::models::Client;
use crate::mailbox::Message;

/// A message relevant to one client, with the severity its markers indicate.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub severity: CheckStatus,
    pub message: &'a Message,
}

/// Decides whether `message` satisfies the client's expected-subject rule and
/// classifies it. `None` means the message is irrelevant to this client.
/// Pure function of its inputs.
pub fn classify<'a>(message: &'a Message, client: &Client) -> Option<MatchResult<'a>> {
    if !pattern_matches(&message.subject, &client.pattern, client.wildcard) {
        return None;
    }
    Some(MatchResult {
        severity: classify_severity(message, client),
        message,
    })
}

/// Case-insensitive substring containment, or ordered `*`-fragment matching
/// when the client opted into wildcards.
pub fn pattern_matches(subject: &str, pattern: &str, wildcard: bool) -> bool {
    let subject = subject.to_lowercase();
    let pattern = pattern.to_lowercase();
    if wildcard {
        wildcard_match(&subject, &pattern)
    } else {
        subject.contains(&pattern)
    }
}

fn wildcard_match(subject: &str, pattern: &str) -> bool {
    let mut position = 0;
    for fragment in pattern.split('*').filter(|f| !f.is_empty()) {
        match subject[position..].find(fragment) {
            Some(found) => position += found + fragment.len(),
            None => return false,
        }
    }
    true
}

fn classify_severity(message: &Message, client: &Client) -> CheckStatus {
    let haystack = format!("{}\n{}", message.subject, message.body).to_lowercase();
    // FAILED outranks WARNING when both markers are present.
    if keyword_hit(&haystack, &client.failure_keyword) {
        CheckStatus::Failed
    } else if keyword_hit(&haystack, &client.warning_keyword) {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}

fn keyword_hit(haystack: &str, keyword: &str) -> bool {
    !keyword.is_empty() && haystack.contains(&keyword.to_lowercase())
}
