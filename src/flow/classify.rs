use chrono::NaiveDate;

/// Reserved navigation tokens, checked before any state handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Stop,
    Back,
}

/// Cancellation / reschedule triggers for the contact-request side flow.
const CANCELLATION_KEYWORDS: [&str; 4] = ["reschedule", "cancel", "refund", "money back"];

/// Trims whitespace and trailing periods, so "2." selects option "2".
pub fn normalize(text: &str) -> &str {
    text.trim().trim_end_matches('.').trim_end()
}

pub fn control_token(text: &str) -> Option<Control> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("stop") {
        Some(Control::Stop)
    } else if text.eq_ignore_ascii_case("back") {
        Some(Control::Back)
    } else {
        None
    }
}

pub fn contains_cancellation_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    CANCELLATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn is_ten_digit_phone(text: &str) -> bool {
    text.len() == 10 && text.chars().all(|c| c.is_ascii_digit())
}

/// Heuristic behind the reprompt policy: a short alphanumeric token reads
/// as an attempted option id and gets a terse reprompt, anything else reads
/// as a question and gets a FAQ-assisted reply. Never both.
pub fn looks_like_attempted_id(text: &str) -> bool {
    !text.is_empty() && text.len() <= 12 && text.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Digits and dashes only, i.e. someone tried to type a date rather than
/// ask a question.
pub fn looks_like_date(text: &str) -> bool {
    !text.is_empty()
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || c == '-')
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}
