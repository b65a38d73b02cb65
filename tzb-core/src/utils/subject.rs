/// Longest subject the chat service accepts for a topic.
pub const SUBJECT_MAX_CHARS: usize = 60;

const ELLIPSIS: &str = "...";

/// Shortens `subject` to at most [`SUBJECT_MAX_CHARS`] characters.
///
/// Longer input keeps its first 57 characters followed by `...`.
pub fn shorten_subject(subject: &str) -> String {
    if subject.chars().count() <= SUBJECT_MAX_CHARS {
        return subject.to_owned();
    }
    let mut short: String = subject
        .chars()
        .take(SUBJECT_MAX_CHARS - ELLIPSIS.len())
        .collect();
    short.push_str(ELLIPSIS);
    short
}
