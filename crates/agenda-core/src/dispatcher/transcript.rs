//! Conversation transcript rendering

use std::fmt;

use crate::assistant::ThreadMessage;

/// One rendered thread message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub role: String,
    pub text: String,
}

impl TranscriptLine {
    pub(crate) fn from_message(message: &ThreadMessage) -> Self {
        Self {
            role: message.role.clone(),
            text: message.text_content(),
        }
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", capitalize(&self.role), self.text)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
