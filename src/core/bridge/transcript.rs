//! Conversation transcript accumulated over a bridge session.

/// Ordered transcript of caller and assistant utterances.
///
/// Caller entries render as `user: ...` with no separator of their own
/// (the transcription backend terminates its text); assistant entries get
/// a trailing newline.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

#[derive(Debug)]
enum Entry {
    User(String),
    Assistant(String),
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, text: &str) {
        self.entries.push(Entry::User(text.to_string()));
    }

    pub fn add_assistant(&mut self, text: &str) {
        self.entries.push(Entry::Assistant(text.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full transcript as a single string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                Entry::User(text) => {
                    out.push_str("user: ");
                    out.push_str(text);
                }
                Entry::Assistant(text) => {
                    out.push_str("assistant: ");
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        out
    }
}
