//! Colored terminal output and logging setup shared by the binaries.

use std::io::Write;

use crossterm::style::Stylize;
use scrivener_rs::{Message, MessageRole};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Printed when the chat window is about to be summarized.
pub const COMPACTION_BANNER: &str = "\n\n\n   ======== TRUNCATING CHAT =========  \n\n\n";

/// Separator between the answer and the saved-file report.
pub const RULE: &str = "============================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    User,
    Assistant,
    Pricing,
    Notice,
}

impl Tone {
    pub fn for_role(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Tone::User,
            MessageRole::Assistant | MessageRole::System => Tone::Assistant,
        }
    }
}

/// `text` wrapped in the escape codes for `tone`.
pub fn paint(tone: Tone, text: &str) -> String {
    match tone {
        Tone::User => text.green().to_string(),
        Tone::Assistant => text.cyan().to_string(),
        Tone::Pricing => text.yellow().to_string(),
        Tone::Notice => text.magenta().to_string(),
    }
}

pub fn say(tone: Tone, text: &str) {
    println!("{}", paint(tone, text));
}

/// Print a streamed fragment without a newline and flush it out.
pub fn stream(tone: Tone, fragment: &str) {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{}", paint(tone, fragment));
    let _ = out.flush();
}

/// Echo a saved conversation, colored by role.
pub fn echo_history(messages: &[Message]) {
    for message in messages {
        say(Tone::for_role(message.role), &message.content);
    }
}

/// Show the input prompt label and leave the cursor after it.
pub fn input_label(label: &str) {
    stream(Tone::User, label);
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_keeps_text() {
        // Escapes are dropped when NO_COLOR is set, so only the text is checked.
        for tone in [Tone::User, Tone::Assistant, Tone::Pricing, Tone::Notice] {
            assert!(paint(tone, "hello").contains("hello"));
        }
    }

    #[test]
    fn roles_map_to_tones() {
        assert_eq!(Tone::for_role(MessageRole::User), Tone::User);
        assert_eq!(Tone::for_role(MessageRole::Assistant), Tone::Assistant);
    }
}
