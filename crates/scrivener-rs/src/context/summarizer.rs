//! The compaction instruction and how resumed sessions find it again.
//!
//! Compaction sends a fixed instruction as a user message asking the model to
//! summarize the chat for itself. Because the instruction text never varies,
//! its last occurrence in a saved history marks where the live window began
//! after the most recent compaction.

use crate::{Message, MessageRole};

/// Sent as a user message when the active window runs over budget.
///
/// Kept byte-for-byte stable: resume matches on it.
pub const COMPACTION_INSTRUCTION: &str = " SYSTEM MESSAGE, YOU ARE AN OPENAI LLM CHATBOT, \
AND HAVE A MAXIMUM TOKEN CONTEXT OF 8000 TOKENS. \
THE END USER THAT YOU HAVE BEEN CHATTING WITH WANTS TO CONTINUE THE CONVERSATION, \
AND DOES NOT WANT TO LOSE THE CONTEXT OF THE CONVERSATION. \
PLEASE SUMMARIZE FOR YOURSELF THE CHAT SO FAR, AND INCLUDE INFORMATION THAT YOU BELIEVE \
THE END USER WOULD FIND IMPORTANT. \
THE RESPONSE YOU GENERATE WILL BE PASSED INTO THE NEXT ITERATION. \
PREVIOUS MESSAGES WILL BE OMITTED. \
GIVE YOURSELF AS MUCH RELEVANT CONTEXT AS POSSIBLE. \
YOUR RESPONSE SHOULD BE LONG, AT LEAST 1000 WORDS. \
INCLUDE ANY MATHEMATICAL CALCULATIONS IN DETAIL, BUT ONLY IF THEY ARE CORRECT. \
THE END USER WILL NOT SEE THIS MESSAGE OR YOUR RESPONSE. ";

/// Whether `message` is a compaction instruction.
pub fn is_compaction_instruction(message: &Message) -> bool {
    message.role == MessageRole::User && message.content.trim() == COMPACTION_INSTRUCTION.trim()
}

/// Index of the last compaction instruction in `history`, if any.
pub fn last_compaction(history: &[Message]) -> Option<usize> {
    history.iter().rposition(is_compaction_instruction)
}

/// The active window a resumed session starts from: everything after the
/// last compaction instruction, or the whole history when there is none.
pub fn resume_window(history: &[Message]) -> &[Message] {
    match last_compaction(history) {
        Some(k) => &history[k + 1..],
        None => history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_is_a_single_line() {
        assert!(!COMPACTION_INSTRUCTION.contains('\n'));
        assert!(COMPACTION_INSTRUCTION.contains("TOKEN CONTEXT OF 8000 TOKENS. THE END USER"));
        assert!(COMPACTION_INSTRUCTION.ends_with("OR YOUR RESPONSE. "));
    }

    #[test]
    fn only_user_messages_count_as_instructions() {
        assert!(is_compaction_instruction(&Message::user(COMPACTION_INSTRUCTION)));
        assert!(is_compaction_instruction(&Message::user(
            COMPACTION_INSTRUCTION.trim()
        )));
        assert!(!is_compaction_instruction(&Message::assistant(
            COMPACTION_INSTRUCTION
        )));
    }

    #[test]
    fn resume_starts_after_last_instruction() {
        let history = vec![
            Message::user("a"),
            Message::user(COMPACTION_INSTRUCTION),
            Message::assistant("summary 1"),
            Message::user("b"),
            Message::user(COMPACTION_INSTRUCTION),
            Message::assistant("summary 2"),
            Message::user("c"),
            Message::assistant("d"),
        ];
        assert_eq!(last_compaction(&history), Some(4));
        assert_eq!(resume_window(&history), &history[5..]);
    }

    #[test]
    fn resume_without_instruction_keeps_everything() {
        let history = vec![Message::user("a"), Message::assistant("b")];
        assert_eq!(resume_window(&history), history.as_slice());
        assert!(resume_window(&[]).is_empty());
    }
}
