//! Token accounting: how big the active window is and what sending it costs.
//!
//! Counting goes through the [`Tokenizer`] seam. [`TokenAccountant::for_model`]
//! picks the model's BPE encoding ([`BpeTokenizer`]) and only falls back to the
//! [`CharRatioTokenizer`] estimate for models tiktoken does not know.

use crate::Message;
use crate::api::pricing::{ModelPricing, pricing_for_model};
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Characters per token assumed by the fallback estimate.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Turns text into model tokens.
pub trait Tokenizer: Send + Sync {
    /// Token ids for `text`. Must be deterministic.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// The model's own byte-pair encoding.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// Encoding used by `model`, or `None` if tiktoken has no mapping for it.
    pub fn for_model(model: &str) -> Option<Self> {
        tiktoken_rs::get_bpe_from_model(model)
            .ok()
            .map(|bpe| Self { bpe })
    }

    /// The `cl100k_base` encoding (gpt-4, gpt-3.5-turbo).
    pub fn cl100k() -> Option<Self> {
        tiktoken_rs::cl100k_base().ok().map(|bpe| Self { bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|id| id as u32)
            .collect()
    }
}

/// Fixed chars-per-token estimate for models without a known encoding.
///
/// Only `count` is meaningful. `encode` returns one placeholder id per
/// estimated token so the two agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatioTokenizer {
    chars_per_token: f64,
}

impl CharRatioTokenizer {
    /// Ratios below one character per token are clamped to one.
    pub fn new(chars_per_token: f64) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1.0),
        }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl Default for CharRatioTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl Tokenizer for CharRatioTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        vec![0; self.count(text)]
    }

    fn count(&self, text: &str) -> usize {
        let chars = text.chars().count();
        (chars as f64 / self.chars_per_token).ceil() as usize
    }
}

/// Counts tokens and prices prompts for one model.
pub struct TokenAccountant {
    model: String,
    tokenizer: Box<dyn Tokenizer>,
    pricing: ModelPricing,
}

impl TokenAccountant {
    /// Accountant for `model` with its BPE encoding and listed prompt rate.
    /// Unknown models are counted with the char-ratio estimate.
    pub fn for_model(model: impl Into<String>) -> Self {
        let model = model.into();
        match BpeTokenizer::for_model(&model) {
            Some(bpe) => Self::with_boxed(model, Box::new(bpe)),
            None => {
                warn!("No BPE encoding known for {model}, estimating tokens from length");
                Self::estimated(model)
            }
        }
    }

    /// Accountant that always uses the char-ratio estimate.
    pub fn estimated(model: impl Into<String>) -> Self {
        Self::with_boxed(model.into(), Box::new(CharRatioTokenizer::default()))
    }

    fn with_boxed(model: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        let pricing = pricing_for_model(&model);
        Self {
            model,
            tokenizer,
            pricing,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn pricing(&self) -> ModelPricing {
        self.pricing
    }

    /// Token count of `text`. Zero for the empty string.
    pub fn count(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Sum of the content token counts of `messages`.
    pub fn count_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count(&m.content)).sum()
    }

    /// `tokens / 1000 * rate`. Informational only.
    pub fn estimate_cost(&self, tokens: usize) -> f64 {
        self.pricing.estimate_cost(tokens)
    }

    /// The one-line summary shown before each turn.
    pub fn pricing_line(&self, tokens: usize) -> String {
        format!(
            "Token count: {tokens}, price at this context: ${:.2} USD",
            self.estimate_cost(tokens)
        )
    }
}

impl std::fmt::Debug for TokenAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccountant")
            .field("model", &self.model)
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_tokens() {
        assert_eq!(TokenAccountant::for_model("gpt-4").count(""), 0);
        assert_eq!(TokenAccountant::estimated("gpt-4").count(""), 0);
        assert!(CharRatioTokenizer::default().encode("").is_empty());
    }

    const CODE_SAMPLE: &str = "\
import numpy as np


def moving_average(values: np.ndarray, window: int) -> np.ndarray:
    \"\"\"Mean of each run of `window` values.\"\"\"
    kernel = np.ones(window) / window
    return np.convolve(values, kernel, mode=\"valid\")


if __name__ == \"__main__\":
    print(moving_average(np.arange(10.0), 3))
";

    #[test]
    fn gpt4_counts_with_its_bpe() {
        let accountant = TokenAccountant::for_model("gpt-4");
        let bpe = tiktoken_rs::get_bpe_from_model("gpt-4").unwrap();
        for text in ["hello world", CODE_SAMPLE, "héllo wörld ✓"] {
            assert_eq!(
                accountant.count(text),
                bpe.encode_with_special_tokens(text).len(),
                "{text:?}"
            );
        }
        assert_eq!(accountant.count("hello world"), 2);
    }

    #[test]
    fn bpe_ids_are_real_encodings() {
        let tok = BpeTokenizer::cl100k().unwrap();
        let ids = tok.encode("hello world");
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(tok.encode("hello world"), ids);
    }

    #[test]
    fn unknown_model_falls_back_to_estimate() {
        assert!(BpeTokenizer::for_model("not-a-real-model").is_none());
        let accountant = TokenAccountant::for_model("not-a-real-model");
        assert_eq!(accountant.count("abcd"), 2);
    }

    #[test]
    fn char_ratio_rounds_up() {
        let tok = CharRatioTokenizer::default();
        assert_eq!(tok.count("a"), 1);
        assert_eq!(tok.count("abc"), 1);
        assert_eq!(tok.count("abcd"), 2);
        assert_eq!(tok.count("abcdefg"), 2);
        assert_eq!(tok.count("abcdefgh"), 3);
    }

    #[test]
    fn estimate_encode_agrees_with_count() {
        let tok = CharRatioTokenizer::default();
        for text in ["", "x", "hello world", "héllo wörld ✓ multibyte"] {
            assert_eq!(tok.encode(text).len(), tok.count(text), "{text:?}");
        }
    }

    #[test]
    fn ratio_is_clamped() {
        assert_eq!(CharRatioTokenizer::new(0.0).count("abc"), 3);
    }

    #[test]
    fn messages_sum_content_tokens() {
        let accountant = TokenAccountant::estimated("gpt-4");
        let messages = vec![Message::user("abcdefg"), Message::assistant("abc")];
        assert_eq!(accountant.count_messages(&messages), 3);
        assert_eq!(accountant.count_messages(&[]), 0);
    }

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> Vec<u32> {
            text.split_whitespace().map(|w| w.len() as u32).collect()
        }
    }

    #[test]
    fn custom_tokenizer_is_used() {
        let accountant = TokenAccountant::estimated("gpt-4").with_tokenizer(WordTokenizer);
        assert_eq!(accountant.count("one two three"), 3);
    }

    #[test]
    fn pricing_line_uses_model_rate() {
        let accountant = TokenAccountant::estimated("gpt-4");
        assert!((accountant.estimate_cost(2000) - 0.06).abs() < 1e-9);
        assert_eq!(
            accountant.pricing_line(2000),
            "Token count: 2000, price at this context: $0.06 USD"
        );
    }
}
