//! The active window of an unbounded chat.
//!
//! [`ContextWindowManager`] keeps two message lists: the full history, which
//! only ever grows and is persisted after every turn, and the active window
//! actually sent to the model. When the window's token count runs over the
//! compaction ceiling, one extra completion asks the model to summarize the
//! chat for itself, and the window is cut down to its most recent messages
//! (the summary included) before the user's prompt goes out.

use crate::api::client::CompletionService;
use crate::context::budget::TokenAccountant;
use crate::context::history::HistoryStore;
use crate::context::summarizer::{COMPACTION_INSTRUCTION, resume_window};
use crate::session::{CompletionSession, Exchange};
use crate::{DEFAULT_MODEL, Message, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Window sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Maximum context of the model, in tokens.
    pub context_limit: usize,
    /// Compact when the window holds more than this many tokens.
    pub compaction_ceiling: usize,
    /// Messages kept after a compaction.
    pub tail_size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            context_limit: 8000,
            compaction_ceiling: 6500,
            tail_size: 6,
        }
    }
}

impl WindowConfig {
    pub fn with_context_limit(mut self, tokens: usize) -> Self {
        self.context_limit = tokens;
        self
    }

    pub fn with_compaction_ceiling(mut self, tokens: usize) -> Self {
        self.compaction_ceiling = tokens;
        self
    }

    pub fn with_tail_size(mut self, messages: usize) -> Self {
        self.tail_size = messages;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Active,
    /// A summary request is in flight.
    Compacting,
}

/// Progress reported while a turn runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnEvent<'a> {
    /// Size and price of the window at the start of the turn.
    Budget { tokens: usize, line: &'a str },
    /// The window is over budget and is about to be summarized.
    Compacting { tokens: usize },
    /// Text of the summary as it streams in.
    SummaryFragment(&'a str),
    /// Text of the answer as it streams in.
    Fragment(&'a str),
}

/// What one turn did.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub exchange: Exchange,
    /// Window tokens measured before anything was sent.
    pub window_tokens: usize,
    pub compacted: bool,
    /// Snapshot written for this turn, when a store is attached.
    pub snapshot: Option<PathBuf>,
}

pub struct ContextWindowManager {
    config: WindowConfig,
    accountant: TokenAccountant,
    state: WindowState,
    window: Vec<Message>,
    history: Vec<Message>,
    store: Option<HistoryStore>,
}

impl ContextWindowManager {
    /// Empty conversation.
    pub fn new(config: WindowConfig, accountant: TokenAccountant) -> Self {
        Self {
            config,
            accountant,
            state: WindowState::Active,
            window: Vec::new(),
            history: Vec::new(),
            store: None,
        }
    }

    /// Pick up a saved conversation. The window starts after the last
    /// compaction instruction in `history`.
    pub fn resume(history: Vec<Message>, config: WindowConfig, accountant: TokenAccountant) -> Self {
        let window = resume_window(&history).to_vec();
        debug!(
            "Resumed {} message(s), {} in the active window",
            history.len(),
            window.len()
        );
        Self {
            window,
            history,
            ..Self::new(config, accountant)
        }
    }

    /// Load from `store` (unless `fresh`) and persist every turn back to it.
    pub fn open(
        store: HistoryStore,
        fresh: bool,
        config: WindowConfig,
        accountant: TokenAccountant,
    ) -> Result<Self> {
        let history = if fresh { Vec::new() } else { store.load()? };
        Ok(Self::resume(history, config, accountant).with_store(store))
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn accountant(&self) -> &TokenAccountant {
        &self.accountant
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Messages sent with the next prompt.
    pub fn window(&self) -> &[Message] {
        &self.window
    }

    /// Every exchange so far, compactions included.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn window_tokens(&self) -> usize {
        self.accountant.count_messages(&self.window)
    }

    /// Run one user turn: compact at most once, submit `prompt` against the
    /// window, record the exchange and persist the history.
    pub async fn turn<S: CompletionService>(
        &mut self,
        session: &mut CompletionSession<S>,
        prompt: &str,
        mut on_event: impl FnMut(TurnEvent<'_>),
    ) -> Result<TurnOutcome> {
        let tokens = self.window_tokens();
        let line = self.accountant.pricing_line(tokens);
        on_event(TurnEvent::Budget {
            tokens,
            line: &line,
        });
        debug!(
            "Active window: {} message(s), {tokens}/{} tokens",
            self.window.len(),
            self.config.context_limit
        );

        let compacted = tokens > self.config.compaction_ceiling;
        if compacted {
            on_event(TurnEvent::Compacting { tokens });
            self.compact(session, &mut on_event).await?;
        }

        let exchange = session
            .complete(prompt, &self.window, |f| on_event(TurnEvent::Fragment(f)))
            .await?;
        self.history.extend_from_slice(exchange.last_pair());
        self.window = exchange.messages.clone();

        let snapshot = match &self.store {
            Some(store) => Some(store.save(&self.history)?),
            None => None,
        };

        Ok(TurnOutcome {
            exchange,
            window_tokens: tokens,
            compacted,
            snapshot,
        })
    }

    async fn compact<S: CompletionService>(
        &mut self,
        session: &mut CompletionSession<S>,
        on_event: &mut impl FnMut(TurnEvent<'_>),
    ) -> Result<()> {
        self.state = WindowState::Compacting;
        let result = session
            .complete(COMPACTION_INSTRUCTION, &self.window, |f| {
                on_event(TurnEvent::SummaryFragment(f))
            })
            .await;
        self.state = WindowState::Active;
        let exchange = result?;

        self.history.extend_from_slice(exchange.last_pair());
        let keep_from = exchange
            .messages
            .len()
            .saturating_sub(self.config.tail_size);
        self.window = exchange.messages[keep_from..].to_vec();
        info!(
            "Compacted window to {} message(s) ({} tokens)",
            self.window.len(),
            self.window_tokens()
        );
        Ok(())
    }
}

impl Default for ContextWindowManager {
    fn default() -> Self {
        Self::new(
            WindowConfig::default(),
            TokenAccountant::for_model(DEFAULT_MODEL),
        )
    }
}
