//! Conversation state machine
//!
//! Owns the message log, the single outstanding request and the input
//! buffer. Request state only moves Idle -> Pending -> Idle: [`submit`]
//! enters Pending and [`resolve`] leaves it. While a request is outstanding,
//! the rendered view ends with one [`Entry::Pending`]. The log itself never
//! stores a placeholder.
//!
//! [`submit`]: Conversation::submit
//! [`resolve`]: Conversation::resolve

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{Ask, QueryError};
use crate::input::InputBuffer;
use crate::state::{timestamp_now, Message};

pub const GREETING: &str = "Hi! How can I help with your trading questions today?";

/// Shown in place of an empty answer
pub const EMPTY_ANSWER_PLACEHOLDER: &str = "…";

/// Why a submission was ignored. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("input is empty")]
    EmptyInput,
    #[error("a request is already in flight")]
    RequestInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub question: String,
    pub since: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    pub pending: Option<PendingRequest>,
    pub last_error: Option<String>,
}

/// One row of the rendered conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    Message(&'a Message),
    Pending { since: &'a str },
}

/// Read-only snapshot for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView<'a> {
    pub entries: Vec<Entry<'a>>,
    /// Empty when there is no error to show
    pub error: &'a str,
    pub submit_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    request: RequestState,
    input: InputBuffer,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
            request: RequestState::default(),
            input: InputBuffer::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn request(&self) -> &RequestState {
        &self.request
    }

    pub fn is_pending(&self) -> bool {
        self.request.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.request.last_error.as_deref()
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputBuffer {
        &mut self.input
    }

    /// Start a turn with `text`. On success the trimmed question is returned
    /// and must be answered through [`resolve`](Self::resolve).
    pub fn submit(&mut self, text: &str) -> Result<String, SubmitError> {
        let question = text.trim();
        if question.is_empty() {
            debug!("ignoring empty submission");
            return Err(SubmitError::EmptyInput);
        }
        if self.is_pending() {
            debug!("ignoring submission while a request is in flight");
            return Err(SubmitError::RequestInFlight);
        }

        let question = question.to_string();
        self.request.last_error = None;
        self.request.pending = Some(PendingRequest {
            question: question.clone(),
            since: timestamp_now(),
        });
        self.messages.push(Message::user(question.clone()));
        self.input.clear();

        info!(chars = question.chars().count(), "question submitted");
        Ok(question)
    }

    /// Submit whatever is currently typed in the input buffer
    pub fn submit_input(&mut self) -> Result<String, SubmitError> {
        let text = self.input.as_str().to_string();
        self.submit(&text)
    }

    /// Enter submits the input; Shift+Enter does nothing
    pub fn on_enter(&mut self, shift: bool) -> Option<String> {
        if shift {
            return None;
        }
        self.submit_input().ok()
    }

    /// Finish the outstanding request. Returns false if nothing was pending.
    pub fn resolve(&mut self, result: Result<String, QueryError>) -> bool {
        if self.request.pending.take().is_none() {
            warn!("ignoring answer with no request in flight");
            return false;
        }

        match result {
            Ok(answer) => {
                let text = if answer.trim().is_empty() {
                    EMPTY_ANSWER_PLACEHOLDER.to_string()
                } else {
                    answer
                };
                self.messages.push(Message::assistant(text));
                info!("answer received");
            }
            Err(e) => {
                info!(error = %e, "question failed");
                self.request.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Run a whole turn against `asker`: submit the input, wait, resolve.
    /// Returns `None` if the submission was ignored.
    pub async fn ask_with(&mut self, asker: &dyn Ask) -> Option<Result<(), QueryError>> {
        let question = self.submit_input().ok()?;
        let result = asker.ask(&question).await;
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.resolve(result);
        Some(outcome)
    }

    pub fn view(&self) -> ConversationView<'_> {
        let mut entries: Vec<Entry<'_>> = self.messages.iter().map(Entry::Message).collect();
        if let Some(pending) = &self.request.pending {
            entries.push(Entry::Pending {
                since: &pending.since,
            });
        }

        ConversationView {
            entries,
            error: self.request.last_error.as_deref().unwrap_or(""),
            submit_disabled: self.is_pending() || self.input.is_blank(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Sender;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn pending_count(conversation: &Conversation) -> usize {
        conversation
            .view()
            .entries
            .iter()
            .filter(|entry| matches!(entry, Entry::Pending { .. }))
            .count()
    }

    struct Canned {
        reply: Result<String, QueryError>,
        seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: Result<String, QueryError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Ask for Canned {
        async fn ask(&self, question: &str) -> Result<String, QueryError> {
            self.seen.lock().unwrap().push(question.to_string());
            self.reply.clone()
        }
    }

    #[test]
    fn test_initial_state() {
        let conversation = Conversation::new();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].sender, Sender::Assistant);
        assert_eq!(conversation.messages()[0].text, GREETING);
        assert!(!conversation.is_pending());
        assert_eq!(conversation.last_error(), None);

        let view = conversation.view();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.error, "");
        assert!(view.submit_disabled);
    }

    #[test]
    fn test_successful_turn() {
        let mut conversation = Conversation::new();
        let question = conversation.submit("AAPL price?").unwrap();
        assert_eq!(question, "AAPL price?");

        // Mid-flight: greeting, user, pending
        let view = conversation.view();
        assert_eq!(view.entries.len(), 3);
        assert!(matches!(view.entries[1], Entry::Message(m) if m.sender == Sender::User));
        assert!(matches!(view.entries[2], Entry::Pending { .. }));
        assert!(view.submit_disabled);
        assert!(conversation.is_pending());

        assert!(conversation.resolve(Ok("150.23".to_string())));

        let messages = conversation.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "AAPL price?");
        assert_eq!(messages[2].sender, Sender::Assistant);
        assert_eq!(messages[2].text, "150.23");
        assert_eq!(conversation.view().entries.len(), 3);
        assert_eq!(pending_count(&conversation), 0);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn test_blank_submission_is_ignored() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.submit("  "), Err(SubmitError::EmptyInput));
        assert_eq!(conversation.messages().len(), 1);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn test_submission_while_pending_is_ignored() {
        let mut conversation = Conversation::new();
        conversation.submit("first").unwrap();
        conversation.input_mut().set("second");

        assert_eq!(conversation.submit("second"), Err(SubmitError::RequestInFlight));
        assert_eq!(conversation.on_enter(false), None);
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(pending_count(&conversation), 1);
        // Input is kept so the user can send it once the answer arrives
        assert_eq!(conversation.input().as_str(), "second");
    }

    #[test]
    fn test_failed_turn_sets_error() {
        let mut conversation = Conversation::new();
        conversation.submit("status?").unwrap();
        assert!(conversation.resolve(Err(QueryError::NoResponse)));

        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].sender, Sender::User);
        assert_eq!(
            conversation.last_error(),
            Some("no response from server, check connection.")
        );
        assert_eq!(conversation.view().error, "no response from server, check connection.");
        assert_eq!(pending_count(&conversation), 0);
        assert!(!conversation.is_pending());
    }

    #[test]
    fn test_next_submission_clears_error() {
        let mut conversation = Conversation::new();
        conversation.submit("one").unwrap();
        conversation.resolve(Err(QueryError::Server("Internal Error: boom".to_string())));
        assert_eq!(conversation.last_error(), Some("Internal Error: boom"));

        conversation.submit("two").unwrap();
        assert_eq!(conversation.last_error(), None);
    }

    #[test]
    fn test_blank_answer_uses_placeholder() {
        let mut conversation = Conversation::new();
        conversation.submit("anything?").unwrap();
        conversation.resolve(Ok("   ".to_string()));
        assert_eq!(conversation.messages()[2].text, EMPTY_ANSWER_PLACEHOLDER);
    }

    #[test]
    fn test_resolve_without_request_is_ignored() {
        let mut conversation = Conversation::new();
        assert!(!conversation.resolve(Ok("stray".to_string())));
        assert!(!conversation.resolve(Err(QueryError::NoResponse)));
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.last_error(), None);
    }

    #[test]
    fn test_enter_submits_trimmed_input_and_clears_it() {
        let mut conversation = Conversation::new();
        conversation.input_mut().set("  TSLA outlook  ");
        assert!(!conversation.view().submit_disabled);

        assert_eq!(conversation.on_enter(true), None);
        assert_eq!(conversation.messages().len(), 1);

        assert_eq!(conversation.on_enter(false), Some("TSLA outlook".to_string()));
        assert_eq!(conversation.messages()[1].text, "TSLA outlook");
        assert_eq!(conversation.input().as_str(), "");
        assert_eq!(conversation.input().cursor(), 0);
    }

    #[test]
    fn test_at_most_one_pending_entry() {
        let mut conversation = Conversation::new();
        for round in 0..5 {
            conversation.submit(&format!("q{}", round)).unwrap();
            let _ = conversation.submit("again");
            assert_eq!(pending_count(&conversation), 1);
            assert!(matches!(
                conversation.view().entries.last(),
                Some(Entry::Pending { .. })
            ));
            if round % 2 == 0 {
                conversation.resolve(Ok(format!("a{}", round)));
            } else {
                conversation.resolve(Err(QueryError::NoResponse));
            }
            assert_eq!(pending_count(&conversation), 0);
        }
        // 5 user messages plus 3 answers on top of the greeting
        assert_eq!(conversation.messages().len(), 9);
    }

    #[tokio::test]
    async fn test_ask_with_round_trip() {
        let asker = Canned::new(Ok("150.23".to_string()));
        let mut conversation = Conversation::new();
        conversation.input_mut().set(" AAPL price? ");

        let outcome = conversation.ask_with(&asker).await;
        assert_eq!(outcome, Some(Ok(())));
        assert_eq!(*asker.seen.lock().unwrap(), vec!["AAPL price?".to_string()]);
        assert_eq!(conversation.messages().len(), 3);
        assert_eq!(conversation.messages()[2].text, "150.23");
    }

    #[tokio::test]
    async fn test_ask_with_failure_and_blank_input() {
        let asker = Canned::new(Err(QueryError::NoResponse));
        let mut conversation = Conversation::new();

        assert_eq!(conversation.ask_with(&asker).await, None);
        assert!(asker.seen.lock().unwrap().is_empty());

        conversation.input_mut().set("status?");
        let outcome = conversation.ask_with(&asker).await;
        assert_eq!(outcome, Some(Err(QueryError::NoResponse)));
        assert_eq!(conversation.messages().len(), 2);
        assert!(!conversation.is_pending());
    }
}
