//! Conversation Controller
//!
//! Owns the chat history and drives [`PersonaExtractor`] one turn at a time
//! until the model hands back a profile.
//!
//! ```text
//!  NotStarted ──start()──▶ InProgress ──respond()──▶ InProgress
//!                               │
//!                               └── profile extracted ──▶ Complete
//! ```
//!
//! `respond` takes `&mut self`, so two turns can never be in flight on the
//! same controller; callers sharing one across tasks serialize with a mutex.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{AdvisorError, Result};
use crate::extractor::{Exchange, PersonaExtractor};
use crate::message::Message;
use crate::persona::Profile;

/// Opening assistant message seeded by `start`
pub const GREETING: &str = "Hi, I'm Magi, your investment advisor. Before we find the right strategy for you, I'd love to understand a bit about your goals. What are you looking to do with your investments?";

/// Conversation starter shown before the first message
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StarterPrompt {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const STARTER_PROMPTS: [StarterPrompt; 6] = [
    StarterPrompt {
        label: "Young professional",
        prompt: "I'm a young professional in my 30s investing for the next 5-10 years. I want growth but don't want to lose sleep over volatility.",
    },
    StarterPrompt {
        label: "Planning for retirement",
        prompt: "I'm 15 years from retirement and want to build a nest egg. I prefer steady growth over risky bets.",
    },
    StarterPrompt {
        label: "Recent grad with savings",
        prompt: "I just graduated and have some savings to invest. I have time on my side and I'm okay with risk if it means higher returns.",
    },
    StarterPrompt {
        label: "Retiree preserving wealth",
        prompt: "I'm retired and want to preserve my capital. Stability is more important to me than chasing returns.",
    },
    StarterPrompt {
        label: "Mid-career investor",
        prompt: "I'm in my 40s with a decent portfolio. Looking for balanced growth over the next 10+ years without extreme volatility.",
    },
    StarterPrompt {
        label: "Aggressive growth seeker",
        prompt: "I have a high risk tolerance and want maximum growth potential. I can handle big swings for bigger rewards.",
    },
];

/// Keyword rule: fires when the lowercased message contains any trigger
struct QuickReplyRule {
    triggers: &'static [&'static str],
    replies: &'static [&'static str],
}

/// Evaluated top to bottom, first match wins.
const QUICK_REPLY_RULES: &[QuickReplyRule] = &[
    // drawdown / loss reaction
    QuickReplyRule {
        triggers: &["dropped", "20%", "portfolio drop", "lose", "anxious"],
        replies: &[
            "I'd stay calm and hold",
            "I'd be nervous but wouldn't panic",
            "I'd want to sell immediately",
        ],
    },
    // horizon
    QuickReplyRule {
        triggers: &["how long", "time horizon", "when do you need"],
        replies: &["Less than a year", "1-3 years", "5+ years"],
    },
    // ticker
    QuickReplyRule {
        triggers: &["which stock", "what ticker", "which company"],
        replies: &["AAPL", "TSLA", "MSFT", "SPY", "NVDA"],
    },
    // goal / risk appetite
    QuickReplyRule {
        triggers: &["what are you looking", "investment goal", "risk", "aggressive"],
        replies: &["Aggressive growth", "Balanced approach", "Capital preservation"],
    },
    // any other open question
    QuickReplyRule {
        triggers: &["?"],
        replies: &["Tell me more", "I'm not sure yet", "Skip this question"],
    },
];

/// Quick replies for an assistant utterance; empty when no rule matches.
pub fn quick_replies_for(assistant_text: &str) -> Vec<&'static str> {
    let content = assistant_text.to_lowercase();
    QUICK_REPLY_RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| content.contains(t)))
        .map(|rule| rule.replies.to_vec())
        .unwrap_or_default()
}

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    NotStarted,
    InProgress,
    /// Profile reported; the controller takes no more input
    Complete,
}

/// Everything the caller needs once the profile is extracted
#[derive(Clone, Debug, Serialize)]
pub struct ProfileReady {
    pub history: Vec<Message>,
    pub summary: String,
    pub ticker: String,
    pub profile: Profile,
}

/// Result of one conversation turn
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    /// Awaiting user input
    Reply {
        message: String,
        quick_replies: Vec<&'static str>,
    },
    /// Conversation finished
    ProfileReady(ProfileReady),
}

/// Multi-turn persona conversation
pub struct ConversationController {
    extractor: Arc<PersonaExtractor>,
    history: Vec<Message>,
    state: ConversationState,
}

impl ConversationController {
    pub const fn new(extractor: Arc<PersonaExtractor>) -> Self {
        Self {
            extractor,
            history: Vec::new(),
            state: ConversationState::NotStarted,
        }
    }

    pub const fn state(&self) -> ConversationState {
        self.state
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Number of user messages so far
    pub fn user_turns(&self) -> usize {
        self.history.iter().filter(|m| m.is_user()).count()
    }

    /// Seed the greeting and send the first user message
    pub async fn start(&mut self, first_utterance: &str) -> Result<Turn> {
        if self.state != ConversationState::NotStarted {
            return Err(AdvisorError::Session("conversation already started".into()));
        }
        self.history.push(Message::assistant(GREETING));
        self.state = ConversationState::InProgress;
        tracing::debug!("Conversation started");
        self.respond(first_utterance).await
    }

    /// Append a user message and run one exchange.
    ///
    /// On failure the user message stays in the history and the state is
    /// unchanged, so the caller can `retry` or send an edited message. An
    /// edited message replaces the pending one.
    pub async fn respond(&mut self, user_text: &str) -> Result<Turn> {
        match self.state {
            ConversationState::NotStarted => {
                return Err(AdvisorError::Session("conversation has not started".into()));
            }
            ConversationState::Complete => {
                return Err(AdvisorError::Session(
                    "profile already extracted; start a new conversation".into(),
                ));
            }
            ConversationState::InProgress => {}
        }

        let text = user_text.trim();
        if text.is_empty() {
            return Err(AdvisorError::Session("message is empty".into()));
        }

        match self.history.last_mut() {
            Some(pending) if pending.is_user() => *pending = Message::user(text),
            _ => self.history.push(Message::user(text)),
        }
        self.exchange().await
    }

    /// Re-run the exchange for a history that ends in a user message
    pub async fn retry(&mut self) -> Result<Turn> {
        let pending = self.state == ConversationState::InProgress
            && self.history.last().is_some_and(Message::is_user);
        if !pending {
            return Err(AdvisorError::Session("nothing to retry".into()));
        }
        self.exchange().await
    }

    async fn exchange(&mut self) -> Result<Turn> {
        let result = self.extractor.exchange(&self.history).await;

        match result {
            Err(e) => {
                tracing::warn!(error = %e, turns = self.user_turns(), "Advisor exchange failed");
                Err(e)
            }
            Ok(Exchange::Message(message)) => {
                let quick_replies = quick_replies_for(&message);
                self.history.push(Message::assistant(message.clone()));
                Ok(Turn::Reply {
                    message,
                    quick_replies,
                })
            }
            Ok(Exchange::Profile(extraction)) => {
                self.history.push(Message::assistant(extraction.summary.clone()));
                self.state = ConversationState::Complete;
                tracing::info!(turns = self.user_turns(), "Conversation complete");
                Ok(Turn::ProfileReady(ProfileReady {
                    history: self.history.clone(),
                    summary: extraction.summary,
                    ticker: extraction.ticker,
                    profile: extraction.profile,
                }))
            }
        }
    }

    /// Quick replies for the latest assistant message
    pub fn quick_replies(&self) -> Vec<&'static str> {
        if self.state != ConversationState::InProgress {
            return Vec::new();
        }
        match self.history.last() {
            Some(last) if last.is_assistant() => quick_replies_for(&last.content),
            _ => Vec::new(),
        }
    }

    /// Drop the history and return to `NotStarted`
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = ConversationState::NotStarted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdvisorConfig;
    use crate::extractor::tests::{ScriptedProvider, persona_call};
    use crate::message::Role;
    use crate::persona::RiskTolerance;
    use crate::provider::Completion;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn controller(provider: Arc<ScriptedProvider>) -> ConversationController {
        let extractor = PersonaExtractor::new(provider, AdvisorConfig::with_api_key("sk-test"));
        ConversationController::new(Arc::new(extractor))
    }

    fn final_call() -> Completion {
        persona_call(json!({
            "risk_tolerance": "low",
            "time_horizon": "long",
            "drawdown_sensitivity": "high",
            "summary": "You are a careful saver who values stability.",
            "ticker": "spy",
        }))
    }

    #[test]
    fn test_loss_language_fires_first() {
        assert_eq!(
            quick_replies_for("How would you feel if your portfolio dropped 20% in a month?"),
            vec![
                "I'd stay calm and hold",
                "I'd be nervous but wouldn't panic",
                "I'd want to sell immediately",
            ]
        );
    }

    #[test]
    fn test_rule_priority() {
        // "risk" and "how long" both present: horizon rule is earlier
        assert_eq!(
            quick_replies_for("How long can you leave this money at risk?"),
            vec!["Less than a year", "1-3 years", "5+ years"]
        );
        assert_eq!(quick_replies_for("WHICH STOCK interests you?").len(), 5);
        assert_eq!(
            quick_replies_for("Tell me about your investment goal."),
            vec!["Aggressive growth", "Balanced approach", "Capital preservation"]
        );
        assert_eq!(
            quick_replies_for("Anything else on your mind?"),
            vec!["Tell me more", "I'm not sure yet", "Skip this question"]
        );
    }

    #[test]
    fn test_no_question_no_suggestions() {
        assert!(quick_replies_for("Great, thanks for sharing that.").is_empty());
    }

    #[tokio::test]
    async fn test_full_conversation_history_shape() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::text("How would you feel if your portfolio dropped 20%?")),
            Ok(Completion::text("Which stock would you like to analyze?")),
            Ok(final_call()),
        ]));
        let mut conversation = controller(provider.clone());

        let turn = conversation.start("I want to save for retirement").await.unwrap();
        assert!(matches!(turn, Turn::Reply { ref quick_replies, .. } if quick_replies.len() == 3));
        assert_eq!(conversation.state(), ConversationState::InProgress);

        let turn = conversation.respond("I'd sell everything").await.unwrap();
        assert!(matches!(turn, Turn::Reply { ref quick_replies, .. } if quick_replies.len() == 5));

        let Turn::ProfileReady(ready) = conversation.respond("SPY please").await.unwrap() else {
            panic!("expected profile");
        };
        assert_eq!(ready.ticker, "SPY");
        assert_eq!(ready.profile.risk_tolerance, RiskTolerance::Low);
        assert_eq!(ready.history.len(), 1 + 2 * 3);
        for (i, message) in ready.history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::Assistant } else { Role::User };
            assert_eq!(message.role, expected, "message {i}");
        }
        assert_eq!(ready.history[0].content, GREETING);
        assert_eq!(conversation.state(), ConversationState::Complete);
        assert!(conversation.quick_replies().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_history_and_state() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(AdvisorError::Upstream {
                status: 429,
                body: "slow down".into(),
            }),
            Ok(Completion::text("What's your time horizon?")),
        ]));
        let mut conversation = controller(provider.clone());

        let err = conversation.start("Hello").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Upstream { status: 429, .. }));
        assert_eq!(conversation.state(), ConversationState::InProgress);
        assert_eq!(conversation.history().len(), 2);
        assert!(conversation.history()[1].is_user());

        let turn = conversation.retry().await.unwrap();
        assert!(matches!(turn, Turn::Reply { .. }));
        assert_eq!(conversation.history().len(), 3);
        assert_eq!(
            conversation.quick_replies(),
            vec!["Less than a year", "1-3 years", "5+ years"]
        );
    }

    #[tokio::test]
    async fn test_edited_message_replaces_failed_one() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(AdvisorError::Upstream {
                status: 500,
                body: "boom".into(),
            }),
            Ok(final_call()),
        ]));
        let mut conversation = controller(provider);

        conversation.start("hello").await.unwrap_err();
        let Turn::ProfileReady(ready) = conversation.respond("hello, edited").await.unwrap() else {
            panic!("expected profile");
        };

        assert_eq!(ready.history.len(), 1 + 2 * conversation.user_turns());
        assert_eq!(ready.history.len(), 3);
        assert_eq!(ready.history[1].content, "hello, edited");
        for (i, message) in ready.history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::Assistant } else { Role::User };
            assert_eq!(message.role, expected, "message {i}");
        }
    }

    #[tokio::test]
    async fn test_respond_after_complete_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(final_call())]));
        let mut conversation = controller(provider.clone());

        conversation.start("Preserve my capital, analyze SPY").await.unwrap();
        let err = conversation.respond("one more thing").await.unwrap_err();
        assert!(matches!(err, AdvisorError::Session(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_respond_before_start_and_reset() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(final_call())]));
        let mut conversation = controller(provider);

        assert!(conversation.respond("hi").await.is_err());
        assert!(conversation.retry().await.is_err());

        conversation.start("Analyze SPY conservatively").await.unwrap();
        conversation.reset();
        assert_eq!(conversation.state(), ConversationState::NotStarted);
        assert!(conversation.history().is_empty());
    }
}
