//! Turn-taking for the wellbeing chat.
//!
//! A session counts user turns. Once the configured number of turns has been
//! reached and the latest message signals distress, the session offers the
//! guided action menu. Picking an action moves the session into an exercise;
//! finishing or dismissing returns to plain conversation with a fresh count.

use thiserror::Error;

use crate::exercises::{Exercise, ExerciseRunner, GuidedAction, ACTION_MENU};

/// Phrases that signal the user may benefit from a guided action.
pub const DISTRESS_KEYWORDS: &[&str] = &[
    "anxious",
    "anxiety",
    "stressed",
    "stress",
    "overwhelmed",
    "panic",
    "sad",
    "depressed",
    "hopeless",
    "worried",
    "upset",
    "lonely",
    "can't cope",
    "cannot cope",
];

pub const DEFAULT_MAX_TURNS: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("guided actions are not on offer right now")]
    NoOfferPending,
    #[error("no exercise is in progress")]
    NoExercise,
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum SessionPhase {
    Conversing,
    OfferingActions,
    Exercising(ExerciseRunner),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    OfferActions([GuidedAction; 3]),
}

pub fn signals_distress(text: &str) -> bool {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    DISTRESS_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    turns: u32,
    max_turns: u32,
    phase: SessionPhase,
}

impl ChatSession {
    pub fn new(max_turns: u32) -> Self {
        Self {
            messages: Vec::new(),
            turns: 0,
            max_turns,
            phase: SessionPhase::Conversing,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn submit_user_message(&mut self, text: &str) -> Result<TurnOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.messages.push(ChatMessage {
            role: Role::User,
            text: text.to_string(),
        });
        self.turns += 1;

        if matches!(self.phase, SessionPhase::Conversing)
            && self.turns >= self.max_turns
            && signals_distress(text)
        {
            tracing::info!(turns = self.turns, "offering guided actions");
            self.phase = SessionPhase::OfferingActions;
            return Ok(TurnOutcome::OfferActions(ACTION_MENU));
        }

        Ok(TurnOutcome::Continue)
    }

    pub fn record_assistant_message(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: Role::Assistant,
            text: text.into(),
        });
    }

    pub fn choose_action(&mut self, action: GuidedAction) -> Result<&mut ExerciseRunner, ChatError> {
        if !matches!(self.phase, SessionPhase::OfferingActions) {
            return Err(ChatError::NoOfferPending);
        }
        tracing::info!(?action, "guided action chosen");
        self.phase = SessionPhase::Exercising(ExerciseRunner::new(Exercise::for_action(action)));
        match &mut self.phase {
            SessionPhase::Exercising(runner) => Ok(runner),
            _ => Err(ChatError::NoExercise),
        }
    }

    pub fn dismiss_actions(&mut self) -> Result<(), ChatError> {
        if !matches!(self.phase, SessionPhase::OfferingActions) {
            return Err(ChatError::NoOfferPending);
        }
        self.return_to_conversation();
        Ok(())
    }

    pub fn finish_exercise(&mut self) -> Result<GuidedAction, ChatError> {
        let action = match &self.phase {
            SessionPhase::Exercising(runner) => runner.action(),
            _ => return Err(ChatError::NoExercise),
        };
        self.return_to_conversation();
        Ok(action)
    }

    fn return_to_conversation(&mut self) {
        self.phase = SessionPhase::Conversing;
        self.turns = 0;
    }
}

/// Produces assistant replies for a session.
pub trait Responder {
    fn reply(&mut self, session: &ChatSession) -> String;
}

/// Reflective prompts used when no model backend is attached.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    next: usize,
}

const REFLECTIONS: &[&str] = &[
    "Thank you for sharing that. How has it been affecting your day?",
    "That sounds like a lot to carry. What feels most pressing right now?",
    "I hear you. What usually helps you feel a little more settled?",
    "It makes sense to feel that way. Would you like to tell me more?",
];

impl Responder for ScriptedResponder {
    fn reply(&mut self, session: &ChatSession) -> String {
        let distressed = session
            .messages()
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .is_some_and(|message| signals_distress(&message.text));

        if distressed && matches!(session.phase(), SessionPhase::Conversing) {
            return "I'm sorry things feel heavy. I'm here with you, take your time.".to_string();
        }

        let reply = REFLECTIONS[self.next % REFLECTIONS.len()];
        self.next += 1;
        reply.to_string()
    }
}
