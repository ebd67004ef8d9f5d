//! Guarded reproductive-health chat.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::client::{ChatMessage, CompletionService};
use crate::core::constants::{
    classifier_off_topic_response, off_topic_response, DIAGNOSTIC_PHRASES, EMERGENCY_RESPONSE,
    MAX_MESSAGE_CHARS, MEDICAL_DISCLAIMER, SYSTEM_PROMPT, TOPIC_VALIDATION_PROMPT, UNSAFE_RESPONSE,
};
use crate::core::types::ChatResponse;
use crate::core::{AppError, AppResult};
use crate::utils::{check_emergency, check_unsafe, is_obviously_off_topic};

const ANSWER_TEMPERATURE: f32 = 0.7;
const ANSWER_MAX_TOKENS: u32 = 500;
const CLASSIFIER_TEMPERATURE: f32 = 0.3;
const CLASSIFIER_MAX_TOKENS: u32 = 10;

/// Which branch of the guard produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Emergency,
    Unsafe,
    OffTopic,
    OffTopicClassifier,
    Answered,
}

impl ChatOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatOutcome::Emergency | ChatOutcome::Unsafe => "safety_triggered",
            ChatOutcome::OffTopic => "off_topic",
            ChatOutcome::OffTopicClassifier => "off_topic_ai",
            ChatOutcome::Answered => "success",
        }
    }
}

pub fn validate_message(message: &str) -> AppResult<()> {
    if message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} characters)"
        )));
    }
    Ok(())
}

/// Canned reply for messages caught by the keyword safety filters.
pub fn safety_response(message: &str) -> Option<(ChatOutcome, &'static str)> {
    if check_emergency(message) {
        Some((ChatOutcome::Emergency, EMERGENCY_RESPONSE))
    } else if check_unsafe(message) {
        Some((ChatOutcome::Unsafe, UNSAFE_RESPONSE))
    } else {
        None
    }
}

/// Append the disclaimer when an answer reads like a diagnosis or prescription.
pub fn with_disclaimer(answer: String) -> String {
    let lowered = answer.to_lowercase();
    if DIAGNOSTIC_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        answer + MEDICAL_DISCLAIMER
    } else {
        answer
    }
}

#[derive(Clone, Default)]
pub struct ChatService {
    completion: Option<Arc<dyn CompletionService>>,
}

impl ChatService {
    pub fn new(completion: Option<Arc<dyn CompletionService>>) -> Self {
        Self { completion }
    }

    pub fn is_configured(&self) -> bool {
        self.completion.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.completion.as_ref().map(|c| c.model())
    }

    /// Run a message through every guard, then answer it.
    pub async fn respond(&self, message: &str) -> AppResult<(ChatOutcome, ChatResponse)> {
        validate_message(message)?;

        if let Some((outcome, reply)) = safety_response(message) {
            warn!(outcome = outcome.as_str(), "chat safety filter triggered");
            return Ok((
                outcome,
                ChatResponse {
                    response: reply.to_string(),
                    safety_triggered: true,
                },
            ));
        }

        if is_obviously_off_topic(message) {
            return Ok((ChatOutcome::OffTopic, unguarded(off_topic_response())));
        }

        if !self.is_relevant(message).await {
            return Ok((ChatOutcome::OffTopicClassifier, unguarded(classifier_off_topic_response())));
        }

        let answer = self.answer(message).await?;
        Ok((ChatOutcome::Answered, unguarded(answer)))
    }

    /// Model-based topic check. Any failure lets the message through.
    pub async fn is_relevant(&self, message: &str) -> bool {
        let Some(completion) = &self.completion else {
            return true;
        };

        let prompt = TOPIC_VALIDATION_PROMPT.replace("{message}", message);
        match completion
            .complete(vec![ChatMessage::user(prompt)], CLASSIFIER_TEMPERATURE, CLASSIFIER_MAX_TOKENS)
            .await
        {
            Ok(reply) => {
                let label = reply.trim().to_uppercase();
                debug!(%label, "topic classification");
                label.contains("RELEVANT") && !label.contains("IRRELEVANT")
            }
            Err(e) => {
                warn!(error = %e, "topic classifier failed, allowing message");
                true
            }
        }
    }

    pub async fn answer(&self, message: &str) -> AppResult<String> {
        let completion = self.completion.as_ref().ok_or(AppError::ChatUnavailable)?;

        let reply = completion
            .complete(
                vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(message)],
                ANSWER_TEMPERATURE,
                ANSWER_MAX_TOKENS,
            )
            .await?;

        Ok(with_disclaimer(reply))
    }
}

fn unguarded(response: String) -> ChatResponse {
    ChatResponse {
        response,
        safety_triggered: false,
    }
}
