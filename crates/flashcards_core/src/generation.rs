//! crates/flashcards_core/src/generation.rs
//!
//! The bounded retry loop that turns a prompt into a validated `FlashcardSet`.
//!
//! Each attempt ends in one of three outcomes: a valid set, a malformed reply that
//! is worth asking again for, or a service failure that ends the loop at once.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::{Flashcard, FlashcardSet};
use crate::ports::{PortError, TextGenerationService};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Why a reply could not be turned into flashcards. Always retryable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MalformedOutput {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("reply is a JSON {0}, expected an array")]
    NotAnArray(&'static str),
    #[error("expected {expected} flashcards, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("flashcard {index} is invalid: {reason}")]
    InvalidCard { index: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The text-generation service itself failed; never retried.
    #[error("text generation service failed: {0}")]
    Service(#[source] PortError),
    #[error("failed to generate valid flashcards after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: MalformedOutput },
    #[error("max_attempts must be at least 1")]
    NoAttempts,
}

/// The result of a single generation attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<Flashcard>),
    Retryable(MalformedOutput),
    Fatal(PortError),
}

/// Strips surrounding whitespace and a Markdown code fence from a model reply.
pub fn normalize_reply(raw: &str) -> &str {
    let mut reply = raw.trim();
    if let Some(rest) = reply.strip_prefix("```json") {
        reply = rest;
    } else if let Some(rest) = reply.strip_prefix("```") {
        reply = rest;
    }
    if let Some(rest) = reply.strip_suffix("```") {
        reply = rest;
    }
    reply.trim()
}

/// Parses a normalized reply and checks it holds exactly `count` complete flashcards.
pub fn parse_flashcards(reply: &str, count: usize) -> Result<Vec<Flashcard>, MalformedOutput> {
    let value: Value =
        serde_json::from_str(reply).map_err(|e| MalformedOutput::InvalidJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(MalformedOutput::NotAnArray(json_kind(&other))),
    };

    if items.len() != count {
        return Err(MalformedOutput::WrongCount {
            expected: count,
            actual: items.len(),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = item.as_object().ok_or_else(|| MalformedOutput::InvalidCard {
                index,
                reason: format!("expected an object, found a JSON {}", json_kind(item)),
            })?;
            let field = |name: &str| -> Result<String, MalformedOutput> {
                match object.get(name) {
                    // Blank text is rejected, but kept text is returned as written.
                    Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
                    Some(Value::String(_)) => Err(MalformedOutput::InvalidCard {
                        index,
                        reason: format!("'{name}' is empty"),
                    }),
                    Some(other) => Err(MalformedOutput::InvalidCard {
                        index,
                        reason: format!("'{name}' is a JSON {}, expected a string", json_kind(other)),
                    }),
                    None => Err(MalformedOutput::InvalidCard {
                        index,
                        reason: format!("missing '{name}'"),
                    }),
                }
            };
            Ok(Flashcard {
                question: field("question")?,
                answer: field("answer")?,
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Runs one request/validate round trip.
pub async fn run_attempt(
    service: &dyn TextGenerationService,
    prompt: &str,
    count: usize,
) -> AttemptOutcome {
    let raw = match service.generate_text(prompt).await {
        Ok(raw) => raw,
        Err(e) => return AttemptOutcome::Fatal(e),
    };
    match parse_flashcards(normalize_reply(&raw), count) {
        Ok(cards) => AttemptOutcome::Success(cards),
        Err(reason) => AttemptOutcome::Retryable(reason),
    }
}

/// Asks the model for `count` flashcards, re-asking on malformed replies up to
/// `max_attempts` times in total.
pub async fn generate_flashcards(
    service: &dyn TextGenerationService,
    prompt: &str,
    count: usize,
    max_attempts: u32,
) -> Result<FlashcardSet, GenerationError> {
    if max_attempts == 0 {
        return Err(GenerationError::NoAttempts);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        info!(attempt, max_attempts, count, "Requesting flashcards");

        match run_attempt(service, prompt, count).await {
            AttemptOutcome::Success(cards) => {
                info!(attempt, "Generated valid flashcards");
                return Ok(FlashcardSet {
                    cards,
                    attempts: attempt,
                });
            }
            AttemptOutcome::Fatal(e) => {
                error!(attempt, error = %e, "Text generation service failed");
                return Err(GenerationError::Service(e));
            }
            AttemptOutcome::Retryable(reason) if attempt >= max_attempts => {
                warn!(attempt, max_attempts, %reason, "Final attempt produced malformed output");
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    last: reason,
                });
            }
            AttemptOutcome::Retryable(reason) => {
                warn!(attempt, max_attempts, %reason, "Malformed output, retrying");
            }
        }
    }
}
