//! Offline generator replaying canned replies
//!
//! Used by tests and by callers that want deterministic output without a
//! provider. Replies are consumed in order; once exhausted the fallback
//! reply (if any) repeats, otherwise the generator reports unavailability.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{GenerationRequest, TextGenerator};
use crate::error::GenerationError;

#[derive(Debug)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Deterministic [`TextGenerator`]
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `reply`
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Always fail
    pub fn failing(reason: impl Into<String>) -> Self {
        let gen = Self::default();
        gen.push_failure(reason);
        gen
    }

    pub fn push_reply(&self, reply: impl Into<String>) -> &Self {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(Scripted::Reply(reply.into()));
        }
        self
    }

    pub fn push_failure(&self, reason: impl Into<String>) -> &Self {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(Scripted::Fail(reason.into()));
        }
        self
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }

        let next = self
            .queue
            .lock()
            .map_err(|_| GenerationError::Unavailable("script lock poisoned".into()))?
            .pop_front();

        match next {
            Some(Scripted::Reply(text)) if text.trim().is_empty() => {
                Err(GenerationError::EmptyCompletion)
            }
            Some(Scripted::Reply(text)) => Ok(text.trim().to_string()),
            Some(Scripted::Fail(reason)) => Err(GenerationError::Unavailable(reason)),
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(GenerationError::Unavailable("script exhausted".into())),
            },
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
