//! Scripted [`TextGenerator`] for tests. Compiled into the library only
//! with the `test-support` feature.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerateError;
use crate::generation::{GenerationRequest, TextGenerator};

/// One canned backend reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(GenerateError),
    /// Never completes; exercises the per-attempt timeout.
    Hang,
}

/// Replays a fixed sequence of replies and records every prompt it receives.
///
/// Once the script runs out, further calls fail with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue more replies behind the current script.
    pub fn push(&self, reply: ScriptedReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.prompt.clone());
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(err)) => Err(err),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(GenerateError::Transport {
                message: "script exhausted".to_string(),
            }),
        }
    }
}
