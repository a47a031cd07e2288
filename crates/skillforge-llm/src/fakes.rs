//! Scripted LLM clients (testing only)
//!
//! `ScriptedLlm` replays canned completions in order, or fails every call,
//! and records the prompts it was given.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::{Completion, LlmClient, Result};

#[derive(Debug)]
enum Script {
    Replies(Mutex<VecDeque<Completion>>),
    Failure { status: u16, body: String },
}

/// Deterministic stand-in for a remote model.
#[derive(Debug)]
pub struct ScriptedLlm {
    script: Script,
    model: String,
    provider: String,
    releases: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    /// Replies with `text` on every call.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_replies(vec![Completion::new(text)])
    }

    /// Replies with each completion in turn; the last one repeats.
    pub fn with_replies(replies: Vec<Completion>) -> Self {
        Self::from_script(Script::Replies(Mutex::new(replies.into())))
    }

    /// Fails every call with an HTTP status error.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self::from_script(Script::Failure {
            status,
            body: body.into(),
        })
    }

    fn from_script(script: Script) -> Self {
        Self {
            script,
            model: "scripted-model".to_string(),
            provider: "scripted".to_string(),
            releases: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Report a successful resource release after each call.
    pub fn releasing(mut self) -> Self {
        self.releases = true;
        self
    }

    /// Number of `invoke` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(role, prompt)` pairs received, in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn invoke(&self, role: &str, prompt: &str) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push((role.to_string(), prompt.to_string()));

        match &self.script {
            Script::Failure { status, body } => Err(LlmError::Status {
                status: *status,
                body: body.clone(),
            }),
            Script::Replies(queue) => {
                let mut queue = queue.lock().unwrap();
                let next = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                next.ok_or(LlmError::EmptyCompletion)
            }
        }
    }

    fn model_name(&self, _role: &str) -> String {
        self.model.clone()
    }

    fn provider(&self) -> String {
        self.provider.clone()
    }

    async fn release_resources(&self, _role: &str) -> bool {
        self.releases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_repeats_last() {
        let llm = ScriptedLlm::with_replies(vec![Completion::new("one"), Completion::new("two")]);
        assert_eq!(llm.invoke("coder", "a").await.unwrap().text, "one");
        assert_eq!(llm.invoke("coder", "b").await.unwrap().text, "two");
        assert_eq!(llm.invoke("coder", "c").await.unwrap().text, "two");
        assert_eq!(llm.calls(), 3);
        assert_eq!(llm.prompts()[1], ("coder".to_string(), "b".to_string()));
    }

    #[tokio::test]
    async fn failing_script_returns_status_error() {
        let llm = ScriptedLlm::failing(429, "quota exceeded");
        let err = llm.invoke("coder", "a").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert_eq!(llm.calls(), 1);
    }
}
