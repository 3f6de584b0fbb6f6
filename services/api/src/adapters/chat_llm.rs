//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the tutor LLM. It implements the
//! `TutorModelService` port from the `core` crate: it invokes the external
//! model requesting a JSON-object response and normalizes whatever comes back
//! into a well-shaped `TutorReply`, degrading to a fixed fallback on any call
//! or parse failure.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use tutor_core::domain::{Feedback, TutorReply};
use tutor_core::ports::TutorModelService;

//=========================================================================================
// Raw Output Normalization
//=========================================================================================

/// The tagged result of one raw model invocation, before it is collapsed into
/// the infallible `TutorReply` the orchestrator sees.
#[derive(Debug)]
pub enum ModelOutcome {
    Parsed(TutorReply),
    Malformed(String),
    TransportFailure(String),
}

/// The JSON object shape the persona prompt instructs the model to emit.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTutorOutput {
    reply: String,
    #[serde(default)]
    feedback: Feedback,
    #[serde(default)]
    require_rewrite: bool,
}

/// The fixed substitute used whenever the model call or its output parsing
/// fails. The turn still completes and this reply is persisted like any other.
pub fn fallback_reply() -> TutorReply {
    TutorReply {
        reply: "I'm having trouble connecting to my brain right now. Please try again.".to_string(),
        feedback: Feedback::default(),
        require_rewrite: false,
    }
}

/// Strips fenced code-block markers and parses the model's textual payload
/// into a `TutorReply`.
fn normalize_output(raw: &str) -> ModelOutcome {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    match serde_json::from_str::<RawTutorOutput>(cleaned) {
        Ok(parsed) => ModelOutcome::Parsed(TutorReply {
            reply: parsed.reply,
            feedback: parsed.feedback,
            require_rewrite: parsed.require_rewrite,
        }),
        Err(_) => ModelOutcome::Malformed(raw.to_string()),
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TutorModelService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTutorAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiTutorAdapter {
    /// Creates a new `OpenAiTutorAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    async fn invoke(&self, prompt: &str) -> ModelOutcome {
        let messages = match build_messages(prompt) {
            Ok(messages) => messages,
            Err(e) => return ModelOutcome::TransportFailure(e),
        };

        let request = match CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .build()
        {
            Ok(request) => request,
            Err(e) => return ModelOutcome::TransportFailure(e.to_string()),
        };

        let response =
            match tokio::time::timeout(self.timeout, self.client.chat().create(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return ModelOutcome::TransportFailure(e.to_string()),
                Err(_) => {
                    return ModelOutcome::TransportFailure(format!(
                        "model call exceeded {:?}",
                        self.timeout
                    ))
                }
            };

        let raw = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        match raw {
            Some(raw) => normalize_output(&raw),
            None => ModelOutcome::Malformed("response contained no text content".to_string()),
        }
    }
}

fn build_messages(
    prompt: &str,
) -> Result<Vec<async_openai::types::chat::ChatCompletionRequestMessage>, String> {
    Ok(vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content("You are a helpful assistant that outputs JSON.")
            .build()
            .map_err(|e| e.to_string())?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| e.to_string())?
            .into(),
    ])
}

//=========================================================================================
// `TutorModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TutorModelService for OpenAiTutorAdapter {
    async fn complete(&self, prompt: &str) -> TutorReply {
        match self.invoke(prompt).await {
            ModelOutcome::Parsed(reply) => reply,
            ModelOutcome::Malformed(raw) => {
                warn!("Model output failed to parse; using fallback reply: {}", raw);
                fallback_reply()
            }
            ModelOutcome::TransportFailure(cause) => {
                warn!("Model call failed; using fallback reply: {}", cause);
                fallback_reply()
            }
        }
    }
}
