//! Chat-completions backed [`AnswerProvider`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{clean_reply, fallback_search_term, AnswerProvider};
use crate::config::ProviderConfig;
use crate::profile::CandidateProfile;
use crate::surface::SelectOption;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider reply had no content")]
    EmptyReply,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Answers questions on behalf of the candidate via an OpenAI-compatible API.
pub struct OpenAiAnswerProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl OpenAiAnswerProvider {
    pub fn new(
        config: &ProviderConfig,
        api_key: impl Into<String>,
        profile: &CandidateProfile,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let system_prompt = format!(
            "You fill in job application forms on behalf of the candidate below. \
             Answer truthfully from the candidate's background, in the first person, \
             concisely and professionally. Never invent employers, degrees or dates.\n\n{}",
            profile.background()
        );
        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            system_prompt,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| clean_reply(&c))
            .filter(|c| !c.is_empty())
            .ok_or(ProviderError::EmptyReply)?;
        Ok(content)
    }
}

#[async_trait]
impl AnswerProvider for OpenAiAnswerProvider {
    async fn text_answer(&self, question: &str, job_context: &str) -> Option<String> {
        let prompt = format!(
            "Job context:\n{job_context}\n\nApplication question:\n{question}\n\n\
             Reply with the answer text only, no preamble."
        );
        match self.complete(&prompt).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!(question, error = %e, "text answer unavailable");
                None
            }
        }
    }

    async fn best_option(
        &self,
        question: &str,
        options: &[SelectOption],
        job_context: &str,
    ) -> Option<String> {
        let listing = options
            .iter()
            .map(|o| format!("- {} => {}", o.value, o.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Job context:\n{job_context}\n\nApplication question:\n{question}\n\n\
             Options (value => label):\n{listing}\n\n\
             Reply with the value of the single best option, exactly as listed, nothing else."
        );
        let reply = match self.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(question, error = %e, "option choice unavailable");
                return None;
            }
        };
        // Models sometimes answer with the label instead of the value.
        let chosen = options
            .iter()
            .find(|o| o.value == reply)
            .or_else(|| options.iter().find(|o| o.text.eq_ignore_ascii_case(&reply)))
            .map(|o| o.value.clone())
            .unwrap_or(reply);
        debug!(question, chosen = %chosen, "option chosen");
        Some(chosen)
    }

    async fn short_search_term(&self, question: &str, job_context: &str) -> String {
        let prompt = format!(
            "Job context:\n{job_context}\n\nA searchable dropdown asks:\n{question}\n\n\
             Reply with one to three words to type into its search box, nothing else."
        );
        match self.complete(&prompt).await {
            Ok(term) => term,
            Err(e) => {
                warn!(question, error = %e, "search term unavailable, using question words");
                fallback_search_term(question)
            }
        }
    }
}
