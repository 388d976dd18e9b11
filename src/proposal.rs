//! Fix proposals from the generative-model collaborator.
//!
//! The model call is an opaque function behind the [`FixProposer`] trait:
//! given the error text and the current file content, return proposed text.
//! The response may wrap the answer in a fenced code block, which
//! [`extract_fenced_fix`] strips before the merge.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{HealError, config::Settings};

const SYSTEM_PROMPT: &str = "You are an AI that analyzes CI/CD deployment errors and suggests configuration fixes. Reply with the corrected configuration lines only.";

/// Trait for the external fix-suggestion collaborator.
#[async_trait]
pub trait FixProposer: Send + Sync {
	/// Propose a fix for `error_text` against `original_content`.
	async fn propose(&self, error_text: &str, original_content: &str) -> Result<String, HealError>;
}

/// Strip exactly one fence pair out of the model's raw response.
///
/// The first opening fence (with optional language tag) wins; the content runs
/// to the next fence line. Responses without a complete fence pair are used
/// verbatim.
pub fn extract_fenced_fix(response: &str) -> String {
	let lines: Vec<&str> = response.lines().collect();
	let Some(open) = lines.iter().position(|l| l.trim_start().starts_with("```")) else {
		return response.to_string();
	};
	let Some(close) = lines[open + 1..].iter().position(|l| l.trim_start().starts_with("```")) else {
		return response.to_string();
	};
	lines[open + 1..open + 1 + close].join("\n")
}

//==============================================================================
// Real proposer
//==============================================================================

/// Proposer backed by the OpenAI chat-completions API.
pub struct OpenAiProposer {
	http_client: Client,
	api_key: String,
	model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
	content: String,
}

impl OpenAiProposer {
	pub fn new(settings: &Settings) -> Result<Self, HealError> {
		let api_key = settings.openai_api_key.clone().ok_or(HealError::MissingCredential { var: "OPENAI_API_KEY" })?;
		let http_client = Client::builder().timeout(settings.api_timeout).build().map_err(HealError::Network)?;
		Ok(Self {
			http_client,
			api_key,
			model: settings.model.clone(),
		})
	}
}

#[async_trait]
impl FixProposer for OpenAiProposer {
	async fn propose(&self, error_text: &str, original_content: &str) -> Result<String, HealError> {
		let body = serde_json::json!({
			"model": self.model,
			"temperature": 0,
			"messages": [
				{ "role": "system", "content": SYSTEM_PROMPT },
				{ "role": "user", "content": format!("Analyze this deployment error and suggest a fix:\n\n{error_text}\n\nCurrent configuration:\n{original_content}") },
			],
		});

		let res = self
			.http_client
			.post("https://api.openai.com/v1/chat/completions")
			.bearer_auth(&self.api_key)
			.json(&body)
			.send()
			.await
			.map_err(HealError::Network)?;

		if !res.status().is_success() {
			let status = res.status();
			let text = res.text().await.unwrap_or_default();
			if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
				return Err(HealError::Permission {
					message: format!("fix proposer rejected the credential: {status} - {text}"),
				});
			}
			return Err(HealError::RemoteApi(format!("fix proposer: {status} - {text}")));
		}

		let response = res.json::<ChatResponse>().await.map_err(HealError::Network)?;
		let choice = response.choices.into_iter().next().ok_or_else(|| HealError::RemoteApi("fix proposer returned no choices".to_string()))?;
		Ok(choice.message.content)
	}
}

//==============================================================================
// Mock proposer
//==============================================================================

/// Proposer returning a canned response, for tests and `--mock` runs.
pub struct MockProposer {
	response: String,
}

impl MockProposer {
	pub fn new(response: &str) -> Self {
		Self { response: response.to_string() }
	}
}

#[async_trait]
impl FixProposer for MockProposer {
	async fn propose(&self, _error_text: &str, _original_content: &str) -> Result<String, HealError> {
		Ok(self.response.clone())
	}
}
