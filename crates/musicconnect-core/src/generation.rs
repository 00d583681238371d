use std::sync::Arc;
use std::time::{Duration, Instant};

use musicconnect_provider::{create_provider, LlmProvider, LlmRequest, ProviderConfig};
use musicconnect_schema::{ActivityDetail, ActivitySummary, TargetGroup};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::prompts::{
    detail_from_freeform_prompt, detail_from_title_prompt, idea_list_prompt, refine_prompt,
    GenerationPrompt,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation is not configured: missing API key")]
    NotConfigured,
    #[error("generation endpoint failed: {0}")]
    Endpoint(String),
    #[error("generation endpoint returned an empty response")]
    EmptyResponse,
    #[error("generation response is not valid {expected}: {reason}")]
    Malformed {
        expected: &'static str,
        reason: String,
    },
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl GenerationError {
    /// Whether trying the same action again could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GenerationError::NotConfigured)
    }
}

/// Schema-constrained generation of ideas and proposals.
#[derive(Clone)]
pub struct ActivityGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    max_output_tokens: u32,
    timeout: Duration,
}

impl ActivityGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            provider: Some(provider),
            model: model.into(),
            max_output_tokens: defaults.max_output_tokens,
            timeout: defaults.timeout(),
        }
    }

    /// A generator that fails every call with [`GenerationError::NotConfigured`].
    pub fn unconfigured() -> Self {
        let defaults = ProviderConfig::default();
        Self {
            provider: None,
            model: defaults.model.clone(),
            max_output_tokens: defaults.max_output_tokens,
            timeout: defaults.timeout(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        let generator = match create_provider(config) {
            Ok(provider) => Self::new(provider, config.model.clone()),
            Err(err) => {
                tracing::error!("generation disabled: {err}");
                Self {
                    model: config.model.clone(),
                    ..Self::unconfigured()
                }
            }
        };
        generator
            .with_timeout(config.timeout())
            .with_max_output_tokens(config.max_output_tokens)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn ideas(
        &self,
        group: TargetGroup,
        existing_titles: &[String],
    ) -> Result<Vec<ActivitySummary>, GenerationError> {
        self.generate("ideas", idea_list_prompt(group, existing_titles))
            .await
    }

    pub async fn detail_from_title(
        &self,
        title: &str,
        group: TargetGroup,
    ) -> Result<ActivityDetail, GenerationError> {
        self.generate("detail_from_title", detail_from_title_prompt(title, group))
            .await
    }

    pub async fn detail_from_freeform(
        &self,
        request: &str,
    ) -> Result<ActivityDetail, GenerationError> {
        self.generate("detail_from_freeform", detail_from_freeform_prompt(request))
            .await
    }

    pub async fn refine(
        &self,
        current: &ActivityDetail,
        instruction: &str,
    ) -> Result<ActivityDetail, GenerationError> {
        let prompt = refine_prompt(current, instruction)
            .map_err(|err| GenerationError::Encode(err.to_string()))?;
        self.generate("refine", prompt).await
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        prompt: GenerationPrompt,
    ) -> Result<T, GenerationError> {
        let Some(provider) = &self.provider else {
            tracing::warn!(operation, "generation skipped: no API key configured");
            return Err(GenerationError::NotConfigured);
        };

        let request = LlmRequest::json(self.model.clone(), prompt.text, prompt.schema)
            .with_max_tokens(self.max_output_tokens);
        let start = Instant::now();

        let response = match tokio::time::timeout(self.timeout, provider.chat(request)).await {
            Err(_) => {
                tracing::warn!(operation, model = %self.model, timeout = ?self.timeout, "generation timed out");
                return Err(GenerationError::Timeout(self.timeout));
            }
            Ok(Err(err)) => {
                tracing::warn!(operation, model = %self.model, "generation failed: {err}");
                return Err(GenerationError::Endpoint(err.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        let payload = strip_code_fence(&response.text);
        if payload.is_empty() {
            tracing::warn!(operation, model = %self.model, "generation returned empty text");
            return Err(GenerationError::EmptyResponse);
        }

        let parsed = serde_json::from_str::<T>(payload).map_err(|err| {
            tracing::warn!(operation, model = %self.model, "generation returned malformed json: {err}");
            GenerationError::Malformed {
                expected: operation_shape(operation),
                reason: err.to_string(),
            }
        })?;

        tracing::info!(
            operation,
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "generation completed"
        );
        Ok(parsed)
    }
}

fn operation_shape(operation: &str) -> &'static str {
    match operation {
        "ideas" => "activity summary list",
        _ => "activity detail",
    }
}

/// Unwraps a ```` ```json ... ``` ```` block; other text is only trimmed.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}
