// Code generator: research corpus (+ optional critique) to a candidate configuration

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::hcl;
use super::prompts::{generation_system_prompt, generation_user_prompt};
use crate::config::constants::GENERATION_ATTEMPTS;
use crate::config::GenerationSettings;
use crate::errors::GenerationError;
use crate::providers::{LlmProvider, Message, ProviderRequest};
use crate::refinement::types::Issue;
use crate::research::ResearchCorpus;

/// What a revision pass is asked to fix: only the immediately preceding
/// candidate and the critique of it.
#[derive(Debug, Clone, Copy)]
pub struct Revision<'a> {
    pub previous: &'a str,
    pub issues: &'a [Issue],
}

pub struct CodeGenerator {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    call_timeout: Duration,
}

impl CodeGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, settings: &GenerationSettings, call_timeout: Duration) -> Self {
        Self {
            llm,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            call_timeout,
        }
    }

    /// Produce one candidate configuration.
    ///
    /// Makes at most [`GENERATION_ATTEMPTS`] provider calls. The last
    /// attempt's error is returned when none yields a well-formed document.
    pub async fn generate(
        &self,
        request: &str,
        corpus: &ResearchCorpus,
        revision: Option<Revision<'_>>,
    ) -> Result<String, GenerationError> {
        let provider_request = ProviderRequest::new(vec![
            Message::system(generation_system_prompt(request, corpus)),
            Message::user(generation_user_prompt(revision.as_ref())),
        ])
        .with_model(self.model.clone())
        .with_max_tokens(self.max_tokens)
        .with_temperature(self.temperature);

        let mut attempt = 1;
        loop {
            match self.attempt(&provider_request).await {
                Ok(code) => {
                    tracing::debug!(attempt, bytes = code.len(), "Generated candidate");
                    return Ok(code);
                }
                Err(e) if attempt < GENERATION_ATTEMPTS => {
                    tracing::warn!("Generation attempt {}/{} failed: {}", attempt, GENERATION_ATTEMPTS, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, request: &ProviderRequest) -> Result<String, GenerationError> {
        let response = timeout(self.call_timeout, self.llm.send_message(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.call_timeout))?
            .map_err(GenerationError::Provider)?;

        let code = hcl::extract_code(&response.text);
        if code.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        let document = hcl::scan(&code).map_err(|e| GenerationError::Unparseable(e.to_string()))?;
        if document.blocks.is_empty() {
            return Err(GenerationError::Unparseable(
                "no top-level block found".to_string(),
            ));
        }

        Ok(code)
    }
}
