use crate::contract::{ExtractError, Extractor};
use crate::prompt;
use crate::schema::{CandidateEntity, CandidateRelation, EntityResponse, RelationResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    format: String, // "json" for structured output
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: "json".to_string(), // Force JSON output
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Backend(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ExtractError::Backend(format!(
                "unexpected status: {}",
                response.status()
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::MalformedResponse(e.to_string()))?;

        Ok(ollama_response.response)
    }

    /// Generate, re-prompting with a correction request when the model
    /// returns invalid JSON. Bounded by `max_retries`.
    pub async fn generate_json_with_retry(
        &self,
        prompt: &str,
        max_retries: usize,
    ) -> Result<String, ExtractError> {
        let mut response = self.generate(prompt).await?;

        for _ in 0..max_retries {
            if serde_json::from_str::<serde_json::Value>(&response).is_ok() {
                return Ok(response);
            }
            tracing::debug!("invalid JSON from model, requesting correction");
            response = self.generate(&prompt::build_retry_prompt(&response)).await?;
        }

        if serde_json::from_str::<serde_json::Value>(&response).is_ok() {
            return Ok(response);
        }

        Err(ExtractError::MalformedResponse(format!(
            "no valid JSON after {} retries",
            max_retries
        )))
    }
}

/// Extraction backed by an Ollama-style completion endpoint.
pub struct OllamaExtractor {
    client: OllamaClient,
    json_retries: usize,
}

impl OllamaExtractor {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            json_retries: 2,
        }
    }
}

#[async_trait]
impl Extractor for OllamaExtractor {
    async fn extract_entities(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateEntity>, ExtractError> {
        let prompt = prompt::build_entity_prompt(chunk_text);
        let json = self
            .client
            .generate_json_with_retry(&prompt, self.json_retries)
            .await?;

        let parsed: EntityResponse = serde_json::from_str(&json)
            .map_err(|e| ExtractError::MalformedResponse(e.to_string()))?;
        Ok(parsed.entities)
    }

    async fn extract_relations(
        &self,
        chunk_text: &str,
    ) -> Result<Vec<CandidateRelation>, ExtractError> {
        let prompt = prompt::build_relation_prompt(chunk_text);
        let json = self
            .client
            .generate_json_with_retry(&prompt, self.json_retries)
            .await?;

        let parsed: RelationResponse = serde_json::from_str(&json)
            .map_err(|e| ExtractError::MalformedResponse(e.to_string()))?;
        Ok(parsed.relations)
    }
}
