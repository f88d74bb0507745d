use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Seam between the panels and the completion service. Panels depend on this
/// trait so tests can script responses without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, schema: Option<Value>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the generative AI completion service. A call carries a
/// natural-language prompt and, optionally, a structured output schema; the
/// service answers with schema-conformant JSON or free text.
#[derive(Debug, Clone)]
pub struct GenAiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GenAiClient {
    pub fn new(client: Client, base_url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            model,
            api_key,
        }
    }

    /// Runs one completion and returns the raw text of the first candidate.
    pub async fn generate(&self, prompt: &str, schema: Option<Value>) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: schema.map(|response_schema| GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema,
            }),
        };

        debug!("Sending completion request to model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                Error::ApiConnectionFailed(format!("Failed to reach AI service: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!("AI service returned {}: {}", status, body);
            return Err(Error::ApiError(format!(
                "AI service failed with status {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!("Failed to deserialize completion response: {}", e);
            Error::ApiInvalidFormat(format!("Failed to parse completion response: {}", e))
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::ApiInvalidFormat("Completion had no candidates".to_string()))
    }
}

#[async_trait]
impl TextCompletion for GenAiClient {
    async fn complete(&self, prompt: &str, schema: Option<Value>) -> Result<String> {
        self.generate(prompt, schema).await
    }
}

/// Pulls the JSON object embedded in a completion, delimited by the first
/// `{` and the last `}`. Deliberately permissive: models wrap JSON in prose
/// or markdown fences, and strict parsing of the whole text would reject
/// otherwise usable answers.
pub fn extract_json(raw: &str) -> Result<&str> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok(&raw[start..=end]),
        _ => Err(Error::AnalysisFailed(
            "AI response did not contain valid JSON.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_surrounding_prose() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"score\": 82}\n```\nHope that helps.";
        assert_eq!(extract_json(raw).unwrap(), r#"{"score": 82}"#);
    }

    #[test]
    fn extract_json_spans_first_to_last_brace() {
        let raw = r#"{"a": {"b": 1}} trailing"#;
        assert_eq!(extract_json(raw).unwrap(), r#"{"a": {"b": 1}}"#);
    }

    #[test]
    fn extract_json_rejects_braceless_text() {
        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn request_serializes_schema_config() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({"type": "OBJECT"}),
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"responseMimeType\":\"application/json\""));
        assert!(json.contains("\"responseSchema\""));

        let plain = GenerateRequest {
            contents: vec![],
            generation_config: None,
        };
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("generationConfig"));
    }
}
