use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use grozo_core::suggest::TextGenerator;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Text of the first part of the first candidate; empty if there is none.
#[must_use]
pub fn first_candidate_text(resp: GenerateResponse) -> String {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .unwrap_or_default()
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "grozo/{} (grocery list)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            url: url.to_string(),
        })
    }

    pub async fn generate_async(&self, prompt: &str) -> Result<String> {
        let Some(key) = self.api_key.as_deref() else {
            bail!("Gemini API key not configured");
        };

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&self.url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .context("Failed to reach Gemini API")?
            .error_for_status()
            .context("Gemini API returned an error status")?;

        let data: GenerateResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        Ok(first_candidate_text(data))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_async(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GEMINI_URL;

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_first_candidate_text() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Dairy & Eggs"},{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(resp), "Dairy & Eggs");
    }

    #[test]
    fn test_first_candidate_text_missing_pieces() {
        for raw in [
            "{}",
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
        ] {
            let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
            assert_eq!(first_candidate_text(resp), "", "input: {raw}");
        }
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let client = GeminiClient::new(None, DEFAULT_GEMINI_URL).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    // --- Integration tests (hit real Gemini API) ---

    #[tokio::test]
    #[ignore = "hits Gemini API"]
    async fn test_generate_live() {
        let key = std::env::var("GEMINI_API_KEY").ok();
        let client = GeminiClient::new(key, DEFAULT_GEMINI_URL).unwrap();
        let text = client.generate("Reply with the single word: milk").await.unwrap();
        assert!(!text.trim().is_empty());
    }
}
