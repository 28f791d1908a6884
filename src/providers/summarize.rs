use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::Summarizer;
use crate::Result;

const SYSTEM_INSTRUCTION: &str = "You are an expert YouTube content analyst. \
Your task is to analyze the provided video transcripts to identify patterns \
and themes and answer the user's request in a clear, structured and \
insightful way. Provide your analysis as well-formatted plain text.";

/// Summarization client for the Gemini `generateContent` API.
pub struct GeminiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

impl GeminiSummarizer {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "systemInstruction": {
                "parts": [{"text": SYSTEM_INSTRUCTION}]
            },
            "generationConfig": {
                "temperature": 0.5,
                "topP": 0.95
            }
        });

        tracing::info!(model = %self.model, prompt_chars = prompt.len(), "requesting analysis");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Gemini API returned HTTP {}", response.status());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .context("Gemini response contained no text")
    }
}
