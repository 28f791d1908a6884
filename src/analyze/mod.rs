use serde::{Deserialize, Serialize};

use crate::pipeline::event::VideoResult;
use crate::providers::Summarizer;
use crate::{ExtractError, Result};

/// Request body for the analysis operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Extracted transcripts to analyze
    pub transcripts: Vec<VideoResult>,

    /// User-supplied analysis instruction
    #[serde(rename = "customPrompt")]
    pub custom_prompt: String,
}

/// Response body for the analysis operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

impl AnalyzeRequest {
    /// Reject empty input before any model call is made.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.transcripts.is_empty() {
            return Err(ExtractError::InvalidRequest(
                "at least one transcript is required".to_string(),
            ));
        }
        if self.custom_prompt.trim().is_empty() {
            return Err(ExtractError::InvalidRequest(
                "a custom prompt is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assemble the model prompt: the user's instruction followed by every
/// transcript as a titled block.
pub fn build_prompt(transcripts: &[VideoResult], custom_prompt: &str) -> String {
    let combined = transcripts
        .iter()
        .map(|t| format!("--- Video: {} ---\n{}", t.title, t.transcript))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nHere are the transcripts to analyze:\n\n{}",
        custom_prompt, combined
    )
}

/// Validate the request and run the summarization call.
pub async fn run_analysis(
    summarizer: &dyn Summarizer,
    request: &AnalyzeRequest,
) -> Result<AnalyzeResponse> {
    request.validate()?;
    let prompt = build_prompt(&request.transcripts, &request.custom_prompt);
    let analysis = summarizer.summarize(&prompt).await?;
    Ok(AnalyzeResponse { analysis })
}
