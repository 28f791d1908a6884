//! Newline-delimited JSON codec for the extraction event stream.
//!
//! Each event is one JSON object on its own line, flushed as soon as it is
//! written so the consumer sees progress immediately. The decoder is
//! defensive: bytes arrive in arbitrary chunks, partial lines are buffered
//! across reads, and a malformed line is logged and skipped rather than
//! killing the whole consumption loop.

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::pipeline::event::ExtractionEvent;

/// Serialize one event to its wire line, newline included.
pub fn encode_line(event: &ExtractionEvent) -> Result<String> {
    let mut line = serde_json::to_string(event).context("Failed to serialize event")?;
    line.push('\n');
    Ok(line)
}

/// Write one event to an async sink and flush it immediately.
pub async fn write_event<W>(writer: &mut W, event: &ExtractionEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = encode_line(event)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Incremental decoder for the event stream.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes and return every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ExtractionEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = decode_line(&line[..newline]) {
                events.push(event);
            }
        }
        events
    }

    /// Decode a trailing line that arrived without a final newline.
    pub fn finish(&mut self) -> Option<ExtractionEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<ExtractionEvent> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, line = text, "skipping malformed event line");
            None
        }
    }
}
