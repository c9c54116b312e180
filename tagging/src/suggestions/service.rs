//! The generative suggestion capability and its Anthropic-backed implementation.

use crate::model::{MatchId, Player, Tag};
use matchtag_anthropic::{AnthropicClient, ContentBlock, Message, MessagesRequest, Tool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use super::prompt::{RECORD_TOOL, record_schema, system_prompt, user_prompt};
use super::{LearningContext, SuggestionConfig, SuggestionError};

/// One still image from the match video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// MIME type such as `image/jpeg`
    pub media_type: String,
    /// Base64 payload
    pub data: String,
    /// Where in the video the frame was taken, in whole seconds
    pub at_secs: u32,
}

/// Everything sent to the service for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    /// Match being tagged
    pub match_id: MatchId,
    /// Summary of historical tags
    pub context: LearningContext,
    /// Latest tags of the match, oldest first
    pub recent_tags: Vec<Tag>,
    /// Squad, so the service can name players
    pub players: Vec<Player>,
    /// Images to look at
    pub frames: Vec<Frame>,
}

/// A candidate as returned by the service, before screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSuggestion {
    /// Seconds, as a number or a time string
    #[serde(default)]
    pub timestamp: Value,
    /// Proposed action label
    #[serde(alias = "metric")]
    pub action: String,
    /// What the service saw
    #[serde(default)]
    pub description: String,
    /// Confidence, either `[0, 1]` or a percentage
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Why it was proposed
    #[serde(default, alias = "reasoning")]
    pub rationale: Option<String>,
    /// Player the service attributed it to
    #[serde(default, alias = "player_id")]
    pub player_id: Option<String>,
}

/// Source of candidate actions.
///
/// # Dyn Compatibility
///
/// Returns a boxed future so the service can be held as
/// `Arc<dyn SuggestionService>` in the coach environment.
pub trait SuggestionService: Send + Sync {
    /// Ask for candidates. One round trip, no retry.
    ///
    /// # Errors
    ///
    /// [`SuggestionError::Service`] when the call fails and
    /// [`SuggestionError::MalformedResponse`] when the answer holds no
    /// candidate list.
    fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawSuggestion>, SuggestionError>> + Send + '_>>;
}

/// Suggestions from Claude through a forced tool call.
#[derive(Clone, Debug)]
pub struct AnthropicSuggestionService {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicSuggestionService {
    /// Build the service from a client and the configured model.
    #[must_use]
    pub fn new(client: AnthropicClient, config: &SuggestionConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn build_request(&self, request: &SuggestionRequest) -> MessagesRequest {
        let mut blocks: Vec<ContentBlock> = request
            .frames
            .iter()
            .map(|f| ContentBlock::image_base64(f.media_type.clone(), f.data.clone()))
            .collect();
        blocks.push(ContentBlock::Text {
            text: user_prompt(request),
        });

        MessagesRequest::new(vec![Message::user_blocks(blocks)])
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_system(system_prompt())
            .with_tools(vec![Tool {
                name: RECORD_TOOL.to_string(),
                description: "Record the plays proposed for the coach to review".to_string(),
                input_schema: record_schema(),
            }])
            .with_forced_tool(RECORD_TOOL)
    }
}

impl SuggestionService for AnthropicSuggestionService {
    fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawSuggestion>, SuggestionError>> + Send + '_>> {
        Box::pin(async move {
            let body = self.build_request(&request);
            let response = self
                .client
                .messages(body)
                .await
                .map_err(|e| SuggestionError::Service(e.to_string()))?;

            if let Some(input) = response.tool_input(RECORD_TOOL) {
                return parse_candidates(input);
            }
            tracing::debug!("No tool call in response, reading text");
            parse_candidates_text(&response.text())
        })
    }
}

/// Read a candidate list from a tool input or a bare array.
///
/// Accepts `[...]`, `{"suggestions": [...]}` or `{"plays": [...]}`.
/// Items that are not candidates are skipped.
///
/// # Errors
///
/// [`SuggestionError::MalformedResponse`] when no list is found.
pub fn parse_candidates(value: &Value) -> Result<Vec<RawSuggestion>, SuggestionError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("suggestions").or_else(|| map.get("plays")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SuggestionError::MalformedResponse(
                    "object without a suggestions list".to_string(),
                ));
            },
        },
        other => {
            return Err(SuggestionError::MalformedResponse(format!(
                "expected a list, got {other}"
            )));
        },
    };

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value::<RawSuggestion>(item.clone()) {
            Ok(candidate) => Some(candidate),
            Err(error) => {
                tracing::warn!(%error, "Skipping unreadable candidate");
                None
            },
        })
        .collect())
}

/// Read a candidate list out of free text, tolerating code fences and prose
/// around the JSON.
///
/// # Errors
///
/// [`SuggestionError::MalformedResponse`] when the text holds no JSON list.
pub fn parse_candidates_text(text: &str) -> Result<Vec<RawSuggestion>, SuggestionError> {
    let start = text.find(['[', '{']);
    let end = text.rfind([']', '}']);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(SuggestionError::MalformedResponse("no JSON in response".to_string()));
    };
    if end < start {
        return Err(SuggestionError::MalformedResponse("no JSON in response".to_string()));
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| SuggestionError::MalformedResponse(e.to_string()))?;
    parse_candidates(&value)
}
