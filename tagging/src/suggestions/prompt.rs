//! Prompt text and tool schema for the generative service.

use crate::analytics::time::format_clock;
use crate::taxonomy::Action;
use serde_json::{Value, json};
use std::fmt::Write;

use super::service::SuggestionRequest;

/// Name of the tool the model is forced to answer through.
pub const RECORD_TOOL: &str = "record_suggestions";

const TOP_PATTERNS: usize = 5;

/// System prompt: role and the closed list of actions.
#[must_use]
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You are an expert youth football analyst. You look at frames from a match video \
         and propose plays the coach may want to tag.\n\n\
         Only use these action labels, exactly as written:\n",
    );
    for action in Action::ALL {
        let _ = writeln!(prompt, "- {}", action.label());
    }
    prompt.push_str(
        "\nPropose only clear, visible plays. One correct play is better than three doubtful \
         ones. Give a confidence between 0 and 1. If nothing is clear, record an empty list.",
    );
    prompt
}

/// User prompt: learned patterns, recent tags and the answer format.
#[must_use]
pub fn user_prompt(request: &SuggestionRequest) -> String {
    let context = &request.context;
    let mut prompt = format!("Match {}.\n", request.match_id);

    if !context.histogram.is_empty() {
        prompt.push_str("\nFrequent plays for this team:\n");
        for count in context.histogram.iter().take(TOP_PATTERNS) {
            let _ = writeln!(prompt, "- {} ({} times)", count.action, count.count);
        }
    }

    if !context.follow_ups.is_empty() {
        prompt.push_str("\nPlays that usually follow another within seconds:\n");
        for (antecedent, follow_ups) in &context.follow_ups {
            let list: Vec<&str> = follow_ups.iter().map(|c| c.action.label()).collect();
            let _ = writeln!(prompt, "- after {antecedent}: {}", list.join(", "));
        }
    }

    if let Some(rate) = context.acceptance_rate {
        let _ = writeln!(
            prompt,
            "\nThe coach accepted {:.0}% of recent suggestions.",
            rate * 100.0
        );
    }

    if !request.recent_tags.is_empty() {
        prompt.push_str("\nAlready tagged in this match (do not repeat):\n");
        for tag in &request.recent_tags {
            let _ = writeln!(prompt, "- {} {}", format_clock(tag.timestamp), tag.action());
        }
    }

    if !request.players.is_empty() {
        prompt.push_str("\nSquad (id, shirt, name):\n");
        for player in &request.players {
            let shirt = player
                .jersey_number
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            let _ = writeln!(prompt, "- {} #{shirt} {}", player.id, player.name);
        }
    }

    for frame in &request.frames {
        let _ = writeln!(prompt, "\nA frame is attached at {}.", format_clock(f64::from(frame.at_secs)));
    }

    let _ = write!(
        prompt,
        "\nRecord your proposals with the {RECORD_TOOL} tool. Timestamps are seconds from the \
         start of the video."
    );
    prompt
}

/// JSON schema of the tool input.
#[must_use]
pub fn record_schema() -> Value {
    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
    json!({
        "type": "object",
        "properties": {
            "suggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "timestamp": { "type": "number", "description": "Seconds from the start of the video" },
                        "action": { "type": "string", "enum": labels },
                        "description": { "type": "string" },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                        "rationale": { "type": "string" },
                        "playerId": { "type": "string" }
                    },
                    "required": ["timestamp", "action", "description"]
                }
            }
        },
        "required": ["suggestions"]
    })
}
