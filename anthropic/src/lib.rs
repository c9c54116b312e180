//! # Anthropic Claude API Client
//!
//! Minimal client for the Anthropic Messages API: text and image content,
//! tool definitions, and forced tool choice for structured output.
//!
//! ## Example
//!
//! ```no_run
//! use matchtag_anthropic::{AnthropicClient, MessagesRequest};
//! use matchtag_anthropic::types::Message;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AnthropicClient::from_env()?;
//! let request = MessagesRequest::new(vec![Message::user("Hello, Claude!")]);
//! let response = client.messages(request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod messages;
pub mod types;

// Re-export main types for convenience
pub use client::AnthropicClient;
pub use error::ClaudeError;
pub use messages::{MessagesRequest, MessagesResponse};
pub use types::{ContentBlock, ImageSource, Message, Role, StopReason, Tool, ToolChoice, Usage};
