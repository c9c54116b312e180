//! Scripted stand-ins for the suggestion service.

use crate::suggestions::{RawSuggestion, SuggestionError, SuggestionRequest, SuggestionService};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type Reply = Result<Vec<RawSuggestion>, SuggestionError>;

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<SuggestionRequest>,
}

/// Suggestion service that answers from a queue.
///
/// Each call pops the next queued reply; an empty queue answers with no
/// candidates. Every request is recorded for inspection.
///
/// # Example
///
/// ```
/// use matchtag::mocks::ScriptedSuggestionService;
/// use matchtag::suggestions::SuggestionError;
///
/// let service = ScriptedSuggestionService::new();
/// service.push_error(SuggestionError::Service("offline".into()));
/// assert_eq!(service.request_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedSuggestionService {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl ScriptedSuggestionService {
    /// A service with nothing queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before every reply
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful reply
    pub fn push_reply(&self, candidates: Vec<RawSuggestion>) {
        self.lock().replies.push_back(Ok(candidates));
    }

    /// Queue a failure
    pub fn push_error(&self, error: SuggestionError) {
        self.lock().replies.push_back(Err(error));
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<SuggestionRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SuggestionService for ScriptedSuggestionService {
    fn suggest(
        &self,
        request: SuggestionRequest,
    ) -> Pin<Box<dyn Future<Output = Reply> + Send + '_>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut script = self.lock();
            script.requests.push(request);
            script.replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        })
    }
}
