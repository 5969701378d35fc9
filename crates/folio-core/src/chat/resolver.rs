//! Response resolution
//!
//! Tries the completion service when a credential is configured, bounded by a
//! hard deadline, and falls back to the canned table on any failure. The
//! resolver never touches metrics; it reports what happened and the caller
//! records it.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::completion::{
    ChatMessage, ChatRole, CompletionClient, CompletionError, CompletionRequest, OpenAiClient,
};
use super::fallback::CannedResponseTable;
use crate::config::Config;
use crate::error::Result;
use crate::models::{ConversationTurn, ResponseSource};

/// Credential value shipped in sample `.env` files, treated as "not configured"
pub const PLACEHOLDER_API_KEY: &str = "your-openai-api-key-here";

/// Knobs that shape the completion call
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// API credential; absent, empty or placeholder disables external calls
    pub api_key: Option<String>,
    /// Persona preamble
    pub system_prompt: String,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Hard deadline for one completion call
    pub timeout: Duration,
    /// Trailing history turns forwarded as context
    pub history_limit: usize,
}

impl ResolverSettings {
    /// Settings from the application config
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.completion.api_key.clone(),
            system_prompt: config.completion.system_prompt.clone(),
            max_tokens: config.completion.max_tokens,
            temperature: config.completion.temperature,
            timeout: config.completion.timeout(),
            history_limit: config.chat.history_limit,
        }
    }

    /// Whether an external call should be attempted
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY)
    }
}

/// Outcome of resolving one message
#[derive(Debug)]
pub struct Resolution {
    /// Answer text, never empty
    pub text: String,
    /// `External` or `Fallback`
    pub source: ResponseSource,
    /// Tokens reported by the completion service, for external answers
    pub tokens: Option<u64>,
    /// Why the external call failed, when one was attempted and failed
    pub failure: Option<CompletionError>,
}

/// Picks an answer for a visitor message
#[derive(Clone)]
pub struct ResponseResolver {
    client: Arc<dyn CompletionClient>,
    table: Arc<CannedResponseTable>,
    settings: ResolverSettings,
}

impl std::fmt::Debug for ResponseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseResolver")
            .field("keywords", &self.table.len())
            .field("external", &self.has_credential())
            .field("timeout", &self.settings.timeout)
            .finish_non_exhaustive()
    }
}

impl ResponseResolver {
    /// Create a resolver
    pub fn new(
        client: Arc<dyn CompletionClient>,
        table: Arc<CannedResponseTable>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            client,
            table,
            settings,
        }
    }

    /// Create a resolver backed by the OpenAI client and the configured table
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAiClient::new(&config.completion)?;
        let table = CannedResponseTable::from_config(&config.chat)?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(table),
            ResolverSettings::from_config(config),
        ))
    }

    /// Whether external calls are enabled
    pub fn has_credential(&self) -> bool {
        self.settings.has_credential()
    }

    /// Resolve `message` to an answer
    ///
    /// Errors only when the fallback table cannot produce an answer.
    pub async fn resolve(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<Resolution> {
        if !self.has_credential() {
            info!("No completion credential configured, using canned responses");
            return self.fallback(message, None);
        }

        let request = self.build_request(message, history);

        let call = self.client.complete(&request);
        let outcome = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(completion)) if completion.text.trim().is_empty() => Err(
                CompletionError::Malformed("empty completion text".to_string()),
            ),
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.settings.timeout)),
        };

        match outcome {
            Ok(completion) => Ok(Resolution {
                text: completion.text.trim().to_string(),
                source: ResponseSource::External,
                tokens: Some(completion.tokens),
                failure: None,
            }),
            Err(err) => self.fallback(message, Some(err)),
        }
    }

    fn fallback(&self, message: &str, failure: Option<CompletionError>) -> Result<Resolution> {
        let text = self.table.pick(message)?.to_string();
        Ok(Resolution {
            text,
            source: ResponseSource::Fallback,
            tokens: None,
            failure,
        })
    }

    /// System preamble, the last `history_limit` non-empty turns, then the message
    fn build_request(&self, message: &str, history: &[ConversationTurn]) -> CompletionRequest {
        let context: Vec<&ConversationTurn> = history
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .collect();
        let skip = context.len().saturating_sub(self.settings.history_limit);

        let mut messages = Vec::with_capacity(self.settings.history_limit + 2);
        messages.push(ChatMessage::new(ChatRole::System, self.settings.system_prompt.clone()));
        messages.extend(context.into_iter().skip(skip).map(|turn| {
            let role = if turn.is_user() {
                ChatRole::User
            } else {
                ChatRole::Assistant
            };
            ChatMessage::new(role, turn.text.clone())
        }));
        messages.push(ChatMessage::new(ChatRole::User, message));

        CompletionRequest {
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}
