//! ReviewProvider trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core so the review pipeline only
//! ever sees a prompt going in and a [`ModelOutput`] coming back.

pub mod response;
pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::comment::ModelOutput;

/// Errors from the review provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Trait for LLM-backed pull request review.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    /// Send the review prompt and return the parsed reply.
    async fn review(&self, system_prompt: &str, prompt: &str)
    -> Result<ModelOutput, ProviderError>;
}
