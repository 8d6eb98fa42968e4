//! Career analysis: turns résumé text into career-path suggestions through
//! whichever provider the resolver selects.

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, LlmClient};
use crate::settings::{ConfigOverrides, ConfigResolver};

pub mod handlers;
pub mod prompts;

use prompts::{CAREER_ANALYSIS_PROMPT_TEMPLATE, CAREER_ANALYSIS_SYSTEM};

/// `[system, user]` conversation for one analysis request.
pub fn build_messages(resume_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CAREER_ANALYSIS_SYSTEM),
        ChatMessage::user(CAREER_ANALYSIS_PROMPT_TEMPLATE.replace("{resume_text}", resume_text.trim())),
    ]
}

/// Resolves the effective config and asks the model for an analysis.
pub async fn analyze_resume(
    resume_text: &str,
    overrides: &ConfigOverrides,
    resolver: &ConfigResolver,
    llm: &LlmClient,
) -> Result<String, AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }

    let config = resolver.resolve(overrides).await;
    info!(
        "Analyzing résumé ({} chars) with {} / {}",
        resume_text.len(),
        config.provider,
        config.model
    );

    let analysis = llm.create_completion(&build_messages(resume_text), &config).await?;
    Ok(analysis)
}
