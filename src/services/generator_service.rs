//! Structure generation through an external text provider.
//!
//! The provider is opaque: anything that can turn a prompt into indented
//! tree text. The core validates the prompt, refuses empty output and feeds
//! the result straight into the tree parser; it never inspects the text
//! semantically.

use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::services::structure_service::{build_plan_from_text, PlanResult};

/// System prompt any provider implementation should pass along so the
/// returned text parses cleanly.
pub const GENERATION_SYSTEM_PROMPT: &str =
    "Return ONLY a plain-text indented folder/file tree. 2 spaces per level. No markdown, no explanations.";

const MIN_PROMPT_CHARS: usize = 10;
const MAX_PROMPT_CHARS: usize = 5000;

/// External text generator. Provider and model hints are passed through
/// verbatim; failures surface as provider-specific messages.
pub trait TextGenerator {
    fn generate(
        &self,
        prompt: &str,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<String, AppError>;
}

/// Validate the prompt and fetch generated tree text.
pub fn generate_structure(
    generator: &dyn TextGenerator,
    prompt: &str,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<String, AppError> {
    let prompt = prompt.trim();
    let length = prompt.chars().count();
    if length < MIN_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "prompt must be at least {MIN_PROMPT_CHARS} characters"
        )));
    }
    if length > MAX_PROMPT_CHARS {
        return Err(AppError::Validation(format!(
            "prompt must not exceed {MAX_PROMPT_CHARS} characters"
        )));
    }

    let text = generator.generate(prompt, provider, model)?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Generation(
            "provider returned an empty structure".to_string(),
        ));
    }

    info!(
        prompt_length = length,
        output_length = text.len(),
        "structure generated"
    );
    Ok(text)
}

/// Generate tree text and return its dry-run plan together with the text,
/// so the caller can show both.
pub fn plan_from_prompt(
    generator: &dyn TextGenerator,
    prompt: &str,
    provider: Option<&str>,
    model: Option<&str>,
    output_dir: &Path,
) -> Result<(PlanResult, String), AppError> {
    let text = generate_structure(generator, prompt, provider, model)?;
    let plan = build_plan_from_text(&text, output_dir)?;
    Ok((plan, text))
}
