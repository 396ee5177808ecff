//! Channel-dependent response parsing
//!
//! The site deployment answers with an array-wrapped element in two known
//! variants: a flat `documentId`, or `documentId` plus a nested `output`
//! object carrying text and picture. The channel deployment answers with a
//! flat object. Anything else is logged and reported as a parse failure,
//! never silently discarded.

use super::GenerationError;
use crate::bot::state::{ArticleResult, Platform};
use crate::config::ERROR_BODY_PREVIEW_CHARS;
use crate::utils::truncate_str;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct InlinePayload {
    text: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteElement {
    #[serde(rename = "documentId")]
    document_id: Option<String>,
    output: Option<SiteOutput>,
}

#[derive(Debug, Deserialize)]
struct SiteOutput {
    text: Option<String>,
    picture: Option<String>,
}

/// Parses a success body according to the requested channel
///
/// # Errors
///
/// Returns [`GenerationError::Parse`] when the body matches neither known
/// shape for the channel.
pub fn parse_article(platform: Platform, body: &str) -> Result<ArticleResult, GenerationError> {
    match platform {
        Platform::ChannelTarget => parse_inline(body),
        Platform::ExternalSiteTarget => parse_site(body),
    }
}

fn parse_inline(body: &str) -> Result<ArticleResult, GenerationError> {
    let payload: InlinePayload =
        serde_json::from_str(body).map_err(|e| shape_error(body, &e.to_string()))?;

    let text = payload
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| shape_error(body, "missing article text"))?;

    Ok(ArticleResult::InlineArticle {
        text,
        picture_url: non_empty(payload.picture),
    })
}

fn parse_site(body: &str) -> Result<ArticleResult, GenerationError> {
    let elements: Vec<SiteElement> =
        serde_json::from_str(body).map_err(|e| shape_error(body, &e.to_string()))?;

    let first = elements
        .into_iter()
        .next()
        .ok_or_else(|| shape_error(body, "empty response array"))?;

    let document_id = first
        .document_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| shape_error(body, "missing documentId"))?;

    let (text, picture_url) = match first.output {
        Some(output) => (non_empty(output.text), non_empty(output.picture)),
        None => (None, None),
    };

    Ok(ArticleResult::ExternalDocument {
        document_id,
        text,
        picture_url,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Unknown shapes are logged here so divergent deployments show up in the
/// logs instead of vanishing as generic failures
fn shape_error(body: &str, reason: &str) -> GenerationError {
    warn!(
        "Unrecognized generation response ({reason}): {}",
        truncate_str(body, ERROR_BODY_PREVIEW_CHARS)
    );
    GenerationError::Parse(reason.to_string())
}
