//! Message classifier: generative primary path with a deterministic
//! keyword fallback.
//!
//! Classification never fails: any error on the generative path is logged
//! and the keyword scorer answers instead.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Category, Classification};

/// Temperature for the classification call.
const CLASSIFY_TEMPERATURE: f32 = 0.3;

/// Max tokens for the classification call (answer is a tiny JSON object).
const CLASSIFY_MAX_TOKENS: u32 = 100;

/// Confidence assumed when the model omits or garbles the field.
const DEFAULT_MODEL_CONFIDENCE: f64 = 0.5;

/// Fallback confidence when no keyword matches.
pub const NO_MATCH_CONFIDENCE: f64 = 0.3;

/// Cap on keyword-derived confidence.
const KEYWORD_CONFIDENCE_CAP: f64 = 0.7;

/// Confidence contributed by each keyword hit.
const KEYWORD_CONFIDENCE_STEP: f64 = 0.1;

/// Keyword lists per category, in tie-break order.
const KEYWORD_RULES: &[(Category, &[&str])] = &[
    (
        Category::TechnicalIssue,
        &["error", "bug", "crash", "not working", "broken", "issue", "problem"],
    ),
    (
        Category::BillingPayment,
        &["invoice", "payment", "billing", "subscription", "charge", "refund", "price"],
    ),
    (
        Category::ProductInquiry,
        &["what is", "how does", "tell me about", "specifications", "features"],
    ),
    (
        Category::FeatureRequest,
        &["feature request", "request", "add", "implement", "could you", "would like"],
    ),
];

/// Classifies (subject, body) pairs into a [`Category`].
pub struct Classifier {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl Classifier {
    /// `llm = None` means rule-based only.
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    pub fn rule_based() -> Self {
        Self { llm: None }
    }

    /// Classify a message. Never fails.
    pub async fn classify(&self, subject: &str, body: &str) -> Classification {
        let Some(ref llm) = self.llm else {
            return classify_by_keywords(subject, body);
        };

        match classify_with_llm(llm.as_ref(), subject, body).await {
            Ok(classification) => {
                debug!(
                    category = %classification.category,
                    confidence = classification.confidence,
                    "Classified by model"
                );
                classification
            }
            Err(e) => {
                warn!(error = %e, "Model classification failed, falling back to keyword rules");
                classify_by_keywords(subject, body)
            }
        }
    }
}

async fn classify_with_llm(
    llm: &dyn LlmProvider,
    subject: &str,
    body: &str,
) -> Result<Classification, LlmError> {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    let user_prompt = format!(
        "Classify the following customer support email into ONE of these categories:\n\
         {}\n\n\
         Email Subject: {subject}\n\
         Email Body: {body}\n\n\
         Respond in JSON format:\n\
         {{\"category\": \"CATEGORY_NAME\", \"confidence\": 0.95}}",
        labels.join(", ")
    );

    let request = CompletionRequest::new(vec![
        ChatMessage::system(
            "You are a customer support email classifier. Respond only in JSON format.",
        ),
        ChatMessage::user(user_prompt),
    ])
    .with_temperature(CLASSIFY_TEMPERATURE)
    .with_max_tokens(CLASSIFY_MAX_TOKENS);

    let response = llm.complete(request).await?;
    let value = parse_model_json(&response.content).map_err(|reason| {
        LlmError::InvalidResponse {
            provider: llm.model_name().to_string(),
            reason,
        }
    })?;

    classification_from_json(&value).ok_or_else(|| LlmError::InvalidResponse {
        provider: llm.model_name().to_string(),
        reason: format!("expected a JSON object, got {value}"),
    })
}

/// Build a classification from the model's JSON, forcing unknown labels to `Other`.
///
/// `None` unless the answer is a JSON object.
fn classification_from_json(value: &serde_json::Value) -> Option<Classification> {
    let value = value.as_object()?;
    let category = value
        .get("category")
        .and_then(|v| v.as_str())
        .map_or(Category::Other, Category::normalize);

    let confidence = value
        .get("confidence")
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|c: &f64| c.is_finite())
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE)
        .clamp(0.0, 1.0);

    Some(Classification {
        category,
        confidence,
    })
}

/// Deterministic keyword-frequency classification.
///
/// Highest non-zero score wins (first in enumeration order on ties) with
/// confidence `min(0.7, 0.1 × score)`; no hits gives `("Other", 0.3)`.
pub fn classify_by_keywords(subject: &str, body: &str) -> Classification {
    let text = format!("{subject} {body}").to_lowercase();

    let mut best: Option<(Category, usize)> = None;
    for (category, keywords) in KEYWORD_RULES {
        let score: usize = keywords.iter().map(|kw| text.matches(kw).count()).sum();
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((*category, score));
        }
    }

    match best {
        Some((category, score)) => Classification {
            category,
            confidence: (score as f64 * KEYWORD_CONFIDENCE_STEP).min(KEYWORD_CONFIDENCE_CAP),
        },
        None => Classification {
            category: Category::Other,
            confidence: NO_MATCH_CONFIDENCE,
        },
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse JSON out of model output.
///
/// Tries, in order: the whole text, the first fenced code block, the first
/// balanced `{...}` span.
pub fn parse_model_json(raw: &str) -> Result<serde_json::Value, String> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(Ok(value)) = fenced_block(trimmed).map(serde_json::from_str) {
        return Ok(value);
    }

    if let Some(span) = first_balanced_object(trimmed) {
        return serde_json::from_str(span).map_err(|e| format!("JSON parse error: {e}"));
    }

    Err(format!(
        "no JSON found in model output: {}",
        trimmed.chars().take(200).collect::<String>()
    ))
}

/// Contents of the first ```` ``` ```` fence, minus an optional language tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let end = after.find("```")?;
    let inner = &after[..end];
    // Drop a language tag such as `json` on the opening line.
    let inner = match inner.find('\n') {
        Some(nl) if !inner[..nl].trim_start().starts_with('{') => &inner[nl + 1..],
        _ => inner,
    };
    Some(inner.trim())
}

/// First `{...}` span with balanced braces, ignoring braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
