//! Reply drafting.
//!
//! Tiers, highest priority first:
//! 1. a configured reply template rendered with the message's fields
//! 2. a generative draft (only when requested and a provider exists)
//! 3. the built-in per-category template
//!
//! Drafting never fails; every error downgrades to the next tier.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::config::ReplyConfig;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Category, InboundEmail, truncate_chars};

/// Body prefix embedded in the drafting prompt.
const PROMPT_BODY_CHARS: usize = 500;

const DRAFT_TEMPERATURE: f32 = 0.7;
const DRAFT_MAX_TOKENS: u32 = 200;

/// `{{`, `}}` or `{name}`.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{(\w+)\}").expect("placeholder pattern is valid"));

/// Render `template`, substituting `{name}` from `values`.
///
/// Unknown placeholders stay in the output verbatim. `{{` and `}}` produce
/// literal braces.
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match caps.get(1) {
            Some(name) => values
                .get(name.as_str())
                .cloned()
                .unwrap_or_else(|| caps[0].to_string()),
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
        })
        .into_owned()
}

/// Built-in reply body for a category, signed with `signature`.
pub fn builtin_template(category: Category, signature: &str) -> String {
    let body = match category {
        Category::TechnicalIssue => {
            "Thank you for reporting this issue. Our technical team has received your report \
             and will investigate immediately.\n\n\
             We typically respond to technical issues within 24 hours. In the meantime, if you \
             have any workarounds or additional details, please reply to this email."
        }
        Category::BillingPayment => {
            "Thank you for your inquiry. Our billing department will review your request and \
             respond within 2 business hours.\n\n\
             For urgent billing matters, please contact us directly at [support phone]."
        }
        Category::ProductInquiry => {
            "Thank you for your interest in our product! We're happy to help.\n\n\
             A product specialist will provide detailed information about your inquiry shortly."
        }
        Category::FeatureRequest => {
            "Thank you for the feature suggestion! We appreciate your feedback and will review \
             your request with our product team.\n\n\
             We forward valuable user suggestions to our development team."
        }
        Category::Other => {
            "Thank you for contacting us. Our team will review your message and respond shortly."
        }
    };
    format!("{body}\n\nBest regards,\n{signature}")
}

/// Drafts reply text for classified messages.
pub struct ReplyDrafter {
    llm: Option<Arc<dyn LlmProvider>>,
    config: ReplyConfig,
}

impl ReplyDrafter {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, config: ReplyConfig) -> Self {
        Self { llm, config }
    }

    /// Draft a reply. Always returns usable text.
    pub async fn generate_reply(
        &self,
        message: &InboundEmail,
        category: Category,
        use_generative: bool,
    ) -> String {
        if let Some(rendered) = self.render_configured(message, category) {
            return rendered;
        }

        if let (true, Some(llm)) = (use_generative, self.llm.as_ref()) {
            match self.draft_with_llm(llm.as_ref(), message, category).await {
                Ok(text) => return text,
                Err(e) => warn!(error = %e, "Generative reply failed, using built-in template"),
            }
        }

        builtin_template(category, &self.config.signature)
    }

    /// Tier 1. `None` when no template is configured or it renders blank.
    fn render_configured(&self, message: &InboundEmail, category: Category) -> Option<String> {
        let template = self.config.template.as_deref()?;
        let values = HashMap::from([
            ("category", category.label().to_string()),
            ("subject", message.subject.clone()),
            ("body", message.body.clone()),
            ("from", message.from.clone()),
            ("date", message.date.clone()),
            ("signature", self.config.signature.clone()),
        ]);
        let rendered = render_template(template, &values);
        if rendered.trim().is_empty() {
            debug!("Reply template rendered empty, falling through");
            return None;
        }
        Some(rendered)
    }

    async fn draft_with_llm(
        &self,
        llm: &dyn LlmProvider,
        message: &InboundEmail,
        category: Category,
    ) -> Result<String, LlmError> {
        let style_hint = match self.config.template.as_deref() {
            Some(t) => format!("\nFollow the structure of this reply template:\n{t}\n"),
            None => String::new(),
        };
        let prompt = format!(
            "Generate a customer support reply to this email.\n\n\
             Customer Category: {category}\n\
             Original Subject: {subject}\n\
             Original Message: {body}\n\n\
             Write a 2-3 sentence response that:\n\
             1. Thanks the customer\n\
             2. Acknowledges their {lower}\n\
             3. Tells them next steps (e.g., \"Our team will respond in 24 hours\")\n\
             {style_hint}\n\
             Tone: {tone}\n\
             Sign off with: {signature}",
            subject = message.subject,
            body = truncate_chars(&message.body, PROMPT_BODY_CHARS),
            lower = category.label().to_lowercase(),
            tone = self.config.tone,
            signature = self.config.signature,
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system(
                "You are a helpful customer support agent. Write warm, professional replies.",
            ),
            ChatMessage::user(prompt),
        ])
        .with_temperature(DRAFT_TEMPERATURE)
        .with_max_tokens(DRAFT_MAX_TOKENS);

        let response = llm.complete(request).await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: llm.model_name().to_string(),
                reason: "empty reply".to_string(),
            });
        }
        Ok(text.to_string())
    }
}
