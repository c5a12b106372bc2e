//! Risk triage: decides whether a record needs mandatory human review.

use crate::pipeline::types::Category;

/// Confidence below this forces manual review.
pub const RISK_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// `true` iff the category is `Other` or the confidence is below 0.6.
///
/// An absent confidence never trips the threshold; only the category check
/// applies then.
pub fn is_risky(category: Category, confidence: Option<f64>) -> bool {
    category == Category::Other || confidence.is_some_and(|c| c < RISK_CONFIDENCE_THRESHOLD)
}
