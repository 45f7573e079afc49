//! Per-model prompt pricing for cost estimates.
//!
//! Prices are USD per 1K prompt tokens. They only feed the informational
//! "price at this context" line, never billing.

/// Per-model prompt pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Price per 1K prompt tokens.
    pub per_thousand: f64,
}

impl ModelPricing {
    /// Estimate the cost of sending `tokens` prompt tokens.
    pub fn estimate_cost(&self, tokens: usize) -> f64 {
        tokens as f64 / 1000.0 * self.per_thousand
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self { per_thousand: 0.03 }
    }
}

/// Lookup approximate pricing for a model by name.
///
/// Matches on the segment after the last `/` so prefixed names like
/// `"openai/gpt-4"` resolve the same as bare ones. Longer, more specific
/// names are checked before their prefixes.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();

    let per_thousand = if name.starts_with("gpt-4o-mini") {
        0.000_15
    } else if name.starts_with("gpt-4o") {
        0.0025
    } else if name.starts_with("gpt-4-32k") {
        0.06
    } else if name.starts_with("gpt-4-turbo") || name.starts_with("gpt-4-1106") {
        0.01
    } else if name.starts_with("gpt-4") {
        0.03
    } else if name.starts_with("gpt-3.5") {
        0.0015
    } else {
        return ModelPricing::default();
    };
    ModelPricing { per_thousand }
}
