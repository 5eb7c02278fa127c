//! Confidence estimation for generated responses

use std::sync::LazyLock;

use regex::Regex;

/// Confidence used when a response carries no marker
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.7;

static CONFIDENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*confidence\s*:\s*([0-9]*\.?[0-9]+)\s*\]")
        .expect("CONFIDENCE_MARKER regex should compile")
});

/// Assigns a confidence in [0, 1] to a generated response
pub trait ConfidenceEstimator: Send + Sync {
    fn estimate(&self, workload_id: &str, text: &str) -> f64;
}

/// Reads a `[confidence: x]` marker from the text, falling back to a fixed value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerConfidence {
    fallback: f64,
}

impl MarkerConfidence {
    pub fn new(fallback: f64) -> Self {
        Self {
            fallback: fallback.clamp(0.0, 1.0),
        }
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    /// Last marker in the text, clamped to [0, 1]
    pub fn parse_marker(text: &str) -> Option<f64> {
        CONFIDENCE_MARKER
            .captures_iter(text)
            .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
            .last()
            .map(|c| c.clamp(0.0, 1.0))
    }
}

impl Default for MarkerConfidence {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_CONFIDENCE)
    }
}

impl ConfidenceEstimator for MarkerConfidence {
    fn estimate(&self, _workload_id: &str, text: &str) -> f64 {
        Self::parse_marker(text).unwrap_or(self.fallback)
    }
}
