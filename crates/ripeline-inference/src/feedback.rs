//! Feedback message sent back to a device after each batch
//!
//! Format: `"{score}{band},{brix};"`, e.g. `"87B,10.42;"`. An unavailable
//! score is rendered as `-1`; an unavailable brix is treated as `-1.0`
//! (band A).

use crate::band::BrixBand;

/// Score written when the classifier is unavailable
pub const UNAVAILABLE_SCORE: i64 = -1;

/// Brix used when the regressor is unavailable
pub const UNAVAILABLE_BRIX: f64 = -1.0;

/// Predictor outputs for one batch, with sentinels applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Integer score in `[0, 100]`, or `-1`
    pub score: i64,
    /// Predicted brix, or `-1.0`
    pub brix: f64,
    pub band: BrixBand,
}

impl Prediction {
    pub fn new(score: Option<u8>, brix: Option<f64>) -> Self {
        let brix = brix.unwrap_or(UNAVAILABLE_BRIX);
        Self {
            score: score.map(i64::from).unwrap_or(UNAVAILABLE_SCORE),
            brix,
            band: BrixBand::from_brix(brix),
        }
    }

    /// Brix rounded to two decimals
    pub fn rounded_brix(&self) -> f64 {
        round2(self.brix)
    }

    /// Wire form of the feedback message
    pub fn feedback_message(&self) -> String {
        format!("{}{},{:?};", self.score, self.band, self.rounded_brix())
    }
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_format() {
        assert_eq!(Prediction::new(Some(87), Some(10.4237)).feedback_message(), "87B,10.42;");
        assert_eq!(Prediction::new(Some(3), Some(19.0)).feedback_message(), "3E,19.0;");
        assert_eq!(Prediction::new(Some(100), Some(8.999)).feedback_message(), "100A,9.0;");
    }

    #[test]
    fn test_unavailable_sentinels() {
        assert_eq!(Prediction::new(None, Some(12.5)).feedback_message(), "-1C,12.5;");
        assert_eq!(Prediction::new(Some(40), None).feedback_message(), "40A,-1.0;");
        assert_eq!(Prediction::new(None, None).feedback_message(), "-1A,-1.0;");
    }

    #[test]
    fn test_band_uses_unrounded_value() {
        // 8.999 rounds to 9.0 for display but is still band A
        let prediction = Prediction::new(Some(1), Some(8.999));
        assert_eq!(prediction.band, BrixBand::A);
        assert_eq!(prediction.rounded_brix(), 9.0);
    }
}
