//! Normalisation of a batch against a device's white standard
//!
//! The batch is reduced to per-channel arithmetic means ("raw means"); the
//! first `len(white_standard)` means are then divided element-wise by the
//! standard. Channels past the standard (e.g. temperature) are kept in the
//! raw means but not fed to the predictors.

use crate::error::CalibrationError;
use ripeline_sessions::Reading;

/// Raw means plus the normalised predictor input
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated {
    pub raw_means: Vec<f64>,
    pub normalized: Vec<f64>,
}

/// Per-channel mean over a batch
pub fn channel_means(readings: &[Reading]) -> Result<Vec<f64>, CalibrationError> {
    let first = readings.first().ok_or(CalibrationError::EmptyBatch)?;
    let width = first.width();

    let mut sums = vec![0.0; width];
    for reading in readings {
        if reading.width() != width {
            return Err(CalibrationError::UnequalWidths {
                expected: width,
                found: reading.width(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(&reading.values) {
            *sum += value;
        }
    }

    let n = readings.len() as f64;
    Ok(sums.into_iter().map(|sum| sum / n).collect())
}

/// Divide the leading channels by the white standard
pub fn normalize(raw_means: &[f64], white_standard: &[f64]) -> Result<Vec<f64>, CalibrationError> {
    if let Some(index) = white_standard.iter().position(|v| *v == 0.0 || !v.is_finite()) {
        return Err(CalibrationError::InvalidStandard { index });
    }
    if raw_means.len() < white_standard.len() {
        return Err(CalibrationError::TooFewChannels {
            channels: raw_means.len(),
            required: white_standard.len(),
        });
    }

    Ok(raw_means
        .iter()
        .zip(white_standard)
        .map(|(mean, standard)| mean / standard)
        .collect())
}

/// Means then normalisation in one step
pub fn calibrate(readings: &[Reading], white_standard: &[f64]) -> Result<Calibrated, CalibrationError> {
    let raw_means = channel_means(readings)?;
    let normalized = normalize(&raw_means, white_standard)?;
    Ok(Calibrated {
        raw_means,
        normalized,
    })
}
