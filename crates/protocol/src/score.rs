//! Numeric helpers shared by every scoring stage.

/// Clamp to the unit interval.
#[must_use]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Population variance. Zero for fewer than two samples.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn population_variance(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n
}

/// Min-max normalize a score batch to `[0, 1]` in place.
///
/// Non-finite scores are reset to 0. When all finite scores are equal
/// (within a tiny delta) they all become 1.0 rather than dividing by zero.
pub fn min_max_normalize(scores: &mut [f32]) {
    const MIN_DELTA: f32 = 1e-6;

    if scores.is_empty() {
        return;
    }

    let mut min_score = f32::MAX;
    let mut max_score = f32::MIN;
    for &score in scores.iter() {
        if score.is_finite() {
            min_score = min_score.min(score);
            max_score = max_score.max(score);
        }
    }

    if !min_score.is_finite() || !max_score.is_finite() {
        // Nothing finite in the batch.
        for score in scores.iter_mut() {
            *score = 0.0;
        }
        return;
    }

    let range = max_score - min_score;
    if range.abs() < MIN_DELTA {
        for score in scores.iter_mut() {
            *score = if score.is_finite() { 1.0 } else { 0.0 };
        }
        return;
    }

    for score in scores.iter_mut() {
        if !score.is_finite() {
            log::warn!("non-finite score in batch, resetting to minimum");
            *score = min_score;
        }
        *score = (*score - min_score) / range;
    }
}
