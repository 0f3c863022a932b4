//! Evaluation metrics
//!
//! The offline driver reports mean squared error on the held-out split;
//! this is the same computation, exposed for callers that want to score a
//! model against their own data.

/// Mean squared error between predictions and targets.
///
/// Returns `f32::NAN` for empty input: no data is not the same as a
/// perfect score.
pub fn mean_squared_error(predictions: &[f32], targets: &[f32]) -> f32 {
    debug_assert_eq!(predictions.len(), targets.len());
    if predictions.is_empty() {
        return f32::NAN;
    }
    let sum: f32 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| {
            let d = p - t;
            d * d
        })
        .sum();
    sum / predictions.len() as f32
}
