// Similarity evaluation for embedding vectors
// The only numeric contract in the engine; both backends must agree with it


use crate::{RetrievalError, Result};

/// Compute the cosine similarity between two equal-length vectors.
///
/// Implemented as `dot(a, b) / (norm(a) * norm(b))`, accumulated in f64 so
/// the result is reproducible regardless of input ordering quirks. Returns a
/// value in [-1, 1].
///
/// # Errors
/// * `DimensionMismatch` if the inputs are empty or differ in length
/// * `DegenerateVector` if either input has a zero norm
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(RetrievalError::DegenerateVector);
    }

    Ok((dot / (norm_a * norm_b)) as f32)
}
