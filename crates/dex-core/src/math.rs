//! Shared math utilities.

/// Euclidean norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine distance: `1 - cos(a, b)`, in `[0, 2]`.
///
/// Returns exactly `1.0` if either vector has zero norm or the lengths
/// differ, so callers never divide by zero or compare across embedders.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 1.0;
    }
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = dot(a, b) / (norm_a * norm_b);
    (1.0 - similarity).clamp(0.0, 2.0)
}
