//! Vector math for embeddings.
//!
//! The index compares vectors with a plain dot product, so everything that
//! goes into it is L2-normalized first. For unit vectors the dot product is
//! the cosine similarity.

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(dot_unchecked(a, b))
}

/// Dot product for slices already known to share a length.
pub(crate) fn dot_unchecked(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize an embedding to unit length in place.
///
/// The zero vector (and any vector whose norm is not a positive finite
/// number) is left as all zeros rather than divided by zero.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude = l2_norm(embedding);
    if magnitude > 0.0 && magnitude.is_finite() {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    } else {
        embedding.iter_mut().for_each(|x| *x = 0.0);
    }
}

/// Owned variant of [`normalize`].
pub fn normalized(mut embedding: Embedding) -> Embedding {
    normalize(&mut embedding);
    embedding
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(matches!(
            dot_product(&a, &b),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_stays_zero() {
        let v = normalized(vec![0.0; 4]);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn test_normalize_non_finite_collapses_to_zero() {
        let v = normalized(vec![f32::INFINITY, 1.0]);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn test_dot_of_normalized_is_cosine() {
        let a = normalized(vec![1.0, 2.0, 3.0]);
        let b = normalized(vec![-2.0, 0.5, 4.0]);
        let dot = dot_product(&a, &b).unwrap();
        // (-2 + 1 + 12) / (sqrt(14) * sqrt(20.25))
        let cos = 11.0 / (14.0f32.sqrt() * 4.5);
        assert!((dot - cos).abs() < 1e-5);
    }
}
