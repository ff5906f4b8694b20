//! Similarity computation for embeddings.

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical vectors
/// - 0.0 means orthogonal vectors
/// - -1.0 means opposite vectors
///
/// A zero-magnitude operand scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    Ok(cosine_from_parts(dot, magnitude(a), magnitude(b)))
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Euclidean length of a vector.
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

pub(crate) fn cosine_from_parts(dot: f32, magnitude_a: f32, magnitude_b: f32) -> f32 {
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot / (magnitude_a * magnitude_b)
}

/// Index of the largest score.
///
/// The first occurrence wins on ties and NaN never wins. Returns `None` when
/// no score is comparable.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Cosine similarity of every query against every row.
///
/// The result has one row per query and one column per candidate row.
pub fn similarity_matrix(queries: &[Embedding], rows: &[Embedding]) -> Result<Vec<Vec<f32>>> {
    queries
        .iter()
        .map(|query| {
            rows.iter()
                .map(|row| cosine_similarity(query, row))
                .collect::<Result<Vec<f32>>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_is_scale_invariant() {
        let a = vec![0.3, 0.4, 0.0];
        let b = vec![30.0, 40.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &b).is_err());
    }

    #[test]
    fn test_argmax_first_occurrence_wins() {
        assert_eq!(argmax(&[0.2, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(argmax(&[-0.5, -0.5]), Some(0));
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.1, 0.3]), Some(2));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_similarity_matrix_shape() {
        let queries = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let rows = vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 2.0]];

        let matrix = similarity_matrix(&queries, &rows).unwrap();
        assert_eq!(matrix.len(), 2);
        assert!(matrix.iter().all(|row| row.len() == 3));
        assert_eq!(argmax(&matrix[0]), Some(0));
        assert_eq!(argmax(&matrix[1]), Some(2));
    }
}
