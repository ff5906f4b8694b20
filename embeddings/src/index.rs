//! Immutable nearest-neighbour index over catalog embeddings.

use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{argmax, cosine_from_parts, dot_product, magnitude};

/// The best-scoring row for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<Id> {
    /// Identifier of the matched row.
    pub id: Id,

    /// Row position in catalog order.
    pub position: usize,

    /// Cosine similarity between the query and the row.
    pub score: f32,
}

/// Embeddings for every catalog item, in catalog order.
///
/// Row `i` of `vectors` belongs to `ids[i]`. Vectors are stored exactly as
/// the provider returned them; only their magnitudes are precomputed so a
/// query costs one dot product per row.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex<Id> {
    ids: Vec<Id>,
    vectors: Vec<Embedding>,
    magnitudes: Vec<f32>,
    dimension: usize,
}

impl<Id: Clone> EmbeddingIndex<Id> {
    /// Build an index from parallel id and vector sequences.
    pub fn new(ids: Vec<Id>, vectors: Vec<Embedding>) -> Result<Self> {
        if ids.len() != vectors.len() {
            return Err(EmbeddingError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len).ok_or(EmbeddingError::EmptyIndex)?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let magnitudes = vectors.iter().map(|v| magnitude(v)).collect();
        debug!("Built index with {} rows of dimension {dimension}", ids.len());

        Ok(Self {
            ids,
            vectors,
            magnitudes,
            dimension,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false for a constructed index; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimension shared by every row.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row identifiers in catalog order.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Row vectors in catalog order.
    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    /// Cosine similarity of `query` against every row.
    pub fn scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_magnitude = magnitude(query);
        self.vectors
            .iter()
            .zip(&self.magnitudes)
            .map(|(row, &row_magnitude)| {
                Ok(cosine_from_parts(
                    dot_product(query, row)?,
                    query_magnitude,
                    row_magnitude,
                ))
            })
            .collect()
    }

    /// The row most similar to `query`; the earliest row wins a tie.
    pub fn nearest(&self, query: &[f32]) -> Result<Match<Id>> {
        let scores = self.scores(query)?;
        let position = argmax(&scores).ok_or_else(|| {
            EmbeddingError::InvalidResponse("query embedding has no comparable score".to_string())
        })?;

        Ok(Match {
            id: self.ids[position].clone(),
            position,
            score: scores[position],
        })
    }

    /// [`nearest`](Self::nearest) for each query, in query order.
    pub fn nearest_batch(&self, queries: &[Embedding]) -> Result<Vec<Match<Id>>> {
        queries.iter().map(|q| self.nearest(q)).collect()
    }

    /// Take the parallel sequences back out.
    pub fn into_parts(self) -> (Vec<Id>, Vec<Embedding>) {
        (self.ids, self.vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn axes() -> EmbeddingIndex<u32> {
        EmbeddingIndex::new(
            vec![10, 20, 30],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_picks_matching_axis() {
        let index = axes();
        assert_eq!(index.nearest(&[0.0, 1.0, 0.0]).unwrap().id, 20);
        assert_eq!(index.nearest(&[0.0, 0.0, 5.0]).unwrap().id, 30);

        let m = index.nearest(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(m.position, 0);
        assert!((m.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_goes_to_earliest_row() {
        let index = EmbeddingIndex::new(
            vec!["first", "second", "third"],
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 0.0]],
        )
        .unwrap();

        // Rows 1 and 2 are equally similar after scaling.
        assert_eq!(index.nearest(&[1.0, 0.0]).unwrap().id, "second");
    }

    #[test]
    fn test_nearest_batch_preserves_query_order() {
        let index = axes();
        let queries = vec![
            vec![0.0, 0.0, 1.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
        ];
        let ids: Vec<u32> = index
            .nearest_batch(&queries)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_vectors_are_not_rescaled() {
        let index = EmbeddingIndex::new(vec![1], vec![vec![3.0, 4.0]]).unwrap();
        assert_eq!(index.vectors(), &[vec![3.0, 4.0]]);
    }

    #[test]
    fn test_rejects_inconsistent_parts() {
        assert!(matches!(
            EmbeddingIndex::new(vec![1, 2], vec![vec![1.0]]),
            Err(EmbeddingError::LengthMismatch { ids: 2, vectors: 1 })
        ));
        assert!(matches!(
            EmbeddingIndex::new(vec![1, 2], vec![vec![1.0], vec![1.0, 0.0]]),
            Err(EmbeddingError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            EmbeddingIndex::<u32>::new(Vec::new(), Vec::new()),
            Err(EmbeddingError::EmptyIndex)
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = axes();
        assert!(matches!(
            index.nearest(&[1.0, 0.0]),
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
