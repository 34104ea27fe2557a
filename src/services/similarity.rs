//! Cosine similarity over embedding vectors and ranking of candidate sets.

use crate::error::{AppError, AppResult};

/// Cosine similarity in `[-1, 1]`
///
/// A zero vector has no direction, so its similarity to anything is `0.0`.
/// Vectors of different dimensionality are a computation error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> AppResult<f64> {
    if a.len() != b.len() {
        return Err(AppError::Computation(format!(
            "embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Similarity between two possibly-absent embeddings
///
/// An absent vector is a `MissingEmbedding` error, never zero similarity.
pub fn similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> AppResult<f64> {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        (None, _) => Err(AppError::MissingEmbedding("source vector".to_string())),
        (_, None) => Err(AppError::MissingEmbedding("candidate vector".to_string())),
    }
}

/// Ranks candidates against `source`, most similar first
///
/// Ties keep candidate input order. Candidates without an embedding, or whose
/// similarity cannot be computed, are skipped.
pub fn rank<K, V, I>(source: &[f32], candidates: I) -> Vec<(K, f64)>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    V: AsRef<[f32]>,
{
    let mut ranked: Vec<(K, f64)> = Vec::new();

    for (id, embedding) in candidates {
        match similarity(Some(source), embedding.as_ref().map(|v| AsRef::<[f32]>::as_ref(v))) {
            Ok(score) => ranked.push((id, score)),
            Err(AppError::MissingEmbedding(_)) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping candidate with unusable embedding");
            }
        }
    }

    // sort_by is stable, so equal scores stay in input order
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_identical_vectors_score_one() {
        let a = [0.3_f32, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_symmetry() {
        let pairs: [(&[f32], &[f32]); 3] = [
            (&[1.0, 2.0, 3.0], &[-3.0, 0.5, 2.0]),
            (&[0.1, 0.1, 0.9], &[0.9, 0.1, 0.1]),
            (&[5.0, -5.0, 0.0], &[1.0, 1.0, 1.0]),
        ];
        for (a, b) in pairs {
            assert_eq!(cosine_similarity(a, b).unwrap(), cosine_similarity(b, a).unwrap());
        }
    }

    #[test]
    fn test_range() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() + 1.0).abs() < EPS);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < EPS);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let err = cosine_similarity(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, AppError::Computation(_)));
    }

    #[test]
    fn test_missing_vector_is_error() {
        let v = [1.0_f32, 0.0];
        assert!(matches!(
            similarity(None, Some(&v)),
            Err(AppError::MissingEmbedding(_))
        ));
        assert!(matches!(
            similarity(Some(&v), None),
            Err(AppError::MissingEmbedding(_))
        ));
    }

    #[test]
    fn test_rank_orders_descending_and_skips_missing() {
        let source = vec![1.0_f32, 0.0];
        let candidates = vec![
            ("far", Some(vec![0.0_f32, 1.0])),
            ("none", None),
            ("near", Some(vec![1.0_f32, 0.1])),
            ("wrong_dim", Some(vec![1.0_f32])),
        ];

        let ranked = rank(&source, candidates);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let source = vec![1.0_f32, 1.0];
        let same = vec![2.0_f32, 2.0];
        let candidates = vec![("b", Some(same.clone())), ("a", Some(same.clone())), ("c", Some(same))];

        let ids: Vec<&str> = rank(&source, candidates).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_rank_empty_candidates() {
        let ranked: Vec<(&str, f64)> = rank(&[1.0_f32], Vec::<(&str, Option<Vec<f32>>)>::new());
        assert!(ranked.is_empty());
    }
}
