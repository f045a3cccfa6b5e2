//! Agreement scores and the similarity math behind them
//!
//! Scores are cosine similarities between response embeddings, clamped to
//! `[0, 1]`: a negative cosine is reported as `0`.

use super::branch::is_usable_text;
use serde::{Deserialize, Serialize};

/// Similarity between two branches' responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementScore {
    pub id_a: String,
    pub id_b: String,
    pub score: f64,
}

impl AgreementScore {
    pub fn new(id_a: impl Into<String>, id_b: impl Into<String>, score: f64) -> Self {
        Self {
            id_a: id_a.into(),
            id_b: id_b.into(),
            score,
        }
    }

    /// Whether this score is about the given pair, in either order.
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.id_a == a && self.id_b == b) || (self.id_a == b && self.id_b == a)
    }
}

/// Cosine similarity of two vectors, clamped to `[0, 1]`.
///
/// Mismatched lengths, empty vectors and zero magnitudes score `0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Keep the entries whose text can be compared, preserving order.
pub fn usable_entries<'a>(texts: &'a [(String, String)]) -> Vec<(&'a str, &'a str)> {
    texts
        .iter()
        .filter(|(_, text)| is_usable_text(text))
        .map(|(id, text)| (id.as_str(), text.as_str()))
        .collect()
}

/// Score every unordered pair `i < j` in input order.
pub fn pairwise_scores(embeddings: &[(&str, Vec<f32>)]) -> Vec<AgreementScore> {
    let mut scores = Vec::new();
    for (i, (id_a, va)) in embeddings.iter().enumerate() {
        for (id_b, vb) in &embeddings[i + 1..] {
            scores.push(AgreementScore::new(*id_a, *id_b, cosine_similarity(va, vb)));
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(scores: &'a [AgreementScore], a: &str, b: &str) -> &'a AgreementScore {
        scores.iter().find(|s| s.involves(a, b)).unwrap()
    }

    #[test]
    fn test_known_vectors() {
        let embeddings = vec![
            ("o", vec![1.0, 0.0]),
            ("g", vec![0.0, 1.0]),
            ("a", vec![0.8, 0.6]),
        ];
        let scores = pairwise_scores(&embeddings);
        assert_eq!(scores.len(), 3);
        assert!((find(&scores, "o", "g").score - 0.0).abs() < 1e-6);
        assert!((find(&scores, "g", "a").score - 0.6).abs() < 1e-6);
        assert!((find(&scores, "a", "o").score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_pair_order_follows_input() {
        let embeddings = vec![
            ("x", vec![1.0]),
            ("y", vec![1.0]),
            ("z", vec![1.0]),
        ];
        let pairs: Vec<_> = pairwise_scores(&embeddings)
            .into_iter()
            .map(|s| (s.id_a, s.id_b))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("x".to_string(), "y".to_string()),
                ("x".to_string(), "z".to_string()),
                ("y".to_string(), "z".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_cosine_clamped_to_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_degenerate_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_identical_vectors_score_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_usable_entries_drop_blank_texts() {
        let texts = vec![
            ("a".to_string(), String::new()),
            ("b".to_string(), "x".to_string()),
            ("c".to_string(), " \n".to_string()),
            ("d".to_string(), "y".to_string()),
        ];
        assert_eq!(usable_entries(&texts), vec![("b", "x"), ("d", "y")]);
    }

    #[test]
    fn test_score_wire_names() {
        let value = serde_json::to_value(AgreementScore::new("a", "b", 0.5)).unwrap();
        assert_eq!(value["idA"], "a");
        assert_eq!(value["idB"], "b");
        assert_eq!(value["score"], 0.5);
    }
}
