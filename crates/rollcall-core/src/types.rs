use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Map a box found on a downscaled frame back onto the full-size frame.
    pub fn scaled(&self, factor: f32) -> BoundingBox {
        BoundingBox {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
            confidence: self.confidence,
            landmarks: self
                .landmarks
                .map(|lms| lms.map(|(lx, ly)| (lx * factor, ly * factor))),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Face embedding vector (512-dimensional for ArcFace w600k_r50).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar.
    ///
    /// Embeddings of different lengths come from different models and score 0.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Raw little-endian `f32` layout, as stored in the `employees.encoding` blob.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Inverse of [`to_le_bytes`](Self::to_le_bytes). Returns `None` when the
    /// blob is not a whole number of `f32` values.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Some(Self { values })
    }
}

/// A registered employee as persisted in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub embedding: Embedding,
}

/// Binary match predicate between an enrolled embedding and a probe.
pub trait Matcher {
    fn is_match(&self, known: &Embedding, probe: &Embedding) -> bool;
}

/// Cosine similarity matcher: a probe matches when similarity reaches the threshold.
#[derive(Debug, Clone, Copy)]
pub struct CosineMatcher {
    pub threshold: f32,
}

impl CosineMatcher {
    pub const DEFAULT_THRESHOLD: f32 = 0.40;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for CosineMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl Matcher for CosineMatcher {
    fn is_match(&self, known: &Embedding, probe: &Embedding) -> bool {
        known.similarity(probe) >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_similarity_identical() {
        let a = emb(&[1.0, 0.0, 0.0]);
        assert!((a.similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal() {
        assert!(emb(&[1.0, 0.0]).similarity(&emb(&[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        assert_eq!(emb(&[0.0, 0.0]).similarity(&emb(&[1.0, 0.0])), 0.0);
    }

    #[test]
    fn test_similarity_length_mismatch_scores_zero() {
        let known = emb(&[0.01]);
        let probe = emb(&[1.0, 0.0, 0.0]);
        assert_eq!(known.similarity(&probe), 0.0);
        assert!(!CosineMatcher::default().is_match(&known, &probe));
    }

    #[test]
    fn test_blob_layout_is_little_endian() {
        let bytes = emb(&[1.0, -2.5]).to_le_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(Embedding::from_le_bytes(&bytes), Some(emb(&[1.0, -2.5])));
    }

    #[test]
    fn test_blob_rejects_partial_value() {
        assert_eq!(Embedding::from_le_bytes(&[0, 0, 128]), None);
    }

    #[test]
    fn test_cosine_matcher_threshold_inclusive() {
        let m = CosineMatcher::new(1.0);
        let a = emb(&[0.6, 0.8]);
        assert!(m.is_match(&a, &emb(&[0.6, 0.8])));
        assert!(!m.is_match(&a, &emb(&[0.8, 0.6])));
    }

    #[test]
    fn test_bbox_scaled_maps_landmarks() {
        let b = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 5.0,
            height: 6.0,
            confidence: 0.9,
            landmarks: Some([(1.0, 2.0); 5]),
        };
        let s = b.scaled(4.0);
        assert_eq!((s.x, s.y, s.width, s.height), (40.0, 80.0, 20.0, 24.0));
        assert_eq!(s.right(), 60.0);
        assert_eq!(s.bottom(), 104.0);
        assert_eq!(s.landmarks.unwrap()[0], (4.0, 8.0));
        assert_eq!(s.confidence, 0.9);
    }
}
