//! Vector helpers shared by the embedders, the store, and search.
//!
//! Stored embeddings are packed little-endian `f32`s, four bytes per element.

/// Pack a vector into its stored byte form.
pub fn serialize(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for x in v {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

/// Unpack stored bytes. Returns an empty vector if the length is not a multiple of 4.
pub fn deserialize(bytes: &[u8]) -> Vec<f32> {
    if bytes.len() % 4 != 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns 0 when the lengths differ, either vector is empty, either norm is zero,
/// or the inputs hold non-finite values. Sums run in `f64`, so no finite `f32`
/// input can overflow them.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0) as f32
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// L2-normalize in place. A zero vector is left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x = (f64::from(*x) / norm) as f32;
        }
    }
}

/// L2-normalized copy of `v`.
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_roundtrip() {
        let v = vec![0.0, -1.5, 3.25, f32::MIN_POSITIVE, 1e-7];
        let bytes = serialize(&v);
        assert_eq!(bytes.len(), v.len() * 4);
        assert_eq!(deserialize(&bytes), v);
    }

    #[test]
    fn test_serialize_is_little_endian() {
        assert_eq!(serialize(&[1.0]), vec![0x00, 0x00, 0x80, 0x3f]);
    }

    #[test]
    fn test_deserialize_bad_length() {
        assert!(deserialize(&[1, 2, 3]).is_empty());
        assert!(deserialize(&[0; 7]).is_empty());
        assert!(deserialize(&[]).is_empty());
    }

    #[test]
    fn test_cosine_self_similarity() {
        let a = vec![0.3, -2.0, 5.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&a, &a).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_and_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let c = vec![0.0, 2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_cosine_stays_in_range() {
        let vectors = [
            vec![1e30, 1e30, -1e30],
            vec![1e-30, 3.0, 0.5],
            vec![-4.0, 0.0, 9.0],
            vec![7.0, 7.0, 7.0],
        ];
        for a in &vectors {
            for b in &vectors {
                let s = cosine_similarity(a, b);
                assert!((-1.0..=1.0).contains(&s), "{s} out of range");
                assert!((cosine_distance(a, b) - (1.0 - s)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_cosine_large_magnitude_parallel() {
        let a = vec![0.6, -0.8, 0.0];
        let b: Vec<f32> = a.iter().map(|x| x * 1e20).collect();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&b, &b) - 1.0).abs() < 1e-6);

        let max = vec![f32::MAX, -f32::MAX];
        assert!((cosine_similarity(&max, &max) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&max, &[-1.0, 1.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_non_finite_input() {
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_large_magnitude() {
        let mut v = vec![3e20, 4e20];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
