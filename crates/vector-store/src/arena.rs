use serde::{Deserialize, Serialize};

/// Storage precision for packed vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 32-bit floats. Half the memory of [`Precision::F64`].
    #[default]
    F32,
    /// 64-bit floats. Exact storage of `f32` inputs, `f64` accumulation.
    F64,
}

impl Precision {
    #[must_use]
    pub const fn bytes_per_element(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// One contiguous backing buffer addressed by integer slot.
///
/// Slots are `dimensions` elements wide. The arena never shrinks; freed
/// slots are reused by the store's free list.
pub(crate) struct VectorArena {
    dimensions: usize,
    buffer: Buffer,
}

impl VectorArena {
    pub(crate) fn new(dimensions: usize, precision: Precision) -> Self {
        let buffer = match precision {
            Precision::F32 => Buffer::F32(Vec::new()),
            Precision::F64 => Buffer::F64(Vec::new()),
        };
        Self { dimensions, buffer }
    }

    pub(crate) fn slot_count(&self) -> usize {
        let elements = match &self.buffer {
            Buffer::F32(data) => data.len(),
            Buffer::F64(data) => data.len(),
        };
        elements / self.dimensions
    }

    /// Append a new slot holding `vector`. Returns the slot index.
    pub(crate) fn push(&mut self, vector: &[f32]) -> usize {
        debug_assert_eq!(vector.len(), self.dimensions);
        let slot = self.slot_count();
        match &mut self.buffer {
            Buffer::F32(data) => data.extend_from_slice(vector),
            Buffer::F64(data) => data.extend(vector.iter().map(|&v| f64::from(v))),
        }
        slot
    }

    /// Overwrite an existing slot in place.
    pub(crate) fn write(&mut self, slot: usize, vector: &[f32]) {
        debug_assert_eq!(vector.len(), self.dimensions);
        let start = slot * self.dimensions;
        match &mut self.buffer {
            Buffer::F32(data) => data[start..start + self.dimensions].copy_from_slice(vector),
            Buffer::F64(data) => {
                for (dst, &src) in data[start..start + self.dimensions].iter_mut().zip(vector) {
                    *dst = f64::from(src);
                }
            }
        }
    }

    /// Read a slot back as plain `f32`s regardless of internal packing.
    pub(crate) fn read(&self, slot: usize) -> Vec<f32> {
        let start = slot * self.dimensions;
        match &self.buffer {
            Buffer::F32(data) => data[start..start + self.dimensions].to_vec(),
            #[allow(clippy::cast_possible_truncation)]
            Buffer::F64(data) => data[start..start + self.dimensions]
                .iter()
                .map(|&v| v as f32)
                .collect(),
        }
    }

    /// Cosine similarity between `query` and the vector at `slot`.
    ///
    /// `query_norm` is precomputed by the caller once per search. Zero-norm
    /// vectors score 0.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn cosine(&self, slot: usize, query: &[f32], query_norm: f32) -> f32 {
        if query_norm == 0.0 {
            return 0.0;
        }
        let start = slot * self.dimensions;
        match &self.buffer {
            Buffer::F32(data) => {
                let stored = &data[start..start + self.dimensions];
                let mut dot = 0.0f32;
                let mut norm_sq = 0.0f32;
                for (&q, &v) in query.iter().zip(stored) {
                    dot += q * v;
                    norm_sq += v * v;
                }
                if norm_sq == 0.0 {
                    0.0
                } else {
                    dot / (query_norm * norm_sq.sqrt())
                }
            }
            Buffer::F64(data) => {
                let stored = &data[start..start + self.dimensions];
                let mut dot = 0.0f64;
                let mut norm_sq = 0.0f64;
                for (&q, &v) in query.iter().zip(stored) {
                    dot += f64::from(q) * v;
                    norm_sq += v * v;
                }
                if norm_sq == 0.0 {
                    0.0
                } else {
                    (dot / (f64::from(query_norm) * norm_sq.sqrt())) as f32
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.buffer {
            Buffer::F32(data) => data.clear(),
            Buffer::F64(data) => data.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_through_f32_packing_is_close() {
        let mut arena = VectorArena::new(3, Precision::F32);
        let original = [0.123_456_7f32, -0.987_654_3, 0.5];
        let slot = arena.push(&original);

        let back = arena.read(slot);
        for (a, b) in original.iter().zip(&back) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn f64_packing_preserves_f32_inputs_exactly() {
        let mut arena = VectorArena::new(2, Precision::F64);
        let slot = arena.push(&[0.1, 0.2]);
        assert_eq!(arena.read(slot), vec![0.1, 0.2]);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let mut arena = VectorArena::new(3, Precision::F32);
        let v = [1.0, 2.0, 3.0];
        let slot = arena.push(&v);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        let sim = arena.cosine(slot, &v, norm);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn precision_deviation_stays_small() {
        let v: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).collect();
        let q: Vec<f32> = (0..64).map(|i| (i as f32 * 0.11).cos()).collect();
        let norm = q.iter().map(|x| x * x).sum::<f32>().sqrt();

        let mut a32 = VectorArena::new(64, Precision::F32);
        let mut a64 = VectorArena::new(64, Precision::F64);
        let s32 = a32.push(&v);
        let s64 = a64.push(&v);

        let c32 = a32.cosine(s32, &q, norm);
        let c64 = a64.cosine(s64, &q, norm);
        // Under 0.1% relative deviation between packings.
        assert!((c32 - c64).abs() <= c64.abs().max(1e-3) * 0.001);
    }
}
