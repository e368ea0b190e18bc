use std::sync::Arc;

use crate::error::{ChatError, Result};
use crate::model::Embedding;

/// Turns text into fixed-length vectors, one per input, in input order.
pub trait Encoder: Send + Sync {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    fn encode_single(&self, text: &str) -> Result<Embedding> {
        self.encode(&[text])?
            .pop()
            .ok_or_else(|| ChatError::Encode("encoder returned no embedding".to_string()))
    }
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).encode(texts)
    }
}

impl<E: Encoder + ?Sized> Encoder for Arc<E> {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).encode(texts)
    }
}

/// Bag-of-tokens encoder: FNV-1a hashes each lowercase ASCII token into a
/// bucket, then L2-normalizes. Deterministic and model-free.
#[derive(Debug, Clone)]
pub struct HashEncoder {
    dim: usize,
}

impl HashEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token.as_bytes()) % self.dim as u64) as usize
    }

    fn encode_one(&self, text: &str) -> Embedding {
        let lower = text.to_ascii_lowercase();
        let mut counts = vec![0.0f32; self.dim];
        lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .for_each(|token| counts[self.bucket(token)] += 1.0);

        let norm = counts.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return counts;
        }
        counts.into_iter().map(|x| x / norm).collect()
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

impl Default for HashEncoder {
    fn default() -> Self {
        Self::new(crate::minilm_embed::MINILM_DIM)
    }
}

impl Encoder for HashEncoder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}
