use std::path::Path;

use anyhow::{anyhow, bail};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Embedding as TokenTable, LayerNorm, Linear, VarBuilder};
use rayon::prelude::*;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use crate::embed::Encoder;
use crate::error::{ChatError, Result};
use crate::model::Embedding;

pub const MINILM_DIM: usize = 384;
pub const MODEL_FILE: &str = "model.safetensors";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// sentence-transformers caps all-MiniLM-L6-v2 inputs at 256 word pieces.
pub const MAX_TOKENS: usize = 256;

// all-MiniLM-L6-v2 shape
const VOCAB_SIZE: usize = 30522;
const MAX_POSITIONS: usize = 512;
const TYPE_VOCAB_SIZE: usize = 2;
const INTERMEDIATE_SIZE: usize = 1536;
const NUM_HEADS: usize = 12;
const NUM_LAYERS: usize = 6;
const LAYER_NORM_EPS: f64 = 1e-12;

struct InputEmbeddings {
    words: TokenTable,
    positions: TokenTable,
    token_types: TokenTable,
    norm: LayerNorm,
}

impl InputEmbeddings {
    fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            words: candle_nn::embedding(VOCAB_SIZE, MINILM_DIM, vb.pp("word_embeddings"))?,
            positions: candle_nn::embedding(
                MAX_POSITIONS,
                MINILM_DIM,
                vb.pp("position_embeddings"),
            )?,
            token_types: candle_nn::embedding(
                TYPE_VOCAB_SIZE,
                MINILM_DIM,
                vb.pp("token_type_embeddings"),
            )?,
            norm: candle_nn::layer_norm(MINILM_DIM, LAYER_NORM_EPS, vb.pp("LayerNorm"))?,
        })
    }

    fn forward(&self, ids: &Tensor) -> candle_core::Result<Tensor> {
        let seq_len = ids.dim(1)?;
        let positions = Tensor::arange(0u32, seq_len as u32, ids.device())?.unsqueeze(0)?;
        let types = ids.zeros_like()?;

        let sum = ((self.words.forward(ids)? + self.positions.forward(&positions)?)?
            + self.token_types.forward(&types)?)?;
        self.norm.forward(&sum)
    }
}

/// One post-norm BERT block: self-attention then feed-forward, each with a
/// residual connection.
struct EncoderBlock {
    query: Linear,
    key: Linear,
    value: Linear,
    attn_out: Linear,
    attn_norm: LayerNorm,
    up: Linear,
    down: Linear,
    ffn_norm: LayerNorm,
}

impl EncoderBlock {
    fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        let attn = vb.pp("attention");
        let h = MINILM_DIM;
        Ok(Self {
            query: candle_nn::linear(h, h, attn.pp("self").pp("query"))?,
            key: candle_nn::linear(h, h, attn.pp("self").pp("key"))?,
            value: candle_nn::linear(h, h, attn.pp("self").pp("value"))?,
            attn_out: candle_nn::linear(h, h, attn.pp("output").pp("dense"))?,
            attn_norm: candle_nn::layer_norm(h, LAYER_NORM_EPS, attn.pp("output").pp("LayerNorm"))?,
            up: candle_nn::linear(h, INTERMEDIATE_SIZE, vb.pp("intermediate").pp("dense"))?,
            down: candle_nn::linear(INTERMEDIATE_SIZE, h, vb.pp("output").pp("dense"))?,
            ffn_norm: candle_nn::layer_norm(h, LAYER_NORM_EPS, vb.pp("output").pp("LayerNorm"))?,
        })
    }

    fn split_heads(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        x.reshape((batch, seq_len, NUM_HEADS, MINILM_DIM / NUM_HEADS))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;
        let q = self.split_heads(&self.query.forward(x)?)?;
        let k = self.split_heads(&self.key.forward(x)?)?;
        let v = self.split_heads(&self.value.forward(x)?)?;

        let scale = ((MINILM_DIM / NUM_HEADS) as f64).sqrt().recip();
        let weights = q.matmul(&k.t()?.contiguous()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax_last_dim(&weights)?;
        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, MINILM_DIM))?;

        let x = self.attn_norm.forward(&(x + self.attn_out.forward(&context)?)?)?;
        let ffn = self.down.forward(&self.up.forward(&x)?.gelu_erf()?)?;
        self.ffn_norm.forward(&(x + ffn)?)
    }
}

struct MiniLm {
    embeddings: InputEmbeddings,
    blocks: Vec<EncoderBlock>,
    device: Device,
}

impl MiniLm {
    fn load(weights: &Path, device: Device) -> anyhow::Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        // Some exports keep the `bert.` prefix from the pretraining head.
        let vb = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb
        };

        let embeddings = InputEmbeddings::load(vb.pp("embeddings"))?;
        let blocks = (0..NUM_LAYERS)
            .map(|i| EncoderBlock::load(vb.pp("encoder").pp("layer").pp(i.to_string())))
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self {
            embeddings,
            blocks,
            device,
        })
    }

    /// Mean-pooled, L2-normalized sentence vector for one token sequence.
    fn forward(&self, token_ids: &[u32]) -> anyhow::Result<Embedding> {
        if token_ids.is_empty() {
            bail!("empty token sequence");
        }

        let ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let mut hidden = self.embeddings.forward(&ids)?;
        for block in &self.blocks {
            hidden = block.forward(&hidden)?;
        }

        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / norm as f64, 0.0)?
        } else {
            pooled
        };

        Ok(pooled.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

/// all-MiniLM-L6-v2 sentence encoder running on the CPU.
pub struct MiniLmEncoder {
    model: MiniLm,
    tokenizer: Tokenizer,
}

impl MiniLmEncoder {
    /// Loads `model.safetensors` and `tokenizer.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let model_name = dir.display().to_string();
        let weights = dir.join(MODEL_FILE);
        let tokenizer_path = dir.join(TOKENIZER_FILE);

        for artifact in [&weights, &tokenizer_path] {
            if !artifact.is_file() {
                return Err(ChatError::encoder_load(
                    &model_name,
                    format!("missing model artifact {}", artifact.display()),
                ));
            }
        }

        let model = MiniLm::load(&weights, Device::Cpu)
            .map_err(|e| ChatError::encoder_load(&model_name, format!("{e:#}")))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ChatError::encoder_load(&model_name, format!("load tokenizer: {e}")))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| ChatError::encoder_load(&model_name, format!("tokenizer truncation: {e}")))?;

        Ok(Self { model, tokenizer })
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Embedding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenize: {e}"))?;
        self.model.forward(encoding.get_ids())
    }
}

impl Encoder for MiniLmEncoder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        debug!(batch = texts.len(), "encoding batch");
        texts
            .par_iter()
            .map(|text| self.embed_text(text))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| ChatError::Encode(format!("{e:#}")))
    }
}
