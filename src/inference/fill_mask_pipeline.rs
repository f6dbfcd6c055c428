use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::bail_harness;
use crate::error::{ErrorKind, HarnessResult};
use crate::inference::models::bert::MaskedLanguageModel;
use crate::inference::source::{
    CheckpointSource, CONFIG_FILENAME, TOKENIZER_FILENAME, WEIGHTS_FILENAME,
};

pub const MASK_TOKEN: &str = "[MASK]";
const CONTINUATION_PREFIX: &str = "##";

/// A candidate for the masked position.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MaskPrediction {
    pub token: String,
    pub token_id: u32,
    pub score: f32,
    /// The input text with the mask replaced by `token`
    pub sequence: String,
}

// Taken from
// https://github.com/huggingface/candle/blob/main/candle-examples/examples/bert/main.rs
pub struct FillMaskPipeline {
    pub model: MaskedLanguageModel,
    pub device: Device,
    pub tokenizer: Tokenizer,
    mask_token_id: u32,
}

impl FillMaskPipeline {
    #[tracing::instrument(level = "info", skip(source))]
    pub fn with_safetensors(source: &dyn CheckpointSource) -> Result<FillMaskPipeline> {
        let config_file = source.fetch(CONFIG_FILENAME)?;
        let tokenizer_file = source.fetch(TOKENIZER_FILENAME)?;
        let weights_file = source.fetch(WEIGHTS_FILENAME)?;

        let device = Device::Cpu;
        let config_json = std::fs::read_to_string(&config_file)
            .with_context(|| format!("Cannot read {}", config_file.display()))?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_file], DType::F32, &device)? };
        let model = MaskedLanguageModel::load(vb, &config_json)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_file).map_err(|e| {
            anyhow!("Cannot load tokenizer {}: {e}", tokenizer_file.display())
        })?;
        let mask_token_id = tokenizer
            .token_to_id(MASK_TOKEN)
            .ok_or_else(|| anyhow!("Tokenizer has no {MASK_TOKEN} token"))?;

        tracing::debug!(
            vocab_size = model.config.vocab_size,
            hidden_size = model.config.hidden_size,
            "Loaded masked language model"
        );

        Ok(FillMaskPipeline {
            model,
            device,
            tokenizer,
            mask_token_id,
        })
    }

    /// Ranks the `top_k` most likely tokens for the single mask in `text`.
    #[tracing::instrument(level = "debug", skip(self, text))]
    pub fn fill(&self, text: &str, top_k: usize) -> HarnessResult<(Vec<MaskPrediction>, f64)> {
        if text.trim().is_empty() {
            bail_harness!(ErrorKind::MalformedInput, "Input is empty");
        }
        if top_k == 0 {
            bail_harness!(ErrorKind::MalformedInput, "top_k must be at least 1");
        }
        let mask_count = text.matches(MASK_TOKEN).count();
        if mask_count != 1 {
            bail_harness!(
                ErrorKind::MalformedInput,
                "Expected exactly one {} token in the input, found {}",
                MASK_TOKEN,
                mask_count
            );
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Cannot tokenize input: {e}"))?;
        let ids = encoding.get_ids();
        let max_len = self.model.config.max_position_embeddings;
        if ids.len() > max_len {
            bail_harness!(
                ErrorKind::MalformedInput,
                "Input is {} tokens long, the model accepts at most {}",
                ids.len(),
                max_len
            );
        }
        let Some(mask_index) = ids.iter().position(|&id| id == self.mask_token_id) else {
            bail_harness!(
                ErrorKind::MalformedInput,
                "The {} token did not survive tokenization",
                MASK_TOKEN
            );
        };

        let start = std::time::Instant::now();
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let logits = self
            .model
            .logits_at(&input_ids, &attention_mask, mask_index)?;
        let probs = softmax(&logits, D::Minus1)?.to_vec1::<f32>()?;

        let mut ranked: Vec<usize> = (0..probs.len()).collect();
        ranked.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));

        let mut predictions = Vec::with_capacity(top_k.min(ranked.len()));
        for idx in ranked {
            if predictions.len() == top_k {
                break;
            }
            let token_id = idx as u32;
            let token = self
                .tokenizer
                .decode(&[token_id], true)
                .map_err(|e| anyhow!("Cannot decode token {token_id}: {e}"))?
                .trim()
                .to_string();
            // Special tokens decode to nothing.
            if token.is_empty() {
                continue;
            }
            predictions.push(MaskPrediction {
                sequence: fill_sequence(text, &token),
                token,
                token_id,
                score: probs[idx],
            });
        }

        Ok((predictions, start.elapsed().as_secs_f64()))
    }
}

/// Puts `token` in place of the mask, a WordPiece continuation is glued to the preceding word.
fn fill_sequence(text: &str, token: &str) -> String {
    match (token.strip_prefix(CONTINUATION_PREFIX), text.split_once(MASK_TOKEN)) {
        (Some(piece), Some((head, tail))) => format!("{}{piece}{tail}", head.trim_end()),
        _ => text.replacen(MASK_TOKEN, token, 1),
    }
}
