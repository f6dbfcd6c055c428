use anyhow::Result;
use candle_core::{IndexOp, Tensor};
use candle_nn::{LayerNorm, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use serde::Deserialize;

// Taken from
// https://github.com/huggingface/candle/blob/main/candle-transformers/src/models/bert.rs
// https://github.com/huggingface/transformers/blob/main/src/transformers/models/bert/modeling_bert.py

/// The head dimensions of a BERT `config.json`, `candle`'s config keeps these private.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct HeadConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub hidden_act: HeadActivation,
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

/// Activation of the prediction head transform, named as in `config.json`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeadActivation {
    #[default]
    Gelu,
    #[serde(alias = "gelu_new", alias = "gelu_pytorch_tanh", alias = "gelu_fast")]
    GeluApproximate,
    Relu,
}

impl HeadActivation {
    pub fn apply(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            HeadActivation::Gelu => xs.gelu_erf(),
            HeadActivation::GeluApproximate => xs.gelu(),
            HeadActivation::Relu => xs.relu(),
        }
    }
}

/// Checkpoints converted from TF name the LayerNorm parameters gamma/beta.
fn uses_legacy_layer_norm_names(vb: &VarBuilder) -> bool {
    vb.contains_tensor("bert.embeddings.LayerNorm.gamma")
        || vb.contains_tensor("embeddings.LayerNorm.gamma")
}

fn legacy_layer_norm_name(name: &str) -> String {
    if let Some(prefix) = name.strip_suffix("LayerNorm.weight") {
        format!("{prefix}LayerNorm.gamma")
    } else if let Some(prefix) = name.strip_suffix("LayerNorm.bias") {
        format!("{prefix}LayerNorm.beta")
    } else {
        name.to_string()
    }
}

struct PredictionHeadTransform {
    dense: Linear,
    activation: HeadActivation,
    layer_norm: LayerNorm,
}

impl PredictionHeadTransform {
    fn load(vb: VarBuilder, config: &HeadConfig) -> candle_core::Result<Self> {
        let dense = candle_nn::linear(config.hidden_size, config.hidden_size, vb.pp("dense"))?;
        let layer_norm = candle_nn::layer_norm(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("LayerNorm"),
        )?;
        Ok(Self {
            dense,
            activation: config.hidden_act,
            layer_norm,
        })
    }
}

impl Module for PredictionHeadTransform {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.activation.apply(&self.dense.forward(xs)?)?;
        self.layer_norm.forward(&xs)
    }
}

struct LmPredictionHead {
    transform: PredictionHeadTransform,
    decoder: Linear,
}

impl LmPredictionHead {
    /// `vb` points at the checkpoint root, the head lives under `cls.predictions`.
    fn load(vb: &VarBuilder, config: &HeadConfig) -> candle_core::Result<Self> {
        let head = vb.pp("cls.predictions");
        let transform = PredictionHeadTransform::load(head.pp("transform"), config)?;

        let shape = (config.vocab_size, config.hidden_size);
        // The decoder is tied to the word embeddings and often not serialized.
        let weight = head
            .get(shape, "decoder.weight")
            .or_else(|_| vb.get(shape, "bert.embeddings.word_embeddings.weight"))
            .or_else(|_| vb.get(shape, "embeddings.word_embeddings.weight"))?;
        let bias = head
            .get(config.vocab_size, "bias")
            .or_else(|_| head.get(config.vocab_size, "decoder.bias"))?;

        Ok(Self {
            transform,
            decoder: Linear::new(weight, Some(bias)),
        })
    }
}

impl Module for LmPredictionHead {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.decoder.forward(&self.transform.forward(xs)?)
    }
}

/// BERT encoder with its masked language modeling head.
pub struct MaskedLanguageModel {
    bert: BertModel,
    head: LmPredictionHead,
    pub config: HeadConfig,
}

impl MaskedLanguageModel {
    pub fn load(vb: VarBuilder, config_json: &str) -> Result<Self> {
        let bert_config: Config = serde_json::from_str(config_json)?;
        let config: HeadConfig = serde_json::from_str(config_json)?;
        let vb = if uses_legacy_layer_norm_names(&vb) {
            vb.rename_f(legacy_layer_norm_name)
        } else {
            vb
        };

        let bert = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            BertModel::load(vb.pp("bert"), &bert_config)?
        } else {
            BertModel::load(vb.clone(), &bert_config)?
        };
        let head = LmPredictionHead::load(&vb, &config)?;

        Ok(Self { bert, head, config })
    }

    /// Vocabulary logits at `position` for a single `(1, seq_len)` sequence.
    pub fn logits_at(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        position: usize,
    ) -> Result<Tensor> {
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .bert
            .forward(input_ids, &token_type_ids, Some(attention_mask))?;
        let hidden = hidden.i((0, position))?.unsqueeze(0)?;
        let logits = self.head.forward(&hidden)?.squeeze(0)?;
        Ok(logits)
    }
}
