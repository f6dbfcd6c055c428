use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use serde_json::{json, Map, Value};

pub const VOCAB: [&str; 20] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "the", "capital", "of", "france", "is",
    "paris", ".", "london", "city", "a", "dog", "cat", "big", "play", "##ing",
];
pub const HIDDEN: usize = 8;
pub const INTERMEDIATE: usize = 16;
pub const MAX_POSITIONS: usize = 16;

pub fn token_id(token: &str) -> usize {
    VOCAB.iter().position(|t| *t == token).unwrap()
}

/// Writes a one-layer BERT checkpoint whose MLM bias strongly favours `favourite`.
pub fn write_tiny_checkpoint(dir: &Path, favourite: &str) -> Result<()> {
    write_tiny_checkpoint_with(dir, favourite, |name| name.to_string())
}

/// Same checkpoint, with every tensor stored under `rename(name)`.
pub fn write_tiny_checkpoint_with(
    dir: &Path,
    favourite: &str,
    rename: impl Fn(&str) -> String,
) -> Result<()> {
    std::fs::write(dir.join("config.json"), config_json().to_string())?;
    std::fs::write(dir.join("tokenizer.json"), tokenizer_json().to_string())?;
    let tensors: HashMap<String, Tensor> = weights(favourite)?
        .into_iter()
        .map(|(name, tensor)| (rename(&name), tensor))
        .collect();
    candle_core::safetensors::save(&tensors, dir.join("model.safetensors"))?;
    Ok(())
}

/// TF-converted checkpoints store LayerNorm parameters as gamma/beta.
pub fn gamma_beta_names(name: &str) -> String {
    name.replace("LayerNorm.weight", "LayerNorm.gamma")
        .replace("LayerNorm.bias", "LayerNorm.beta")
}

/// Checkpoints saved from a bare `BertModel` carry no `bert.` prefix.
pub fn without_bert_prefix(name: &str) -> String {
    name.strip_prefix("bert.").unwrap_or(name).to_string()
}

fn config_json() -> Value {
    json!({
        "architectures": ["BertForMaskedLM"],
        "model_type": "bert",
        "vocab_size": VOCAB.len(),
        "hidden_size": HIDDEN,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": INTERMEDIATE,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "attention_probs_dropout_prob": 0.1,
        "max_position_embeddings": MAX_POSITIONS,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "use_cache": true,
        "classifier_dropout": null
    })
}

fn tokenizer_json() -> Value {
    let vocab: Map<String, Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), json!(id)))
        .collect();
    let added_tokens: Vec<Value> = VOCAB[..5]
        .iter()
        .enumerate()
        .map(|(id, token)| {
            json!({
                "id": id,
                "content": token,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", token_id("[SEP]")],
            "cls": ["[CLS]", token_id("[CLS]")]
        },
        "decoder": { "type": "WordPiece", "prefix": "##", "cleanup": true },
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    })
}

fn weights(favourite: &str) -> Result<HashMap<String, Tensor>> {
    let device = Device::Cpu;
    let mut tensors = HashMap::new();
    let mut random = |name: &str, shape: &[usize]| -> Result<()> {
        let tensor = Tensor::randn(0f32, 0.02, shape.to_vec(), &device)?;
        tensors.insert(name.to_string(), tensor);
        Ok(())
    };

    random("bert.embeddings.word_embeddings.weight", &[VOCAB.len(), HIDDEN])?;
    random("bert.embeddings.position_embeddings.weight", &[MAX_POSITIONS, HIDDEN])?;
    random("bert.embeddings.token_type_embeddings.weight", &[2, HIDDEN])?;
    let layer = "bert.encoder.layer.0";
    for proj in ["query", "key", "value"] {
        random(&format!("{layer}.attention.self.{proj}.weight"), &[HIDDEN, HIDDEN])?;
        random(&format!("{layer}.attention.self.{proj}.bias"), &[HIDDEN])?;
    }
    random(&format!("{layer}.attention.output.dense.weight"), &[HIDDEN, HIDDEN])?;
    random(&format!("{layer}.attention.output.dense.bias"), &[HIDDEN])?;
    random(&format!("{layer}.intermediate.dense.weight"), &[INTERMEDIATE, HIDDEN])?;
    random(&format!("{layer}.intermediate.dense.bias"), &[INTERMEDIATE])?;
    random(&format!("{layer}.output.dense.weight"), &[HIDDEN, INTERMEDIATE])?;
    random(&format!("{layer}.output.dense.bias"), &[HIDDEN])?;
    random("cls.predictions.transform.dense.weight", &[HIDDEN, HIDDEN])?;
    random("cls.predictions.transform.dense.bias", &[HIDDEN])?;

    let layer_norms = [
        "bert.embeddings.LayerNorm".to_string(),
        format!("{layer}.attention.output.LayerNorm"),
        format!("{layer}.output.LayerNorm"),
        "cls.predictions.transform.LayerNorm".to_string(),
    ];
    for prefix in layer_norms {
        tensors.insert(
            format!("{prefix}.weight"),
            Tensor::ones(HIDDEN, DType::F32, &device)?,
        );
        tensors.insert(
            format!("{prefix}.bias"),
            Tensor::zeros(HIDDEN, DType::F32, &device)?,
        );
    }

    // No decoder weight: the head must fall back to the tied word embeddings.
    let mut bias = vec![0f32; VOCAB.len()];
    bias[token_id(favourite)] = 20.0;
    tensors.insert(
        "cls.predictions.bias".to_string(),
        Tensor::new(bias.as_slice(), &device)?,
    );

    Ok(tensors)
}
