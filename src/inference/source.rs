use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};

pub const CONFIG_FILENAME: &str = "config.json";
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";
pub const WEIGHTS_FILENAME: &str = "model.safetensors";

/// Somewhere checkpoint files can be materialized on local disk from.
pub trait CheckpointSource {
    fn fetch(&self, filename: &str) -> Result<PathBuf>;
}

impl CheckpointSource for ApiRepo {
    fn fetch(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.get(filename)?)
    }
}

/// A checkpoint already laid out in a directory.
#[derive(Debug, Clone)]
pub struct LocalCheckpoint {
    dir: PathBuf,
}

impl LocalCheckpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalCheckpoint { dir: dir.into() }
    }
}

impl CheckpointSource for LocalCheckpoint {
    fn fetch(&self, filename: &str) -> Result<PathBuf> {
        let path = self.dir.join(filename);
        if !path.is_file() {
            bail!("{} not found in {}", filename, self.dir.display());
        }
        Ok(path)
    }
}

/// Resolves an identifier the way `from_pretrained` does: a local directory wins, anything
/// else is looked up on the hub.
pub fn resolve(checkpoint: &str, revision: &str) -> Result<Box<dyn CheckpointSource>> {
    let dir = Path::new(checkpoint);
    if dir.is_dir() {
        return Ok(Box::new(LocalCheckpoint::new(dir)));
    }

    let api = Api::new()?;
    Ok(Box::new(api.repo(Repo::with_revision(
        checkpoint.to_string(),
        RepoType::Model,
        revision.to_string(),
    ))))
}
