use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModelBase {
    /// The name of the model
    pub name: String,

    /// The task the model head is trained for
    pub task: ModelTask,

    /// The hub repository id or local directory the checkpoint was read from
    pub repo_id: String,

    /// The revision of the repository, `None` for local checkpoints
    pub repo_revision: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTask {
    FillMask,
}

impl ModelBase {
    pub fn masked_lm(repo_id: &str, repo_revision: Option<&str>) -> Self {
        let name = repo_id
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(repo_id)
            .to_string();
        ModelBase {
            name,
            task: ModelTask::FillMask,
            repo_id: repo_id.to_string(),
            repo_revision: repo_revision.map(str::to_string),
        }
    }
}
