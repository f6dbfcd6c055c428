pub mod fill_mask_pipeline;
pub mod models;
pub mod source;
pub mod task;
