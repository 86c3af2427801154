pub mod consistency;
pub mod crop;
pub mod curation;
pub mod error;
pub mod image_queue;
pub mod label_stats;
pub mod labeled_history;
pub mod save_label;

pub use error::WorkflowError;
