pub mod generate;
pub mod health;
pub mod jobs;
pub mod logs;
pub mod models;
pub mod plan;

pub use generate::generate;
pub use health::health;
pub use jobs::{get_job, list_jobs};
pub use logs::logs;
pub use models::models;
pub use plan::plan;
