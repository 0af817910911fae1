pub mod context;
pub mod errors;
pub mod knowledge;
pub mod models;
pub mod orchestrator;
pub mod prompt_template;
pub mod providers;
pub mod tools;
