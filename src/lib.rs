pub mod completion;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod server;

pub use config::AppConfig;
pub use normalize::normalize;
pub use server::{build_router, run_server, AppState};
