pub mod app;
pub mod clock;
pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod query;
pub mod records;
pub mod refresh;
pub mod session;
pub mod state;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::{DocumentStore, LocalDocumentStore};
