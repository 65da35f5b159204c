pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CloudinaryHost, HttpMailer, LocalStorage, MapboxRouting, MemoryStorage};
pub use config::AppConfig;
pub use http::{router, AppState, Ports};
pub use utils::error::{AppError, Result};
