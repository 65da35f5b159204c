// Adapters layer: concrete implementations of the domain ports.

pub mod cloudinary;
pub mod mailer;
pub mod mapbox;
pub mod storage;

pub use cloudinary::CloudinaryHost;
pub use mailer::HttpMailer;
pub use mapbox::MapboxRouting;
pub use storage::{LocalStorage, MemoryStorage};
