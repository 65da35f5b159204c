pub mod auth;
pub mod contact;
pub mod db;
pub mod drafts;
pub mod kyc;
pub mod label;
pub mod map;
pub mod shipments;
pub mod tracking;
pub mod upload;

pub use crate::domain::ports::{ImageHost, Mailer, RoutingService, Storage};
pub use crate::utils::error::Result;
