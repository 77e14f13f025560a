pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod media;
pub mod model;
pub mod rehome;
pub mod service;
pub mod store;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
pub use identity::Identity;
pub use service::{BackupService, RequestOrigin};
