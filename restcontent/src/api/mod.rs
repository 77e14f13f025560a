pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use auth::KeyChecker;
pub use error::ApiError;
pub use server::ApiServer;
