pub mod api;
pub mod domain;

pub use api::{ApiClient, ApiConfig, ApiError, AuthInvalidHandler, CredentialSource};
