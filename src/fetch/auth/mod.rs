//! [`HttpClient`](super::HttpClient) wrappers that attach feed credentials.

mod api_key;
mod basic_auth;

pub use api_key::ApiKey;
pub use basic_auth::BasicAuth;
