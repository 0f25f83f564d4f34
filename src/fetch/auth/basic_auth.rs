use crate::error::FetchError;
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::{AUTHORIZATION, HeaderValue};

/// An [`HttpClient`] wrapper that sends HTTP Basic credentials on every request.
pub struct BasicAuth<C> {
    inner: C,
    header: HeaderValue,
}

impl<C> BasicAuth<C> {
    pub fn new(inner: C, username: &str, password: &str) -> Result<Self, FetchError> {
        let encoded = BASE64.encode(format!("{username}:{password}"));
        let mut header = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
        header.set_sensitive(true);
        Ok(Self { inner, header })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for BasicAuth<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_credentials() {
        // RFC 7617 example
        let auth = BasicAuth::new((), "Aladdin", "open sesame").unwrap();
        assert_eq!(auth.header, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(auth.header.is_sensitive());
    }
}
