//! Bearer token authentication
//!
//! A [`TokenProvider`] is asked for a fresh token on every authenticated
//! request. Tokens are never cached here; providers that want caching do it
//! themselves.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;

use crate::error::{BoxError, NakadiError, Result};

/// Supplies bearer tokens on demand.
///
/// Implemented for any `Fn() -> Result<String, BoxError>` closure:
///
/// ```
/// use nakadi_client::TokenProvider;
///
/// let provider = || Ok::<_, nakadi_client::BoxError>("secret".to_string());
/// assert_eq!(provider.token().unwrap(), "secret");
/// ```
pub trait TokenProvider: Send + Sync {
    /// Obtain a token
    fn token(&self) -> std::result::Result<String, BoxError>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn token(&self) -> std::result::Result<String, BoxError> {
        self()
    }
}

/// Attach `Authorization: Bearer <token>` to a request.
///
/// Fails with [`NakadiError::NoTokenProvider`] when `provider` is `None`, and
/// with [`NakadiError::Token`] when the provider fails. In both cases the
/// request is left untouched.
pub fn authorize(provider: Option<&dyn TokenProvider>, request: &mut Request) -> Result<()> {
    let provider = provider.ok_or(NakadiError::NoTokenProvider)?;
    let token = provider.token().map_err(NakadiError::Token)?;

    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| NakadiError::InvalidToken)?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use std::io;

    fn request() -> Request {
        Request::new(Method::GET, "http://localhost:8080/".parse().unwrap())
    }

    #[test]
    fn test_fail_without_provider() {
        let mut req = request();

        let err = authorize(None, &mut req).unwrap_err();
        assert!(err.to_string().contains("no token func"));
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_fail_retrieve_token() {
        let provider = || -> std::result::Result<String, BoxError> {
            Err(io::Error::new(io::ErrorKind::Other, "token service down").into())
        };
        let mut req = request();

        let err = authorize(Some(&provider), &mut req).unwrap_err();
        assert!(matches!(err, NakadiError::Token(_)));
        assert!(err.to_string().contains("token service down"));
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_successfully_add_token() {
        let provider = || Ok::<_, BoxError>("token".to_string());
        let mut req = request();

        authorize(Some(&provider), &mut req).unwrap();
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer token");
    }

    #[test]
    fn test_reject_token_with_newline() {
        let provider = || Ok::<_, BoxError>("bad\ntoken".to_string());
        let mut req = request();

        let err = authorize(Some(&provider), &mut req).unwrap_err();
        assert!(matches!(err, NakadiError::InvalidToken));
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_provider_called_per_request() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let provider = || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(format!("token-{}", n))
        };

        let mut first = request();
        let mut second = request();
        authorize(Some(&provider), &mut first).unwrap();
        authorize(Some(&provider), &mut second).unwrap();

        assert_eq!(first.headers()[AUTHORIZATION], "Bearer token-0");
        assert_eq!(second.headers()[AUTHORIZATION], "Bearer token-1");
    }
}
