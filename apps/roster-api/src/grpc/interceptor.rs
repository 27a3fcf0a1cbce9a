//! Correlation and authentication for every RPC.

use std::sync::Arc;

use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::warn;

use crate::auth::JwtManager;
use crate::middleware::{CorrelationId, CORRELATION_HEADER};

/// Assigns the correlation ID and validates the bearer token.
///
/// On success the request carries [`CorrelationId`] and the token's
/// `Claims` in its extensions.
#[derive(Clone)]
pub struct AuthInterceptor {
    jwt: Arc<JwtManager>,
}

impl AuthInterceptor {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        AuthInterceptor { jwt }
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let correlation = CorrelationId::from_incoming(
            request
                .metadata()
                .get(CORRELATION_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        let header = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok());

        match self.jwt.authorize(header) {
            Ok(claims) => {
                request.extensions_mut().insert(correlation);
                request.extensions_mut().insert(claims);
                Ok(request)
            }
            Err(err) => {
                warn!(
                    correlation_id = %correlation.0,
                    reason = %err,
                    "Rejected unauthenticated call"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use tonic::Code;

    fn interceptor() -> AuthInterceptor {
        AuthInterceptor::new(Arc::new(JwtManager::new("secret")))
    }

    #[test]
    fn test_missing_token_rejected() {
        let status = interceptor().call(Request::new(())).unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), "Authorization header required");
    }

    #[test]
    fn test_non_bearer_rejected() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("authorization", "Basic Zm9vOmJhcg==".parse().unwrap());

        let status = interceptor().call(request).unwrap_err();
        assert_eq!(status.message(), "Bearer token required");
    }

    #[test]
    fn test_valid_token_sets_extensions() {
        let token = JwtManager::new("secret")
            .issue_token("svc", chrono::Duration::minutes(5))
            .unwrap();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("authorization", format!("Bearer {}", token).parse().unwrap());
        request
            .metadata_mut()
            .insert(CORRELATION_HEADER, "rpc-42".parse().unwrap());

        let request = interceptor().call(request).unwrap();
        assert_eq!(
            request.extensions().get::<CorrelationId>(),
            Some(&CorrelationId("rpc-42".to_string()))
        );
        let claims = request.extensions().get::<Claims>().unwrap();
        assert_eq!(claims.sub.as_deref(), Some("svc"));
    }
}
