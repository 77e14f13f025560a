use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::identity::Identity;

/// Routes reachable without an API key
const AUTH_WHITELIST: &[&str] = &["/health"];

/// Resolves bearer keys to identities.
pub struct KeyChecker {
    enabled: bool,
    keys: HashMap<String, Identity>,
    /// Served without authentication
    public_prefix: String,
}

impl KeyChecker {
    pub fn new(config: &SecurityConfig, public_prefix: &str) -> Self {
        let keys = config
            .api_keys
            .iter()
            .map(|ak| {
                (
                    ak.key.clone(),
                    Identity {
                        user_id: ak.user_id,
                        name: ak.name.clone(),
                        superuser: ak.superuser,
                    },
                )
            })
            .collect();
        Self {
            enabled: config.enabled,
            keys,
            public_prefix: public_prefix.to_string(),
        }
    }

    pub fn authenticate(&self, api_key: &str) -> Option<Identity> {
        self.keys.get(api_key).cloned()
    }

    fn is_public(&self, path: &str) -> bool {
        AUTH_WHITELIST.iter().any(|w| path.starts_with(w))
            || (self.public_prefix != "/" && path.starts_with(&self.public_prefix))
    }
}

/// Attach the caller's [`Identity`] to the request.
///
/// With security disabled every request acts as [`Identity::local_admin`].
pub async fn auth_middleware(
    checker: Arc<KeyChecker>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !checker.enabled {
        request.extensions_mut().insert(Identity::local_admin());
        return Ok(next.run(request).await);
    }

    if checker.is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let api_key = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let user = match api_key.and_then(|k| checker.authenticate(k)) {
        Some(u) => u,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
