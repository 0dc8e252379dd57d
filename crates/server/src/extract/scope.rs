//! Request entry predicates. Every handler names exactly one of these, and the
//! [`Scope`] it yields is what the model queries filter on.

use axum::{extract::FromRequestParts, http::request::Parts};
use db::{
    Scope,
    models::user::{Identity, User},
};
use deployment::Deployment;
use services::services::demo::validate_token;
use url::form_urlencoded;

use crate::{DeploymentImpl, error::ApiError};

const SESSION_QUERY_KEY: &str = "sessionId";

/// An extractor that resolves the caller's data scope.
pub trait ScopeSource:
    FromRequestParts<DeploymentImpl, Rejection = ApiError> + Send + Sync + 'static
{
    fn scope(&self) -> &Scope;
}

/// `sessionId` from a raw query string, trimmed; `None` when absent or blank.
pub fn session_id_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == SESSION_QUERY_KEY {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
    }
    None
}

fn demo_token(parts: &Parts) -> Result<String, ApiError> {
    let token = session_id_from_query(parts.uri.query()).ok_or(ApiError::SessionRequired)?;
    Ok(validate_token(&token)?.to_string())
}

/// Authenticated member, identified by the e-mail header the auth proxy sets.
pub struct MemberScope {
    pub identity: Identity,
    scope: Scope,
}

impl FromRequestParts<DeploymentImpl> for MemberScope {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let header_name = deployment.config().read().await.auth.user_email_header.clone();
        let email = parts
            .headers
            .get(header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or(ApiError::Unauthorized)?;

        let lookup = email.as_str();
        let identity = deployment
            .db()
            .with_retry(|pool| async move { User::find_identity_by_email(pool, lookup).await })
            .await?;
        let Some(identity) = identity else {
            tracing::debug!(email = %email, "No user for authenticated e-mail");
            return Err(ApiError::Unauthorized);
        };

        Ok(Self {
            scope: Scope::member(identity.row_id),
            identity,
        })
    }
}

impl ScopeSource for MemberScope {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Demo access that fails closed: the token must name a live session, which is
/// renewed on the way through.
pub struct RequireDemoSession {
    scope: Scope,
}

impl FromRequestParts<DeploymentImpl> for RequireDemoSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let token = demo_token(parts)?;
        if !deployment.demo().is_valid(deployment.db(), &token).await? {
            return Err(ApiError::SessionInvalid);
        }
        Ok(Self {
            scope: Scope::demo(token),
        })
    }
}

impl ScopeSource for RequireDemoSession {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Demo access that starts a fresh session when the token is unknown or expired.
pub struct EnsureDemoSession {
    scope: Scope,
}

impl FromRequestParts<DeploymentImpl> for EnsureDemoSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let token = demo_token(parts)?;
        let session = deployment
            .demo()
            .get_or_create(deployment.db(), &token)
            .await?;
        Ok(Self {
            scope: Scope::demo(session.session_id),
        })
    }
}

impl ScopeSource for EnsureDemoSession {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::session_id_from_query;

    #[test]
    fn session_id_is_read_from_the_query_string() {
        assert_eq!(
            session_id_from_query(Some("projectId=1&sessionId=demo_abc")),
            Some("demo_abc".to_string())
        );
        assert_eq!(
            session_id_from_query(Some("sessionId=demo%20abc%20")),
            Some("demo abc".to_string())
        );
        assert_eq!(session_id_from_query(Some("sessionId=")), None);
        assert_eq!(session_id_from_query(Some("other=1")), None);
        assert_eq!(session_id_from_query(None), None);
    }
}
