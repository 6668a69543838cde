//! Route-level access control
//!
//! Each protected route group is wrapped in [`enforce`] with an
//! [`AccessPolicy`]. The check runs before any extractor or handler, so a
//! refused request never touches the body or the database.

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::AppError,
    models::user::{Permission, UserClaims},
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Any logged-in user; anonymous visitors go to the login page
    Authenticated,
    /// Logged-in user holding the permission; anonymous visitors go to the login page
    Permission(Permission),
    /// Holder of the permission; anyone else, anonymous included, gets 403
    StrictPermission(Permission),
    /// Staff or superuser; anonymous visitors go to the login page
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
    RedirectToLogin,
}

pub fn decide(policy: AccessPolicy, user: Option<&UserClaims>) -> AccessDecision {
    let Some(user) = user else {
        return match policy {
            AccessPolicy::StrictPermission(_) => AccessDecision::Deny,
            _ => AccessDecision::RedirectToLogin,
        };
    };

    let allowed = match policy {
        AccessPolicy::Authenticated => true,
        AccessPolicy::Permission(p) | AccessPolicy::StrictPermission(p) => user.has_perm(p),
        AccessPolicy::Staff => user.is_staff(),
    };

    if allowed {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny
    }
}

/// Middleware state: the policy guarding one route group
#[derive(Clone)]
pub struct Guard {
    pub state: AppState,
    pub policy: AccessPolicy,
}

impl Guard {
    pub fn new(state: &AppState, policy: AccessPolicy) -> Self {
        Self {
            state: state.clone(),
            policy,
        }
    }
}

pub async fn enforce(State(guard): State<Guard>, mut request: Request, next: Next) -> Response {
    let claims = claims_from_headers(request.headers(), &guard.state);

    match decide(guard.policy, claims.as_ref()) {
        AccessDecision::Allow => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        AccessDecision::Deny => {
            tracing::debug!(policy = ?guard.policy, path = %request.uri().path(), "Access denied");
            AppError::Authorization("You do not have permission to access this page".to_string())
                .into_response()
        }
        AccessDecision::RedirectToLogin => {
            let uri = request
                .extensions()
                .get::<OriginalUri>()
                .map(|original| original.0.clone())
                .unwrap_or_else(|| request.uri().clone());
            let next_path = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| uri.path());
            AppError::login_required(&guard.state.config.auth.login_url, next_path).into_response()
        }
    }
}

/// Claims from the auth cookie, else from a bearer token.
/// Missing, expired or forged tokens leave the request anonymous.
pub fn claims_from_headers(headers: &HeaderMap, state: &AppState) -> Option<UserClaims> {
    let jar = CookieJar::from_headers(headers);
    let cookie_token = jar
        .get(&state.config.auth.cookie_name)
        .map(|c| c.value().to_string());

    let token = cookie_token.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })?;

    state.services.auth.claims_from_token(&token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(permissions: &[Permission], is_staff: bool) -> UserClaims {
        UserClaims {
            sub: "reader".to_string(),
            user_id: 7,
            is_staff,
            is_superuser: false,
            permissions: permissions.iter().map(|p| p.codename().to_string()).collect(),
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        }
    }

    #[test]
    fn anonymous_is_sent_to_login() {
        assert_eq!(
            decide(AccessPolicy::Authenticated, None),
            AccessDecision::RedirectToLogin
        );
        assert_eq!(
            decide(AccessPolicy::Permission(Permission::AddAuthor), None),
            AccessDecision::RedirectToLogin
        );
        assert_eq!(decide(AccessPolicy::Staff, None), AccessDecision::RedirectToLogin);
    }

    #[test]
    fn strict_permission_denies_anonymous() {
        assert_eq!(
            decide(AccessPolicy::StrictPermission(Permission::CanMarkReturned), None),
            AccessDecision::Deny
        );
    }

    #[test]
    fn any_user_passes_authenticated() {
        let reader = user(&[], false);
        assert_eq!(
            decide(AccessPolicy::Authenticated, Some(&reader)),
            AccessDecision::Allow
        );
    }

    #[test]
    fn permission_must_be_held() {
        let reader = user(&[], false);
        let librarian = user(&[Permission::CanMarkReturned, Permission::AddAuthor], false);

        for policy in [
            AccessPolicy::Permission(Permission::AddAuthor),
            AccessPolicy::StrictPermission(Permission::CanMarkReturned),
        ] {
            assert_eq!(decide(policy, Some(&reader)), AccessDecision::Deny);
            assert_eq!(decide(policy, Some(&librarian)), AccessDecision::Allow);
        }
        assert_eq!(
            decide(AccessPolicy::Permission(Permission::DeleteBook), Some(&librarian)),
            AccessDecision::Deny
        );
    }

    #[test]
    fn staff_flag_or_superuser_opens_admin() {
        let reader = user(&[Permission::ChangeBook], false);
        let staff = user(&[], true);
        let mut root = user(&[], false);
        root.is_superuser = true;

        assert_eq!(decide(AccessPolicy::Staff, Some(&reader)), AccessDecision::Deny);
        assert_eq!(decide(AccessPolicy::Staff, Some(&staff)), AccessDecision::Allow);
        assert_eq!(decide(AccessPolicy::Staff, Some(&root)), AccessDecision::Allow);
    }
}
