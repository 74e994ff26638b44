// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Request authentication extractors.
//
// Tenant endpoints authenticate with `X-API-Key`, resolved through the
// tenant store. Admin endpoints are guarded by `X-Admin-Token` against the
// configured token; an unconfigured gateway keeps the admin surface closed.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::application::tenants::TenantError;
use crate::domain::audit::RequestContext;
use crate::domain::tenant::Tenant;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;

const API_KEY_HEADER: &str = "x-api-key";
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
const USER_ID_HEADER: &str = "x-user-id";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// The tenant resolved from the `X-API-Key` header.
pub struct AuthenticatedTenant(pub Tenant);

impl FromRequestParts<Arc<AppState>> for AuthenticatedTenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = header_str(parts, API_KEY_HEADER).ok_or_else(ApiError::unauthorized)?;

        let tenant = state.tenants.authenticate(key).await.map_err(|err| match err {
            TenantError::Auth(_) => ApiError::unauthorized(),
            other => ApiError::from(other),
        })?;

        Ok(Self(tenant))
    }
}

/// Proof that the request carried the configured admin token.
pub struct AdminGuard;

impl FromRequestParts<Arc<AppState>> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let configured = match state.admin_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(ApiError::forbidden(
                    "admin surface is disabled: no admin token configured",
                ))
            }
        };

        let presented = header_str(parts, ADMIN_TOKEN_HEADER).ok_or_else(ApiError::unauthorized)?;
        if !bool::from(presented.as_bytes().ct_eq(configured.as_bytes())) {
            return Err(ApiError::unauthorized());
        }
        Ok(Self)
    }
}

/// Request-scoped audit context (acting user, source address, agent).
pub struct RequestMeta(pub RequestContext);

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = header_str(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());
        let user_agent = header_str(parts, "user-agent").map(str::to_string);
        let user_id = header_str(parts, USER_ID_HEADER).map(str::to_string);

        Ok(Self(RequestContext {
            user_id,
            ip_address,
            user_agent,
        }))
    }
}
