// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::provider::ProviderSettings;

/// Unique identifier for a tenant
///
/// Every log row and provider configuration is scoped to exactly one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A freshly generated API key.
///
/// The plaintext exists only in this value and is handed to the caller
/// exactly once; everything at rest stores the SHA-256 digest.
#[derive(Debug, Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Generate a new key from 32 bytes of OS randomness.
    pub fn generate() -> Self {
        use base64::Engine as _;
        use rand_core::{OsRng, RngCore};

        let mut material = [0u8; 32];
        OsRng.fill_bytes(&mut material);
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(material);
        Self(format!("grsn_{encoded}"))
    }

    /// The plaintext key. Callers must not persist this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest, the only form stored at rest.
    pub fn digest(&self) -> String {
        digest_api_key(&self.0)
    }
}

/// Digest a presented key for lookup against stored digests.
pub fn digest_api_key(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Authentication failures on API-key resolution.
///
/// Both variants map to the same outward 401 so the response never reveals
/// whether a key ever existed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid API key")]
    InvalidKey,

    #[error("tenant is disabled")]
    TenantDisabled,
}

/// Errors from slug validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug must be between {min} and {max} characters", min = SLUG_MIN_LEN, max = SLUG_MAX_LEN)]
    Length,

    #[error("slug may only contain lowercase letters, digits and hyphens")]
    Charset,

    #[error("slug may not start or end with a hyphen")]
    Hyphen,
}

const SLUG_MIN_LEN: usize = 3;
const SLUG_MAX_LEN: usize = 64;

/// Validate a URL-safe tenant slug.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.len() < SLUG_MIN_LEN || slug.len() > SLUG_MAX_LEN {
        return Err(SlugError::Length);
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(SlugError::Charset);
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(SlugError::Hyphen);
    }
    Ok(())
}

/// Tenant aggregate: an organization account identified by an API key.
///
/// `api_key_digest` uniquely resolves to exactly one tenant. Inactive
/// tenants fail authentication on the next lookup; in-flight requests that
/// already resolved are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub api_key_digest: String,
    pub provider_configs: HashMap<String, ProviderSettings>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(
        name: String,
        slug: String,
        provider_configs: HashMap<String, ProviderSettings>,
        api_key_digest: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name,
            slug,
            api_key_digest,
            provider_configs,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Swap in a new key digest. The repository persists this as a single
    /// row update, so there is no window where both keys resolve.
    pub fn rotate_key(&mut self, new_digest: String) {
        self.api_key_digest = new_digest;
        self.updated_at = Utc::now();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }

    pub fn set_provider_configs(&mut self, configs: HashMap<String, ProviderSettings>) {
        self.provider_configs = configs;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_and_prefixed() {
        let a = ApiKey::generate();
        let b = ApiKey::generate();
        assert!(a.expose().starts_with("grsn_"));
        assert_ne!(a.expose(), b.expose());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn digest_matches_presented_key() {
        let key = ApiKey::generate();
        assert_eq!(key.digest(), digest_api_key(key.expose()));
    }

    #[test]
    fn slug_validation() {
        assert!(validate_slug("acme-corp").is_ok());
        assert!(validate_slug("a1-b2-c3").is_ok());
        assert_eq!(validate_slug("ab"), Err(SlugError::Length));
        assert_eq!(validate_slug("Acme"), Err(SlugError::Charset));
        assert_eq!(validate_slug("acme corp"), Err(SlugError::Charset));
        assert_eq!(validate_slug("-acme"), Err(SlugError::Hyphen));
        assert_eq!(validate_slug("acme-"), Err(SlugError::Hyphen));
    }

    #[test]
    fn rotate_replaces_digest() {
        let key = ApiKey::generate();
        let mut tenant = Tenant::new(
            "Acme".into(),
            "acme".into(),
            HashMap::new(),
            key.digest(),
        );
        let next = ApiKey::generate();
        tenant.rotate_key(next.digest());
        assert_eq!(tenant.api_key_digest, next.digest());
        assert_ne!(tenant.api_key_digest, key.digest());
    }
}
