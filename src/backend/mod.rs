//! # Backend-as-a-Service
//!
//! Catalog persistence, image storage and admin authentication against a
//! Supabase project:
//!
//! - `GET/POST/DELETE {url}/rest/v1/{table}`: catalog rows
//! - `POST {url}/storage/v1/object/{bucket}/{name}`: image upload
//! - `{url}/auth/v1/*`: password login, signup, logout, user lookup
//!
//! Row and bucket policy rejections surface as
//! [`ConsultError::Backend`](crate::error::ConsultError::Backend) with the
//! server's text verbatim plus a remediation hint.

use async_trait::async_trait;

use crate::catalog::{CatalogItem, CatalogKind};
use crate::error::ConsultResult;

pub mod auth;
pub mod client;

pub use auth::{AdminGate, AuthService, AuthSession, AuthUser, SessionStore, SignupOutcome};
pub use client::SupabaseClient;

/// Remote store behind the catalog.
///
/// Mutations take the admin's access token.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn fetch_all(&self, kind: CatalogKind) -> ConsultResult<Vec<CatalogItem>>;

    async fn upsert(&self, item: &CatalogItem, token: &str) -> ConsultResult<()>;

    async fn delete(&self, kind: CatalogKind, id: &str, token: &str) -> ConsultResult<()>;

    /// Store an object and return its public URL.
    async fn upload_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: &str,
    ) -> ConsultResult<String>;
}
