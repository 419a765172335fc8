//! REST client for the Supabase project (PostgREST + Storage + GoTrue).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::CatalogBackend;
use crate::catalog::{CatalogEntity, CatalogItem, CatalogKind, Clinic, Doctor, Product};
use crate::config::ConsultConfig;
use crate::error::{ConsultError, ConsultResult};

const SERVICE: &str = "supabase";

/// HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseClient {
    /// Build from configuration. Fails when the backend is not configured.
    pub fn from_config(config: &ConsultConfig) -> ConsultResult<Self> {
        let (Some(url), Some(key)) = (&config.supabase_url, &config.supabase_key) else {
            return Err(ConsultError::config(
                "supabase_url",
                config.supabase_url.clone().unwrap_or_default(),
                "backend URL and key are required",
            ));
        };
        let client = reqwest::Client::builder()
            .timeout(config.ai_timeout())
            .build()
            .map_err(ConsultError::from)?;
        Ok(Self::with_client(client, url, key, &config.storage_bucket))
    }

    /// Build reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str, bucket: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Request with the project key and a bearer token (the user's, or the
    /// project key for anonymous reads).
    pub(crate) fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(token.unwrap_or(&self.api_key))
    }

    fn table_path(kind: CatalogKind) -> String {
        format!("/rest/v1/{}", kind.table())
    }

    /// Object path with each segment percent-encoded.
    fn object_path(&self, name: &str) -> String {
        let encoded: Vec<String> = name
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!("{}/{}", urlencoding::encode(&self.bucket), encoded.join("/"))
    }

    /// Public URL of an object in the bucket.
    pub fn public_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}", self.base_url, self.object_path(name))
    }

    /// Send and fail on non-2xx, classifying the failure.
    pub(crate) async fn send(
        &self,
        operation: &str,
        target: &str,
        builder: RequestBuilder,
    ) -> ConsultResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| ConsultError::from(e).with_operation(operation.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let error = classify_failure(operation, target, status, &body);
        warn!(operation, target, status = status.as_u16(), category = error.category(), "backend call failed");
        Err(error)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        target: &str,
        builder: RequestBuilder,
    ) -> ConsultResult<T> {
        let response = self.send(operation, target, builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ConsultError::from(e).with_operation(operation.to_string()))
    }

    async fn fetch_rows<T: CatalogEntity>(&self) -> ConsultResult<Vec<CatalogItem>> {
        let kind = T::KIND;
        let builder = self
            .request(Method::GET, &Self::table_path(kind), None)
            .query(&[("select", "*")]);
        let rows: Vec<T> = self.send_json("fetch catalog", kind.table(), builder).await?;
        debug!(collection = %kind, rows = rows.len(), "catalog fetched");
        Ok(rows.into_iter().map(CatalogEntity::into_item).collect())
    }
}

#[async_trait]
impl CatalogBackend for SupabaseClient {
    async fn fetch_all(&self, kind: CatalogKind) -> ConsultResult<Vec<CatalogItem>> {
        match kind {
            CatalogKind::Products => self.fetch_rows::<Product>().await,
            CatalogKind::Clinics => self.fetch_rows::<Clinic>().await,
            CatalogKind::Doctors => self.fetch_rows::<Doctor>().await,
        }
    }

    async fn upsert(&self, item: &CatalogItem, token: &str) -> ConsultResult<()> {
        let kind = item.kind();
        let builder = self
            .request(Method::POST, &Self::table_path(kind), Some(token))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&item.to_json()?);
        self.send("upsert catalog row", kind.table(), builder).await?;
        info!(collection = %kind, id = item.id(), "catalog row upserted");
        Ok(())
    }

    async fn delete(&self, kind: CatalogKind, id: &str, token: &str) -> ConsultResult<()> {
        let filter = format!("eq.{}", id);
        let builder = self
            .request(Method::DELETE, &Self::table_path(kind), Some(token))
            .query(&[("id", filter.as_str())]);
        self.send("delete catalog row", kind.table(), builder).await?;
        info!(collection = %kind, id, "catalog row deleted");
        Ok(())
    }

    async fn upload_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: &str,
    ) -> ConsultResult<String> {
        let size = bytes.len();
        let builder = self
            .request(
                Method::POST,
                &format!("/storage/v1/object/{}", self.object_path(name)),
                Some(token),
            )
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.send("upload image", &self.bucket, builder).await?;
        let url = self.public_url(name);
        info!(bucket = %self.bucket, name, size, "image uploaded");
        Ok(url)
    }
}

/// Text of a Supabase error body (`message`, `error_description`, `msg` or `error`).
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

fn is_policy_rejection(status: StatusCode, message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || lower.contains("row-level security")
        || lower.contains("policy")
        || lower.contains("unauthorized")
}

/// Map a non-2xx reply to the error taxonomy. `target` is the table or bucket.
pub fn classify_failure(operation: &str, target: &str, status: StatusCode, body: &str) -> ConsultError {
    let message = error_message(body);
    if is_policy_rejection(status, &message) {
        let hint = if operation == "upload image" {
            format!(
                "cho phép INSERT trên storage.objects cho người dùng đã đăng nhập với bucket '{}', và đặt bucket ở chế độ public",
                target
            )
        } else {
            format!("kiểm tra chính sách RLS của bảng '{}' và đăng nhập lại", target)
        };
        return ConsultError::backend(operation, Some(status.as_u16()), message).with_recovery_suggestion(hint);
    }
    ConsultError::api(SERVICE, status.as_u16(), message).with_operation(operation.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::with_client(reqwest::Client::new(), "https://demo.supabase.co/", "anon", "resources")
    }

    #[test]
    fn public_url_encodes_segments() {
        assert_eq!(
            client().public_url("products/ảnh 1.png"),
            "https://demo.supabase.co/storage/v1/object/public/resources/products/%E1%BA%A3nh%201.png"
        );
    }

    #[test]
    fn rls_message_becomes_backend_error_with_bucket_hint() {
        let body = r#"{"statusCode":"403","error":"Unauthorized","message":"new row violates row-level security policy"}"#;
        let err = classify_failure("upload image", "resources", StatusCode::BAD_REQUEST, body);
        assert_eq!(err.category(), "backend");
        let shown = err.user_message();
        assert!(shown.starts_with("new row violates row-level security policy"));
        assert!(shown.contains("'resources'"));
    }

    #[test]
    fn forbidden_table_write_names_table() {
        let err = classify_failure("upsert catalog row", "clinics", StatusCode::FORBIDDEN, "{}");
        assert!(err.user_message().contains("'clinics'"));
    }

    #[test]
    fn other_statuses_are_api_errors() {
        let err = classify_failure("fetch catalog", "products", StatusCode::NOT_FOUND, r#"{"message":"relation does not exist"}"#);
        match err {
            ConsultError::Api { status, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(message, "relation does not exist");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message(" gateway down "), "gateway down");
        assert_eq!(error_message(r#"{"error_description":"Invalid login credentials"}"#), "Invalid login credentials");
    }
}
