//! Catalog operations for the admin surface: local store first, mirrored to
//! the backend when one is configured.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{AdminGate, CatalogBackend, SupabaseClient};
use crate::catalog::entities::{CatalogItem, CatalogKind};
use crate::catalog::form::CatalogForm;
use crate::catalog::seed;
use crate::catalog::store::{CatalogStore, Upsert};
use crate::config::ConsultConfig;
use crate::error::{ConsultError, ConsultResult};
use crate::processing::validate_upload;

/// Catalog store with optional remote persistence.
///
/// Without a backend the built-in rows are served and edits live only in
/// memory. With one, [`CatalogService::refresh`] makes the remote tables
/// authoritative and every edit is written remotely before it is applied
/// locally.
pub struct CatalogService {
    store: CatalogStore,
    backend: Option<Arc<dyn CatalogBackend>>,
}

impl CatalogService {
    pub fn new(backend: Option<Arc<dyn CatalogBackend>>) -> Self {
        Self {
            store: seed::seeded_store(),
            backend,
        }
    }

    pub fn from_config(config: &ConsultConfig) -> ConsultResult<Self> {
        let backend: Option<Arc<dyn CatalogBackend>> = if config.has_backend() {
            Some(Arc::new(SupabaseClient::from_config(config)?))
        } else {
            None
        };
        Ok(Self::new(backend))
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Reload every collection from the backend. No-op without one.
    pub async fn refresh(&mut self) -> ConsultResult<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        for kind in CatalogKind::ALL {
            let rows = backend.fetch_all(kind).await?;
            self.store.replace_all(kind, rows);
        }
        Ok(())
    }

    /// Insert or replace a row.
    pub async fn save(&mut self, gate: &AdminGate, item: CatalogItem) -> ConsultResult<Upsert> {
        let session = gate.require()?;
        if item.id().trim().is_empty() {
            return Err(ConsultError::validation("id", "must not be empty", ""));
        }
        if let Some(backend) = &self.backend {
            backend.upsert(&item, &session.access_token).await?;
        }
        let kind = item.kind();
        let id = item.id().to_string();
        let outcome = self.store.upsert(item);
        info!(collection = %kind, id, ?outcome, "catalog row saved");
        Ok(outcome)
    }

    /// Build a row from an admin form and save it. `editing` is the id of the
    /// row being edited, if any.
    pub async fn save_form(
        &mut self,
        gate: &AdminGate,
        form: CatalogForm,
        editing: Option<&str>,
    ) -> ConsultResult<CatalogItem> {
        gate.require()?;
        let kind = form.kind();
        let existing = match editing {
            Some(id) => Some(
                self.store
                    .get(kind, id)
                    .ok_or_else(|| ConsultError::validation("id", "no such row to edit", id))?,
            ),
            None => None,
        };
        let item = form.into_item(existing.as_ref())?;
        self.save(gate, item.clone()).await?;
        Ok(item)
    }

    /// Remove a row. Deleting an unknown id succeeds and returns `false`.
    pub async fn delete(&mut self, gate: &AdminGate, kind: CatalogKind, id: &str) -> ConsultResult<bool> {
        let session = gate.require()?;
        if let Some(backend) = &self.backend {
            backend.delete(kind, id, &session.access_token).await?;
        }
        let removed = self.store.delete(kind, id);
        info!(collection = %kind, id, removed, "catalog row deleted");
        Ok(removed)
    }

    /// Store a catalog image and return the reference to put in a row.
    ///
    /// With a backend this is the object's public URL; without one the image
    /// is inlined as a `data:` URL.
    pub async fn upload_image(&self, gate: &AdminGate, file_name: &str, bytes: Vec<u8>) -> ConsultResult<String> {
        let session = gate.require()?;
        let format = validate_upload(&bytes)?;
        let mime = mime_guess::from_path(file_name)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| format.to_mime_type().to_string());

        let Some(backend) = &self.backend else {
            warn!("no backend configured; image inlined as data URL");
            return Ok(format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(&bytes)));
        };
        let extension = format.extensions_str().first().copied().unwrap_or("bin");
        let object = format!("catalog/{}.{}", Uuid::now_v7().simple(), extension);
        backend.upload_object(&object, bytes, &mime, &session.access_token).await
    }
}
