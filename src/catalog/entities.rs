//! Catalog entities as stored in the backend tables (`camelCase` columns).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConsultError, ConsultResult};

/// The three independent collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Products,
    Clinics,
    Doctors,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [CatalogKind::Products, CatalogKind::Clinics, CatalogKind::Doctors];

    /// Backend table name.
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Products => "products",
            CatalogKind::Clinics => "clinics",
            CatalogKind::Doctors => "doctors",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Common view over catalog rows.
pub trait CatalogEntity: Clone + fmt::Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    const KIND: CatalogKind;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    /// Image reference: a URL or a `data:` URL.
    fn image(&self) -> &str;

    fn into_item(self) -> CatalogItem;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ProductShape {
    Round,
    Anatomical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub shape: ProductShape,
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technology: Vec<String>,
    #[serde(default)]
    pub full_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub address: String,
    pub image: String,
    pub rating: f32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_partner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub title: String,
    pub experience: String,
    pub hospital: String,
    pub avatar: String,
    pub rating: f32,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl CatalogEntity for Product {
    const KIND: CatalogKind = CatalogKind::Products;

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn image(&self) -> &str {
        &self.image
    }
    fn into_item(self) -> CatalogItem {
        CatalogItem::Product(self)
    }
}

impl CatalogEntity for Clinic {
    const KIND: CatalogKind = CatalogKind::Clinics;

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn image(&self) -> &str {
        &self.image
    }
    fn into_item(self) -> CatalogItem {
        CatalogItem::Clinic(self)
    }
}

impl CatalogEntity for Doctor {
    const KIND: CatalogKind = CatalogKind::Doctors;

    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn image(&self) -> &str {
        &self.avatar
    }
    fn into_item(self) -> CatalogItem {
        CatalogItem::Doctor(self)
    }
}

/// One row of any collection, as edited on the admin surface.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Product(Product),
    Clinic(Clinic),
    Doctor(Doctor),
}

impl CatalogItem {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogItem::Product(_) => CatalogKind::Products,
            CatalogItem::Clinic(_) => CatalogKind::Clinics,
            CatalogItem::Doctor(_) => CatalogKind::Doctors,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Product(p) => p.id(),
            CatalogItem::Clinic(c) => c.id(),
            CatalogItem::Doctor(d) => d.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Product(p) => p.name(),
            CatalogItem::Clinic(c) => c.name(),
            CatalogItem::Doctor(d) => d.name(),
        }
    }

    /// Parse one row of the given collection.
    pub fn from_json(kind: CatalogKind, json: &str) -> ConsultResult<Self> {
        let item = match kind {
            CatalogKind::Products => CatalogItem::Product(serde_json::from_str(json).map_err(row_error(kind))?),
            CatalogKind::Clinics => CatalogItem::Clinic(serde_json::from_str(json).map_err(row_error(kind))?),
            CatalogKind::Doctors => CatalogItem::Doctor(serde_json::from_str(json).map_err(row_error(kind))?),
        };
        Ok(item)
    }

    /// Row as sent to the backend.
    pub fn to_json(&self) -> ConsultResult<serde_json::Value> {
        let value = match self {
            CatalogItem::Product(p) => serde_json::to_value(p)?,
            CatalogItem::Clinic(c) => serde_json::to_value(c)?,
            CatalogItem::Doctor(d) => serde_json::to_value(d)?,
        };
        Ok(value)
    }
}

fn row_error(kind: CatalogKind) -> impl Fn(serde_json::Error) -> ConsultError {
    move |e| ConsultError::validation(kind.table(), "row does not match the collection schema", e.to_string())
}
