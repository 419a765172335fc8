//! Admin form input → catalog rows.
//!
//! Forms carry the editable subset of each entity. Editing an existing row
//! keeps the fields the form does not show (technology list, gallery, bio).

use uuid::Uuid;

use crate::catalog::entities::{CatalogItem, CatalogKind, Clinic, Doctor, Product, ProductShape};
use crate::error::{ConsultError, ConsultResult};

const IMAGE_REQUIRED: &str = "Vui lòng chọn hình ảnh!";

/// Non-blank lines of a multi-line field, trimmed.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Identifier for a newly created row.
pub fn generate_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn required(field: &str, value: String) -> ConsultResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConsultError::validation(field, "must not be empty", ""));
    }
    Ok(trimmed.to_string())
}

fn required_image(image: Option<String>) -> ConsultResult<String> {
    image
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ConsultError::validation("image", IMAGE_REQUIRED, ""))
}

fn parse_rating(text: &str) -> ConsultResult<f32> {
    text.trim()
        .parse::<f32>()
        .ok()
        .filter(|r| (0.0..=5.0).contains(r))
        .ok_or_else(|| ConsultError::validation("rating", "must be a number between 0 and 5", text))
}

#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub shape: Option<ProductShape>,
    pub description: String,
    /// One feature per line
    pub features: String,
    pub image: Option<String>,
}

impl ProductForm {
    /// Build the row; `existing` is the row being edited, if any.
    pub fn into_product(self, existing: Option<&Product>) -> ConsultResult<Product> {
        let image = required_image(self.image.or_else(|| existing.map(|p| p.image.clone())))?;
        Ok(Product {
            id: existing.map_or_else(generate_id, |p| p.id.clone()),
            name: required("name", self.name)?,
            shape: self.shape.unwrap_or(ProductShape::Round),
            description: self.description.trim().to_string(),
            image,
            features: parse_lines(&self.features),
            technology: existing.map(|p| p.technology.clone()).unwrap_or_default(),
            full_description: existing.and_then(|p| p.full_description.clone()),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClinicForm {
    pub name: String,
    pub address: String,
    pub rating: String,
    pub features: String,
    pub image: Option<String>,
}

impl ClinicForm {
    pub fn into_clinic(self, existing: Option<&Clinic>) -> ConsultResult<Clinic> {
        let image = required_image(self.image.or_else(|| existing.map(|c| c.image.clone())))?;
        Ok(Clinic {
            id: existing.map_or_else(generate_id, |c| c.id.clone()),
            name: required("name", self.name)?,
            address: self.address.trim().to_string(),
            image,
            rating: parse_rating(&self.rating)?,
            features: parse_lines(&self.features),
            introduction: existing.and_then(|c| c.introduction.clone()),
            gallery: existing.map(|c| c.gallery.clone()).unwrap_or_default(),
            phone: existing.and_then(|c| c.phone.clone()),
            is_partner: existing.is_some_and(|c| c.is_partner),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoctorForm {
    pub name: String,
    pub title: String,
    pub hospital: String,
    pub experience: String,
    pub rating: String,
    pub avatar: Option<String>,
}

impl DoctorForm {
    pub fn into_doctor(self, existing: Option<&Doctor>) -> ConsultResult<Doctor> {
        let avatar = required_image(self.avatar.or_else(|| existing.map(|d| d.avatar.clone())))?;
        Ok(Doctor {
            id: existing.map_or_else(generate_id, |d| d.id.clone()),
            name: required("name", self.name)?,
            title: self.title.trim().to_string(),
            experience: self.experience.trim().to_string(),
            hospital: self.hospital.trim().to_string(),
            avatar,
            rating: parse_rating(&self.rating)?,
            bio: existing.and_then(|d| d.bio.clone()),
            specialties: existing.map(|d| d.specialties.clone()).unwrap_or_default(),
            certifications: existing.map(|d| d.certifications.clone()).unwrap_or_default(),
        })
    }
}

/// A submitted admin form of any kind.
#[derive(Debug, Clone)]
pub enum CatalogForm {
    Product(ProductForm),
    Clinic(ClinicForm),
    Doctor(DoctorForm),
}

impl CatalogForm {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogForm::Product(_) => CatalogKind::Products,
            CatalogForm::Clinic(_) => CatalogKind::Clinics,
            CatalogForm::Doctor(_) => CatalogKind::Doctors,
        }
    }

    /// Build the row. `existing` must be of the same kind, else it is ignored.
    pub fn into_item(self, existing: Option<&CatalogItem>) -> ConsultResult<CatalogItem> {
        match self {
            CatalogForm::Product(form) => {
                let base = match existing {
                    Some(CatalogItem::Product(p)) => Some(p),
                    _ => None,
                };
                form.into_product(base).map(CatalogItem::Product)
            }
            CatalogForm::Clinic(form) => {
                let base = match existing {
                    Some(CatalogItem::Clinic(c)) => Some(c),
                    _ => None,
                };
                form.into_clinic(base).map(CatalogItem::Clinic)
            }
            CatalogForm::Doctor(form) => {
                let base = match existing {
                    Some(CatalogItem::Doctor(d)) => Some(d),
                    _ => None,
                };
                form.into_doctor(base).map(CatalogItem::Doctor)
            }
        }
    }
}
