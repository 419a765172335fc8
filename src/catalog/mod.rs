//! # Catalog
//!
//! Products, clinics and doctors shown alongside a consultation and edited on
//! the admin surface. Three independent collections; ids are unique within a
//! collection and nothing links across them.

pub mod entities;
pub mod form;
pub mod seed;
pub mod service;
pub mod store;

pub use entities::{CatalogEntity, CatalogItem, CatalogKind, Clinic, Doctor, Product, ProductShape};
pub use form::{CatalogForm, ClinicForm, DoctorForm, ProductForm};
pub use service::CatalogService;
pub use store::{CatalogStore, Collection, Upsert};
