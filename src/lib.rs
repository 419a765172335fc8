//! # Implant Consultation Client
//!
//! Client library for breast-implant aesthetic planning. A patient's metrics
//! and photo go to a multimodal generative model, which answers with two
//! implant volume options; the client then requests "after" simulations per
//! option, rendering style and camera angle. A separate admin surface edits
//! the product/clinic/doctor catalog stored in a Supabase project.
//!
//! ## Architecture
//!
//! - `processing`: upload validation, downscaling and JPEG re-encoding
//! - `ai`: recommendation and simulation calls behind the [`AiService`] trait
//! - `cache`: the 12-slot simulation cache
//! - `session`: one consultation, its state machine and the in-flight gate
//! - `catalog`: catalog collections, admin forms and the catalog service
//! - `backend`: Supabase REST, storage and auth
//! - `config`: configuration loading and validation
//! - `error`: the crate-wide error type and its localized messages
//!
//! Clients are built from [`ConsultConfig`] and injected; nothing is global.
//!
//! ## Example
//!
//! ```rust,no_run
//! use implant_consult::{ConsultConfig, ConsultationSession};
//! use implant_consult::model::{CameraAngle, DesiredLook, OptionId, PatientMetrics, RenderStyle};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConsultConfig::from_env()?;
//! let session = ConsultationSession::from_config(&config)?;
//!
//! let metrics = PatientMetrics {
//!     height: 160.0,
//!     weight: 50.0,
//!     age: 25,
//!     breast_width: 11.5,
//!     current_size: "Cup A".to_string(),
//!     desired_look: DesiredLook::Natural,
//! };
//! let photo = std::fs::read("photo.jpg")?;
//! let result = session.submit(metrics, &photo).await?;
//! println!("{}cc / {}cc", result.option1.volume, result.option2.volume);
//!
//! let image = session
//!     .generate_simulation(OptionId::First, RenderStyle::Photorealistic, CameraAngle::Front)
//!     .await?;
//! std::fs::write("after.png", image)?;
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{
    AiStage, ConsultError, ConsultResult, HasRecoverySuggestion, HasSeverity, Retryable,
};

pub use ai::{AiService, GeminiClient, SimulationRequest};
pub use cache::{SimulationCache, SlotState};
pub use config::ConsultConfig;
pub use session::{ConsultationSession, SessionState};
