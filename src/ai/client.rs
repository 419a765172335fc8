//! REST client for the multimodal generative model.
//!
//! Wraps `POST {base}/models/{model}:generateContent` using [`reqwest`]. One
//! attempt per call; failures are classified into the crate's error taxonomy
//! and returned.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ai::wire::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::ai::{AiService, SimulationRequest, recommendation, simulation};
use crate::config::ConsultConfig;
use crate::error::{AiStage, ConsultError, ConsultResult};
use crate::model::{AnalysisResult, PatientMetrics};
use crate::processing::PreparedImage;

const SERVICE: &str = "gemini";

/// HTTP client for the generative model API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    analysis_model: String,
    image_model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Build a client from configuration, with its own connection pool.
    pub fn from_config(config: &ConsultConfig) -> ConsultResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.ai_timeout())
            .build()
            .map_err(ConsultError::from)?;
        Ok(Self::with_client(client, config))
    }

    /// Build a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ConsultConfig) -> Self {
        Self {
            client,
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            api_key: config.ai_api_key.clone(),
            analysis_model: config.analysis_model.clone(),
            image_model: config.image_model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn api_key(&self, stage: AiStage) -> ConsultResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ConsultError::config("ai_api_key", "", "no AI API key configured")
                .with_operation(stage.to_string())
        })
    }

    /// Send one `generateContent` call and decode the body.
    pub async fn generate_content(
        &self,
        stage: AiStage,
        model: &str,
        request: &GenerateContentRequest,
    ) -> ConsultResult<GenerateContentResponse> {
        let key = self.api_key(stage)?;
        let url = self.endpoint(model);
        debug!(%stage, model, "sending generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(stage, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let error = classify_failure(stage, status.as_u16(), &body);
            warn!(%stage, status = status.as_u16(), category = error.category(), "AI call failed");
            return Err(error);
        }

        let body = response.text().await.map_err(|e| classify_transport(stage, e))?;
        if body.trim().is_empty() {
            return Err(ConsultError::empty_response(stage));
        }
        serde_json::from_str(&body)
            .map_err(|e| ConsultError::malformed_response(stage, format!("response envelope: {}", e)))
    }
}

#[async_trait]
impl AiService for GeminiClient {
    async fn recommend(
        &self,
        metrics: &PatientMetrics,
        image: &PreparedImage,
    ) -> ConsultResult<AnalysisResult> {
        let request = GenerateContentRequest::image_and_text(
            image.mime,
            image.to_base64(),
            recommendation::build_prompt(metrics),
        )
        .with_system_instruction(recommendation::SYSTEM_INSTRUCTION)
        .with_generation_config(GenerationConfig {
            temperature: Some(self.temperature),
            response_mime_type: Some("application/json".to_string()),
        });

        let response = self
            .generate_content(AiStage::Recommendation, &self.analysis_model, &request)
            .await?;
        let result = recommendation::parse_response(&response)?;
        info!(
            option1 = result.option1.volume,
            option2 = result.option2.volume,
            "recommendation received"
        );
        Ok(result)
    }

    async fn simulate(&self, request: &SimulationRequest<'_>) -> ConsultResult<Vec<u8>> {
        let body = GenerateContentRequest::image_and_text(
            request.image.mime,
            request.image.to_base64(),
            simulation::build_prompt(request),
        );

        let response = self
            .generate_content(AiStage::Simulation, &self.image_model, &body)
            .await
            .map_err(simulation::clean_error)?;
        simulation::extract_image(&response)
    }
}

/// Whether an error text points at rate limiting or quota exhaustion.
pub fn looks_like_quota(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("429") || lower.contains("quota") || lower.contains("resource_exhausted")
}

/// Map a non-2xx reply to the error taxonomy.
pub fn classify_failure(stage: AiStage, status: u16, body: &str) -> ConsultError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let upstream_status = envelope
        .as_ref()
        .and_then(|e| e.error.status.clone())
        .unwrap_or_default();

    if status == 429 || looks_like_quota(&upstream_status) || looks_like_quota(&message) {
        return ConsultError::quota_exhausted(stage, message).with_metadata("status", status.to_string());
    }
    if message.contains("SAFETY") {
        return ConsultError::safety_block(stage).with_context(message);
    }
    ConsultError::api(SERVICE, status, message).with_operation(stage.to_string())
}

fn classify_transport(stage: AiStage, error: reqwest::Error) -> ConsultError {
    if looks_like_quota(&error.to_string()) {
        return ConsultError::quota_exhausted(stage, error.to_string());
    }
    ConsultError::from(error).with_operation(stage.to_string())
}
