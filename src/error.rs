//! # Error Handling
//!
//! One error type for the whole consultation client. Every variant carries an
//! [`ErrorContext`] (timestamp, operation, recovery suggestion, severity,
//! metadata) and maps to exactly one user-facing message in the audience's
//! language via [`ConsultError::user_message`].
//!
//! ## Taxonomy
//!
//! - image decode / image processing failures
//! - content-safety block, empty response, malformed response and quota
//!   exhaustion from the AI service, tagged with the [`AiStage`] they hit
//! - network/transport failures and non-2xx API replies
//! - backend authorization/policy failures, surfaced verbatim with a hint
//! - auth, configuration, validation, state and busy-gate errors
//!
//! Nothing here retries. [`Retryable::is_retryable`] only tells the caller
//! whether resubmitting by hand makes sense.
//!
//! ## Usage
//!
//! ```rust
//! use implant_consult::error::{AiStage, ConsultError, HasRecoverySuggestion};
//!
//! let error = ConsultError::quota_exhausted(AiStage::Simulation, "429 RESOURCE_EXHAUSTED")
//!     .with_recovery_suggestion("wait for the daily quota to reset");
//!
//! assert_eq!(error.category(), "quota_exhausted");
//! assert!(error.user_message().contains("Quota"));
//! assert_eq!(error.recovery_suggestion(), Some("wait for the daily quota to reset"));
//! ```

use std::{collections::HashMap, error::Error as StdError, fmt, time::SystemTime};

/// Result alias used across the crate.
pub type ConsultResult<T> = Result<T, ConsultError>;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that fail one user action
    Error,
    /// Errors that make a whole surface unusable until configuration changes
    Critical,
}

/// Which AI call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStage {
    Recommendation,
    Simulation,
}

impl fmt::Display for AiStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiStage::Recommendation => write!(f, "recommendation"),
            AiStage::Simulation => write!(f, "simulation"),
        }
    }
}

/// Core error context containing metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// Base error type for the consultation client
#[derive(Debug)]
pub enum ConsultError {
    /// Input bytes are not a decodable raster image
    ImageDecode {
        reason: String,
        context: ErrorContext,
    },
    /// Resizing or re-encoding a decoded image failed
    Image {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// The model refused the request on content-safety grounds
    SafetyBlock {
        stage: AiStage,
        context: ErrorContext,
    },
    /// The model answered with no usable content
    EmptyResponse {
        stage: AiStage,
        context: ErrorContext,
    },
    /// The model answered, but not with the expected shape
    MalformedResponse {
        stage: AiStage,
        reason: String,
        context: ErrorContext,
    },
    /// Rate limit or quota exhausted upstream
    QuotaExhausted {
        stage: AiStage,
        detail: String,
        context: ErrorContext,
    },
    /// Transport failure (DNS, TLS, connect, timeout, body read)
    Network {
        operation: String,
        address: Option<String>,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Non-2xx reply from a remote API that is not covered by a finer class
    Api {
        service: String,
        status: u16,
        message: String,
        context: ErrorContext,
    },
    /// Backend authorization or row/bucket policy rejection
    Backend {
        operation: String,
        status: Option<u16>,
        message: String,
        context: ErrorContext,
    },
    /// Login, signup or session failures
    Auth {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Missing or invalid configuration
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Rejected user input
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Operation not valid in the current session state
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Another request already holds the in-flight gate
    Busy {
        operation: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl ConsultError {
    pub fn image_decode(reason: impl Into<String>) -> Self {
        Self::ImageDecode {
            reason: reason.into(),
            context: ErrorContext::new()
                .with_recovery_suggestion("upload a JPEG, PNG, WebP, GIF or BMP photo"),
        }
    }

    pub fn image(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Image {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn safety_block(stage: AiStage) -> Self {
        Self::SafetyBlock {
            stage,
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Warning)
                .with_recovery_suggestion("retry with a clearer, well-lit clinical photo"),
        }
    }

    pub fn empty_response(stage: AiStage) -> Self {
        Self::EmptyResponse {
            stage,
            context: ErrorContext::new(),
        }
    }

    pub fn malformed_response(stage: AiStage, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            stage,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn quota_exhausted(stage: AiStage, detail: impl Into<String>) -> Self {
        Self::QuotaExhausted {
            stage,
            detail: detail.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    pub fn network(operation: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            address: None,
            source: None,
            context: ErrorContext::new(),
        }
    }

    pub fn api(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            status,
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn backend(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            status,
            message: message.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn auth(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Auth {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Info),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the filesystem path to an I/O error. No-op for other variants.
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(new_path.into());
        }
        self
    }

    /// Attach the remote address to a network error. No-op for other variants.
    pub fn with_address(mut self, new_address: impl Into<String>) -> Self {
        if let Self::Network { address, .. } = &mut self {
            *address = Some(new_address.into());
        }
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ImageDecode { context, .. }
            | Self::Image { context, .. }
            | Self::SafetyBlock { context, .. }
            | Self::EmptyResponse { context, .. }
            | Self::MalformedResponse { context, .. }
            | Self::QuotaExhausted { context, .. }
            | Self::Network { context, .. }
            | Self::Api { context, .. }
            | Self::Backend { context, .. }
            | Self::Auth { context, .. }
            | Self::Config { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. }
            | Self::Busy { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::ImageDecode { context, .. }
            | Self::Image { context, .. }
            | Self::SafetyBlock { context, .. }
            | Self::EmptyResponse { context, .. }
            | Self::MalformedResponse { context, .. }
            | Self::QuotaExhausted { context, .. }
            | Self::Network { context, .. }
            | Self::Api { context, .. }
            | Self::Backend { context, .. }
            | Self::Auth { context, .. }
            | Self::Config { context, .. }
            | Self::Validation { context, .. }
            | Self::State { context, .. }
            | Self::Busy { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    /// Stable category tag for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ImageDecode { .. } => "image_decode",
            Self::Image { .. } => "image",
            Self::SafetyBlock { .. } => "safety_block",
            Self::EmptyResponse { .. } => "empty_response",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::QuotaExhausted { .. } => "quota_exhausted",
            Self::Network { .. } => "network",
            Self::Api { .. } => "api",
            Self::Backend { .. } => "backend",
            Self::Auth { .. } => "auth",
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
            Self::Busy { .. } => "busy",
            Self::Io { .. } => "io",
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExhausted { .. })
    }

    /// Localized message shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::ImageDecode { .. } => {
                "Không thể xử lý hình ảnh. Vui lòng chọn ảnh JPG hoặc PNG hợp lệ.".to_string()
            }
            Self::Image { .. } => "Không thể xử lý hình ảnh.".to_string(),
            Self::SafetyBlock {
                stage: AiStage::Recommendation,
                ..
            } => "AI chặn ảnh này vì lý do an toàn. Vui lòng thử ảnh chụp rõ ràng hơn.".to_string(),
            Self::SafetyBlock {
                stage: AiStage::Simulation,
                ..
            } => "Hình ảnh mô phỏng bị chặn do chính sách an toàn.".to_string(),
            Self::EmptyResponse {
                stage: AiStage::Recommendation,
                ..
            } => "AI không trả về kết quả.".to_string(),
            Self::EmptyResponse {
                stage: AiStage::Simulation,
                ..
            } => "AI không trả về dữ liệu hình ảnh.".to_string(),
            Self::MalformedResponse { .. } => {
                "Dữ liệu trả về không đúng định dạng JSON.".to_string()
            }
            Self::QuotaExhausted {
                stage: AiStage::Recommendation,
                ..
            } => "Hệ thống AI đang quá tải (Hết Quota). Vui lòng thử lại sau.".to_string(),
            Self::QuotaExhausted {
                stage: AiStage::Simulation,
                ..
            } => "Hệ thống AI đang tạm thời hết hạn mức xử lý ảnh (Quota Exceeded). \
                  Vui lòng quay lại sau 24h hoặc liên hệ Admin để nâng cấp gói."
                .to_string(),
            Self::Network { .. } => {
                "Lỗi kết nối mạng. Vui lòng kiểm tra kết nối và thử lại.".to_string()
            }
            Self::Api { message, .. } if message.contains("API key not valid") => {
                "API Key không hợp lệ.".to_string()
            }
            Self::Api { message, .. } => format!("Lỗi dịch vụ AI: {}", message),
            Self::Backend { message, context, .. } => match &context.recovery_suggestion {
                Some(hint) => format!("{} ({})", message, hint),
                None => message.clone(),
            },
            Self::Auth { reason, .. } => format!("Lỗi xác thực: {}", reason),
            Self::Config { field, .. } => format!("Chưa cấu hình {}.", field),
            Self::Validation { constraint, .. } => format!("Dữ liệu không hợp lệ: {}", constraint),
            Self::State { reason, .. } => format!("Chưa thể thực hiện thao tác: {}", reason),
            Self::Busy { .. } => {
                "Hệ thống đang tạo ảnh mô phỏng, vui lòng đợi hoàn tất.".to_string()
            }
            Self::Io { operation, .. } => format!("Lỗi đọc/ghi tệp khi {}.", operation),
        }
    }
}

impl fmt::Display for ConsultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultError::ImageDecode { reason, .. } => {
                write!(f, "Unreadable image: {}", reason)
            }
            ConsultError::Image {
                operation, reason, ..
            } => write!(f, "Image processing failed during {}: {}", operation, reason),
            ConsultError::SafetyBlock { stage, .. } => {
                write!(f, "SAFETY_BLOCK: {} request blocked by content safety", stage)
            }
            ConsultError::EmptyResponse { stage, .. } => {
                write!(f, "EMPTY_RESPONSE: {} returned no content", stage)
            }
            ConsultError::MalformedResponse { stage, reason, .. } => {
                write!(f, "FORMAT_ERROR: {} response malformed: {}", stage, reason)
            }
            ConsultError::QuotaExhausted { stage, detail, .. } => {
                write!(f, "QUOTA_EXHAUSTED: {} quota exhausted: {}", stage, detail)
            }
            ConsultError::Network {
                operation,
                address,
                source,
                ..
            } => {
                write!(f, "Network error during {}", operation)?;
                if let Some(address) = address {
                    write!(f, " on {}", address)?;
                }
                if let Some(source) = source {
                    write!(f, ": {}", source)?;
                }
                Ok(())
            }
            ConsultError::Api {
                service,
                status,
                message,
                ..
            } => write!(f, "{} API error ({}): {}", service, status, message),
            ConsultError::Backend {
                operation,
                status,
                message,
                ..
            } => match status {
                Some(status) => write!(
                    f,
                    "Backend rejected {} ({}): {}",
                    operation, status, message
                ),
                None => write!(f, "Backend rejected {}: {}", operation, message),
            },
            ConsultError::Auth {
                operation, reason, ..
            } => write!(f, "Authentication error during {}: {}", operation, reason),
            ConsultError::Config {
                field,
                value,
                reason,
                ..
            } => write!(
                f,
                "Configuration error in '{}': {} (value: {})",
                field, reason, value
            ),
            ConsultError::Validation {
                field,
                constraint,
                value,
                ..
            } => write!(
                f,
                "Validation failed for '{}': {} (value: {})",
                field, constraint, value
            ),
            ConsultError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => write!(
                f,
                "Cannot {} while '{}': {}",
                attempted_operation, current_state, reason
            ),
            ConsultError::Busy { operation, .. } => {
                write!(f, "Rejected {}: another request is in flight", operation)
            }
            ConsultError::Io {
                operation,
                path,
                source,
                ..
            } => match path {
                Some(path) => write!(f, "I/O error during {} on '{}': {}", operation, path, source),
                None => write!(f, "I/O error during {}: {}", operation, source),
            },
        }
    }
}

impl StdError for ConsultError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Network {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Trait for errors that a user may resolve by resubmitting by hand.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ConsultError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. }
            | Self::EmptyResponse { .. }
            | Self::MalformedResponse { .. }
            | Self::QuotaExhausted { .. }
            | Self::Busy { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ConsultError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors with recovery suggestions
pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ConsultError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

impl From<std::io::Error> for ConsultError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for ConsultError {
    fn from(error: serde_json::Error) -> Self {
        Self::io("parse JSON", error.into())
    }
}

impl From<reqwest::Error> for ConsultError {
    fn from(error: reqwest::Error) -> Self {
        let operation = if error.is_timeout() {
            "request (timed out)"
        } else if error.is_connect() {
            "connect"
        } else if error.is_decode() {
            "decode response body"
        } else {
            "request"
        };
        let address = error.url().map(|u| {
            // Never log query strings: the AI key travels there.
            format!("{}{}", u.origin().ascii_serialization(), u.path())
        });
        Self::Network {
            operation: operation.to_string(),
            address,
            source: Some(Box::new(error.without_url())),
            context: ErrorContext::new(),
        }
    }
}

impl From<image::ImageError> for ConsultError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                Self::image_decode(error.to_string())
            }
            other => Self::image("encode", other.to_string()),
        }
    }
}

impl From<consult_scale::cpu::ScaleError> for ConsultError {
    fn from(error: consult_scale::cpu::ScaleError) -> Self {
        Self::image("resize", error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ConsultError::config("ai_api_key", "", "missing");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_error_with_context() {
        let error = ConsultError::image("resize", "buffer too small")
            .with_context("preprocessing upload")
            .with_recovery_suggestion("re-export the photo")
            .with_metadata("width", "4000");

        assert_eq!(error.category(), "image");
        assert_eq!(error.context().context.as_deref(), Some("preprocessing upload"));
        assert_eq!(error.recovery_suggestion(), Some("re-export the photo"));
        assert_eq!(error.context().metadata.get("width").map(String::as_str), Some("4000"));
    }

    #[test]
    fn each_ai_class_has_its_own_message() {
        let messages = [
            ConsultError::safety_block(AiStage::Recommendation).user_message(),
            ConsultError::empty_response(AiStage::Recommendation).user_message(),
            ConsultError::malformed_response(AiStage::Recommendation, "x").user_message(),
            ConsultError::quota_exhausted(AiStage::Recommendation, "x").user_message(),
            ConsultError::network("send").user_message(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn simulation_and_recommendation_messages_differ() {
        assert_ne!(
            ConsultError::safety_block(AiStage::Simulation).user_message(),
            ConsultError::safety_block(AiStage::Recommendation).user_message()
        );
    }

    #[test]
    fn invalid_key_is_localized() {
        let error = ConsultError::api("gemini", 400, "API key not valid. Please pass a valid API key.");
        assert_eq!(error.user_message(), "API Key không hợp lệ.");
    }

    #[test]
    fn backend_message_keeps_verbatim_text_and_hint() {
        let error = ConsultError::backend(
            "upload",
            Some(403),
            "new row violates row-level security policy",
        )
        .with_recovery_suggestion("allow INSERT for authenticated users on bucket 'resources'");
        let msg = error.user_message();
        assert!(msg.starts_with("new row violates row-level security policy"));
        assert!(msg.contains("bucket 'resources'"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ConsultError::network("connect").is_retryable());
        assert!(ConsultError::api("gemini", 503, "unavailable").is_retryable());
        assert!(!ConsultError::api("gemini", 400, "bad").is_retryable());
        assert!(!ConsultError::safety_block(AiStage::Simulation).is_retryable());
        assert!(ConsultError::quota_exhausted(AiStage::Simulation, "").is_quota());
    }

    #[test]
    fn io_path_is_attached() {
        let error = ConsultError::io("read", std::io::Error::other("boom")).with_path("/tmp/x");
        assert_eq!(error.to_string(), "I/O error during read on '/tmp/x': boom");
        assert!(error.source().is_some());
    }
}
