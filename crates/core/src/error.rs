use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("word document error: {0}")]
    Word(String),

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("ocr engine not available: {0}")]
    OcrUnavailable(String),

    #[error("ocr timed out after {0:?}")]
    OcrTimeout(Duration),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("no text extracted from {0}")]
    NoText(String),

    #[error("unsupported file format: {0}")]
    Unsupported(String),

    #[error("upload has no usable file name: {0}")]
    MissingFileName(String),
}

impl ExtractError {
    /// Bracketed text stored in place of document content when extraction fails.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Io(error) => format!("[Error reading file: {error}]"),
            Self::PdfParse(details) => format!("[Error reading PDF: {details}]"),
            Self::Word(details) => format!("[Error reading Word document: {details}]"),
            Self::ImageDecode(details) => format!("[Error reading image: {details}]"),
            Self::OcrUnavailable(details) => format!("[OCR engine not available: {details}]"),
            Self::OcrTimeout(budget) => {
                format!("[OCR timed out after {} seconds]", budget.as_secs_f32())
            }
            Self::OcrFailed(details) => format!("[OCR failed: {details}]"),
            Self::NoText(name) => format!("[No text could be extracted from {name}]"),
            Self::Unsupported(ext) if ext.is_empty() => {
                "[Unsupported file format: no extension]".to_string()
            }
            Self::Unsupported(ext) => format!("[Unsupported file format: .{ext}]"),
            Self::MissingFileName(raw) => format!("[Invalid file name: {raw}]"),
        }
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Word(value.to_string())
    }
}

impl From<quick_xml::Error> for ExtractError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Word(value.to_string())
    }
}

impl From<image::ImageError> for ExtractError {
    fn from(value: image::ImageError) -> Self {
        Self::ImageDecode(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("authentication rejected by completion endpoint")]
    Unauthorized,

    #[error("rate limited by completion endpoint")]
    RateLimited,

    #[error("completion request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            _ => Self::Status { status, body },
        }
    }

    /// Text shown to the user as the assistant's reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => {
                "Invalid API key. Please check your GROQ_API_KEY configuration.".to_string()
            }
            Self::RateLimited => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            Self::Timeout => "The request timed out. Please try again.".to_string(),
            Self::Network(_) => {
                "Network error: unable to reach the AI service. Please check your connection."
                    .to_string()
            }
            Self::Status { status, .. } => {
                format!("The AI service returned an error (HTTP {status}).")
            }
            Self::MalformedResponse(_) => {
                "Received an unexpected response from the AI service.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout
        } else if value.is_decode() {
            Self::MalformedResponse(value.to_string())
        } else if let Some(status) = value.status() {
            Self::from_status(status.as_u16(), value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key missing: set {0} in the environment or a .env file")]
    MissingApiKey(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),

    #[error("http client setup failed: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_categories() {
        assert!(matches!(
            CompletionError::from_status(401, String::new()),
            CompletionError::Unauthorized
        ));
        assert!(matches!(
            CompletionError::from_status(429, String::new()),
            CompletionError::RateLimited
        ));
        assert!(matches!(
            CompletionError::from_status(503, "busy".to_string()),
            CompletionError::Status { status: 503, .. }
        ));
    }

    #[test]
    fn user_messages_are_distinct_per_category() {
        let messages = [
            CompletionError::Unauthorized.user_message(),
            CompletionError::RateLimited.user_message(),
            CompletionError::Timeout.user_message(),
            CompletionError::Network("refused".to_string()).user_message(),
            CompletionError::from_status(500, String::new()).user_message(),
        ];

        for (index, message) in messages.iter().enumerate() {
            for other in &messages[index + 1..] {
                assert_ne!(message, other);
            }
        }
        assert!(messages[4].contains("HTTP 500"));
    }

    #[test]
    fn diagnostics_are_bracketed_and_non_empty() {
        let errors = [
            ExtractError::PdfParse("bad xref".to_string()),
            ExtractError::OcrTimeout(Duration::from_secs(30)),
            ExtractError::NoText("scan.pdf".to_string()),
            ExtractError::Unsupported("xlsx".to_string()),
            ExtractError::Unsupported(String::new()),
        ];

        for error in errors {
            let text = error.diagnostic();
            assert!(text.starts_with('[') && text.ends_with(']'), "{text}");
        }
        assert_eq!(
            ExtractError::OcrTimeout(Duration::from_secs(30)).diagnostic(),
            "[OCR timed out after 30 seconds]"
        );
    }

    #[test]
    fn sub_second_ocr_budget_is_not_rounded_to_zero() {
        assert_eq!(
            ExtractError::OcrTimeout(Duration::from_millis(300)).diagnostic(),
            "[OCR timed out after 0.3 seconds]"
        );
    }
}
