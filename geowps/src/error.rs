//! Error types for the GeoWPS library.

use thiserror::Error;

/// Errors that can occur while handling a WPS request.
///
/// The first four variants are client errors reported with their own OWS
/// exception code. Everything else is a processing failure and is reported
/// as `NoApplicableCode`.
#[derive(Error, Debug)]
pub enum WpsError {
    /// A required parameter or process input was not supplied.
    #[error("Missing parameter value: {locator}")]
    MissingParameterValue { locator: String },

    /// A parameter or process input has a value the service cannot accept.
    #[error("Invalid parameter value for {locator}: {message}")]
    InvalidParameterValue { locator: String, message: String },

    /// The `request` parameter names an operation this service does not offer.
    #[error("Operation not supported: {operation}")]
    OperationNotSupported { operation: String },

    /// The client asked for a protocol version other than 1.0.0.
    #[error("Version negotiation failed: {version} (supported: 1.0.0)")]
    VersionNegotiationFailed { version: String },

    /// A document that should be XML could not be parsed.
    #[error("Invalid XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    /// The conversion tool ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ConversionFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The conversion tool could not be started.
    #[error("Failed to run {program}: {source}")]
    ConverterUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error while staging files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON structure or geometry conversion error.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A geometry that cannot be reduced to a centroid.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A result URL could not be built from the service base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Failure while writing an XML response document.
    #[error("XML write error: {0}")]
    Xml(String),
}

impl WpsError {
    /// Shorthand for [`WpsError::InvalidParameterValue`].
    pub fn invalid(locator: impl Into<String>, message: impl Into<String>) -> Self {
        WpsError::InvalidParameterValue {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`WpsError::MissingParameterValue`].
    pub fn missing(locator: impl Into<String>) -> Self {
        WpsError::MissingParameterValue {
            locator: locator.into(),
        }
    }

    /// The OWS `exceptionCode` reported for this error.
    pub fn exception_code(&self) -> &'static str {
        match self {
            WpsError::MissingParameterValue { .. } => "MissingParameterValue",
            WpsError::InvalidParameterValue { .. } => "InvalidParameterValue",
            WpsError::OperationNotSupported { .. } => "OperationNotSupported",
            WpsError::VersionNegotiationFailed { .. } => "VersionNegotiationFailed",
            _ => "NoApplicableCode",
        }
    }

    /// The OWS `locator` attribute, if the error points at a parameter.
    pub fn locator(&self) -> Option<&str> {
        match self {
            WpsError::MissingParameterValue { locator }
            | WpsError::InvalidParameterValue { locator, .. } => Some(locator),
            WpsError::OperationNotSupported { operation } => Some(operation),
            WpsError::VersionNegotiationFailed { .. } => Some("version"),
            _ => None,
        }
    }

    /// Whether the error was caused by the request rather than by processing.
    pub fn is_client_error(&self) -> bool {
        self.exception_code() != "NoApplicableCode"
    }
}

/// Result type alias using [`WpsError`].
pub type Result<T> = std::result::Result<T, WpsError>;
