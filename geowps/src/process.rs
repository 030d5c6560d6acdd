//! Process descriptions, bound inputs and produced outputs.
//!
//! A [`Process`] pairs an immutable [`ProcessDescription`] with a plain
//! function pointer. The service validates raw request inputs against the
//! description (see [`ProcessDescription::bind_inputs`]) before the handler
//! ever sees them, so handlers can assume required inputs are present and
//! literal values parse as their declared type.

use std::collections::HashMap;
use std::path::Path;

use url::Url;

use crate::datafile::DataFileCache;
use crate::error::{Result, WpsError};
use crate::ogr::Ogr2Ogr;

/// Data type of a literal input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralType {
    String,
    Integer,
    Float,
    Boolean,
}

impl LiteralType {
    /// Name used in `ows:DataType`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LiteralType::String => "string",
            LiteralType::Integer => "integer",
            LiteralType::Float => "float",
            LiteralType::Boolean => "boolean",
        }
    }

    /// XML Schema reference for `ows:DataType/@ows:reference`.
    pub fn reference(&self) -> &'static str {
        match self {
            LiteralType::String => "http://www.w3.org/TR/xmlschema-2/#string",
            LiteralType::Integer => "http://www.w3.org/TR/xmlschema-2/#integer",
            LiteralType::Float => "http://www.w3.org/TR/xmlschema-2/#float",
            LiteralType::Boolean => "http://www.w3.org/TR/xmlschema-2/#boolean",
        }
    }

    /// Check that `value` is a valid lexical form of this type.
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            LiteralType::String => true,
            LiteralType::Integer => value.parse::<i64>().is_ok(),
            LiteralType::Float => value.parse::<f64>().is_ok(),
            LiteralType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        }
    }
}

/// A supported format of a complex input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub mime_type: String,
}

impl Format {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
        }
    }
}

/// Whether a parameter carries a literal value or a complex document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataKind {
    Literal(LiteralType),
    /// Supported formats; the first one is the default.
    Complex(Vec<Format>),
}

/// Declared input of a process.
#[derive(Debug, Clone)]
pub struct InputDescription {
    pub identifier: String,
    pub title: String,
    pub kind: DataKind,
    /// Zero makes the input optional.
    pub min_occurs: u32,
}

impl InputDescription {
    /// A required literal input.
    pub fn literal(identifier: &str, title: &str, data_type: LiteralType) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            kind: DataKind::Literal(data_type),
            min_occurs: 1,
        }
    }

    /// A required complex input accepting the given formats.
    pub fn complex(identifier: &str, title: &str, formats: Vec<Format>) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            kind: DataKind::Complex(formats),
            min_occurs: 1,
        }
    }
}

/// Declared output of a process.
#[derive(Debug, Clone)]
pub struct OutputDescription {
    pub identifier: String,
    pub title: String,
    pub kind: DataKind,
}

impl OutputDescription {
    pub fn literal(identifier: &str, title: &str, data_type: LiteralType) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            kind: DataKind::Literal(data_type),
        }
    }

    pub fn complex(identifier: &str, title: &str, formats: Vec<Format>) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: title.to_string(),
            kind: DataKind::Complex(formats),
        }
    }
}

/// Everything a client can learn about a process through DescribeProcess.
#[derive(Debug, Clone)]
pub struct ProcessDescription {
    pub identifier: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub version: String,
    pub inputs: Vec<InputDescription>,
    pub outputs: Vec<OutputDescription>,
}

impl ProcessDescription {
    pub fn input(&self, identifier: &str) -> Option<&InputDescription> {
        self.inputs.iter().find(|i| i.identifier == identifier)
    }

    pub fn output(&self, identifier: &str) -> Option<&OutputDescription> {
        self.outputs.iter().find(|o| o.identifier == identifier)
    }

    /// Validate raw inputs against the declared inputs.
    ///
    /// Untyped values (KVP inputs without a `mimeType`) bind to whatever
    /// the input declares. Explicit literal data never binds to a complex
    /// input, nor complex data to a literal one.
    ///
    /// # Errors
    ///
    /// - `InvalidParameterValue` for unknown or repeated inputs, literal values
    ///   that do not parse, literal data supplied for a complex input (or the
    ///   other way round), and unsupported mime types
    /// - `MissingParameterValue` when a required input is absent
    pub fn bind_inputs(&self, raw: Vec<(String, InputValue)>) -> Result<ProcessRequest> {
        let mut inputs = HashMap::with_capacity(raw.len());

        for (identifier, value) in raw {
            let declared = self.input(&identifier).ok_or_else(|| {
                WpsError::invalid(
                    identifier.as_str(),
                    format!("process {} has no such input", self.identifier),
                )
            })?;

            let value = match (&declared.kind, value) {
                (DataKind::Literal(data_type), InputValue::Literal(v))
                | (DataKind::Literal(data_type), InputValue::Untyped(v)) => {
                    if !data_type.accepts(&v) {
                        return Err(WpsError::invalid(
                            identifier,
                            format!("expected a value of type {}", data_type.as_str()),
                        ));
                    }
                    InputValue::Literal(v)
                }
                (DataKind::Literal(_), InputValue::Complex { .. }) => {
                    return Err(WpsError::invalid(identifier, "expected literal data"));
                }
                (DataKind::Complex(_), InputValue::Literal(_)) => {
                    return Err(WpsError::invalid(identifier, "expected complex data"));
                }
                (DataKind::Complex(_), InputValue::Untyped(data)) => InputValue::Complex {
                    data,
                    mime_type: None,
                },
                (DataKind::Complex(formats), InputValue::Complex { data, mime_type }) => {
                    if let Some(mime) = &mime_type {
                        if !formats.iter().any(|f| f.mime_type.eq_ignore_ascii_case(mime)) {
                            return Err(WpsError::invalid(
                                identifier,
                                format!("unsupported mime type {}", mime),
                            ));
                        }
                    }
                    InputValue::Complex { data, mime_type }
                }
            };

            if inputs.insert(identifier.clone(), value).is_some() {
                return Err(WpsError::invalid(identifier, "input given more than once"));
            }
        }

        if let Some(missing) = self
            .inputs
            .iter()
            .find(|i| i.min_occurs > 0 && !inputs.contains_key(&i.identifier))
        {
            return Err(WpsError::missing(missing.identifier.as_str()));
        }

        Ok(ProcessRequest { inputs })
    }
}

/// Raw or bound value of a single input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    /// `wps:LiteralData`.
    Literal(String),
    /// KVP value without a `mimeType` attribute; binds as either kind.
    Untyped(String),
    Complex {
        data: String,
        mime_type: Option<String>,
    },
}

/// Validated inputs of a single Execute call.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    inputs: HashMap<String, InputValue>,
}

impl ProcessRequest {
    /// The value of a literal input.
    pub fn literal(&self, identifier: &str) -> Result<&str> {
        match self.inputs.get(identifier) {
            Some(InputValue::Literal(v)) | Some(InputValue::Untyped(v)) => Ok(v),
            Some(InputValue::Complex { .. }) => {
                Err(WpsError::invalid(identifier, "expected literal data"))
            }
            None => Err(WpsError::missing(identifier)),
        }
    }

    /// The inline document of a complex input.
    pub fn complex(&self, identifier: &str) -> Result<&str> {
        match self.inputs.get(identifier) {
            Some(InputValue::Complex { data, .. }) | Some(InputValue::Untyped(data)) => Ok(data),
            Some(InputValue::Literal(_)) => {
                Err(WpsError::invalid(identifier, "expected complex data"))
            }
            None => Err(WpsError::missing(identifier)),
        }
    }
}

/// Value produced for a single output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    Literal(String),
    /// A file served elsewhere, returned by URL.
    Reference { href: String, mime_type: String },
}

/// Outputs produced by a process, in the order the handler set them.
#[derive(Debug, Clone, Default)]
pub struct ProcessResponse {
    pub outputs: Vec<(String, OutputValue)>,
}

impl ProcessResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, identifier: &str, value: OutputValue) -> Self {
        self.outputs.push((identifier.to_string(), value));
        self
    }

    pub fn output(&self, identifier: &str) -> Option<&OutputValue> {
        self.outputs
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, v)| v)
    }
}

/// Service resources available to a running handler.
pub struct ProcessContext<'a> {
    /// Root URL of the service as seen by the client, ending in `/`.
    pub base_url: &'a Url,
    pub data_files: &'a DataFileCache,
    pub converter: &'a Ogr2Ogr,
    /// Parent for scratch directories; the system temp dir if `None`.
    pub work_dir: Option<&'a Path>,
}

impl ProcessContext<'_> {
    /// Absolute URL at which a stored data file can be fetched.
    pub fn datafile_url(&self, id: &uuid::Uuid) -> Result<Url> {
        Ok(self.base_url.join(&format!("datafile/{}", id))?)
    }
}

/// Signature shared by all process handlers.
pub type Handler = fn(&ProcessRequest, &ProcessContext<'_>) -> Result<ProcessResponse>;

/// A registered process.
#[derive(Clone)]
pub struct Process {
    description: ProcessDescription,
    handler: Handler,
}

impl Process {
    pub fn new(description: ProcessDescription, handler: Handler) -> Self {
        Self {
            description,
            handler,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.description.identifier
    }

    pub fn description(&self) -> &ProcessDescription {
        &self.description
    }

    /// Bind `raw` inputs and run the handler.
    pub fn execute(
        &self,
        raw: Vec<(String, InputValue)>,
        ctx: &ProcessContext<'_>,
    ) -> Result<ProcessResponse> {
        let request = self.description.bind_inputs(raw)?;
        (self.handler)(&request, ctx)
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("identifier", &self.description.identifier)
            .finish_non_exhaustive()
    }
}
