//! Parsing of WPS requests from KVP query strings and XML documents.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use roxmltree::{Document, Node};

use super::{OWS_NS, VERSION, WPS_NS};
use crate::error::{Result, WpsError};
use crate::process::InputValue;

/// A decoded WPS request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WpsRequest {
    GetCapabilities,
    DescribeProcess { identifiers: Vec<String> },
    Execute(ExecuteRequest),
}

/// Identifier and raw inputs of an Execute request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub identifier: String,
    pub inputs: Vec<(String, InputValue)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    GetCapabilities,
    DescribeProcess,
    Execute,
}

impl Operation {
    fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "getcapabilities" => Ok(Operation::GetCapabilities),
            "describeprocess" => Ok(Operation::DescribeProcess),
            "execute" => Ok(Operation::Execute),
            _ => Err(WpsError::OperationNotSupported {
                operation: name.to_string(),
            }),
        }
    }
}

impl WpsRequest {
    /// Name of the operation, as used in the `request` parameter.
    pub fn operation(&self) -> &'static str {
        match self {
            WpsRequest::GetCapabilities => "GetCapabilities",
            WpsRequest::DescribeProcess { .. } => "DescribeProcess",
            WpsRequest::Execute(_) => "Execute",
        }
    }

    /// Decode a KVP-encoded request from a raw (still percent-encoded) query
    /// string.
    ///
    /// Parameter names are case-insensitive; the first occurrence wins.
    /// `DataInputs` is a `;`-separated list of `identifier=value` pairs, each
    /// value optionally followed by `@attribute=value` pairs. A `mimeType`
    /// attribute marks the value as complex data.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let request = WpsRequest::from_kvp(
    ///     "service=WPS&version=1.0.0&request=Execute&identifier=say_hello&DataInputs=name%3DWorld",
    /// )?;
    /// ```
    pub fn from_kvp(query: &str) -> Result<Self> {
        let mut params: HashMap<String, String> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.to_ascii_lowercase())
                .or_insert_with(|| value.into_owned());
        }
        let param = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        check_service(param("service"))?;
        let operation =
            Operation::parse(param("request").ok_or_else(|| WpsError::missing("request"))?)?;
        if operation != Operation::GetCapabilities {
            check_version(param("version"))?;
        }

        match operation {
            Operation::GetCapabilities => Ok(WpsRequest::GetCapabilities),
            Operation::DescribeProcess => {
                let identifiers = split_identifiers(
                    param("identifier").ok_or_else(|| WpsError::missing("identifier"))?,
                );
                if identifiers.is_empty() {
                    return Err(WpsError::missing("identifier"));
                }
                Ok(WpsRequest::DescribeProcess { identifiers })
            }
            Operation::Execute => {
                let identifier = param("identifier")
                    .ok_or_else(|| WpsError::missing("identifier"))?
                    .to_string();
                // Values are not trimmed; only the parameter itself is checked
                let inputs = match params.get("datainputs") {
                    Some(data_inputs) => parse_data_inputs(data_inputs)?,
                    None => Vec::new(),
                };
                Ok(WpsRequest::Execute(ExecuteRequest { identifier, inputs }))
            }
        }
    }

    /// Decode an XML-encoded request (the body of a POST).
    ///
    /// Complex inputs given as inline XML are extracted as standalone
    /// documents: namespace declarations inherited from the request are
    /// copied onto the extracted root element.
    pub fn from_xml(body: &str) -> Result<Self> {
        let doc = Document::parse(body).map_err(|e| {
            WpsError::invalid("request", format!("request body is not well-formed XML: {}", e))
        })?;
        let root = doc.root_element();

        let operation = if root.tag_name().namespace() == Some(WPS_NS) {
            Operation::parse(root.tag_name().name())?
        } else {
            return Err(WpsError::OperationNotSupported {
                operation: root.tag_name().name().to_string(),
            });
        };
        check_service(root.attribute("service"))?;
        if operation != Operation::GetCapabilities {
            check_version(root.attribute("version"))?;
        }

        match operation {
            Operation::GetCapabilities => Ok(WpsRequest::GetCapabilities),
            Operation::DescribeProcess => {
                let identifiers: Vec<String> = root
                    .children()
                    .filter(|n| is_element(n, OWS_NS, "Identifier"))
                    .map(|n| text_content(&n).trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect();
                if identifiers.is_empty() {
                    return Err(WpsError::missing("identifier"));
                }
                Ok(WpsRequest::DescribeProcess { identifiers })
            }
            Operation::Execute => {
                let identifier = child(&root, OWS_NS, "Identifier")
                    .map(|n| text_content(&n).trim().to_string())
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| WpsError::missing("identifier"))?;

                let inputs = match child(&root, WPS_NS, "DataInputs") {
                    Some(data_inputs) => data_inputs
                        .children()
                        .filter(|n| is_element(n, WPS_NS, "Input"))
                        .map(|n| parse_input(&n, body))
                        .collect::<Result<Vec<_>>>()?,
                    None => Vec::new(),
                };

                Ok(WpsRequest::Execute(ExecuteRequest { identifier, inputs }))
            }
        }
    }
}

fn check_service(service: Option<&str>) -> Result<()> {
    match service {
        None => Err(WpsError::missing("service")),
        Some(s) if s.trim().eq_ignore_ascii_case("WPS") => Ok(()),
        Some(s) => Err(WpsError::invalid("service", format!("unknown service {}", s))),
    }
}

fn check_version(version: Option<&str>) -> Result<()> {
    match version {
        Some(v) if v.trim() != VERSION => Err(WpsError::VersionNegotiationFailed {
            version: v.to_string(),
        }),
        _ => Ok(()),
    }
}

fn split_identifiers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Attribute names recognized after `@` in a KVP input value.
const KVP_ATTRIBUTES: &[&str] = &[
    "mimetype", "encoding", "schema", "uom", "datatype", "href", "xlink:href",
];

fn parse_data_inputs(data_inputs: &str) -> Result<Vec<(String, InputValue)>> {
    data_inputs
        .split(';')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            let (identifier, rest) = item.split_once('=').ok_or_else(|| {
                WpsError::invalid("DataInputs", format!("expected identifier=value, got {}", item))
            })?;
            let identifier = identifier.trim().to_string();

            // '@' only separates attributes when followed by a known name and '='
            let mut pieces = rest.split('@');
            let mut value = pieces.next().unwrap_or_default().to_string();
            let mut attributes: HashMap<String, String> = HashMap::new();
            for piece in pieces {
                match piece.split_once('=') {
                    Some((name, attr))
                        if KVP_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str()) =>
                    {
                        attributes.insert(name.to_ascii_lowercase(), attr.to_string());
                    }
                    _ => {
                        value.push('@');
                        value.push_str(piece);
                    }
                }
            }

            if attributes.contains_key("href") || attributes.contains_key("xlink:href") {
                return Err(WpsError::invalid(
                    identifier,
                    "reference inputs are not supported",
                ));
            }

            let value = match attributes.remove("mimetype") {
                Some(mime_type) => InputValue::Complex {
                    data: value,
                    mime_type: Some(mime_type),
                },
                None => InputValue::Untyped(value),
            };
            Ok((identifier, value))
        })
        .collect()
}

fn parse_input(input: &Node<'_, '_>, source: &str) -> Result<(String, InputValue)> {
    let identifier = child(input, OWS_NS, "Identifier")
        .map(|n| text_content(&n).trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WpsError::missing("Input/Identifier"))?;

    if child(input, WPS_NS, "Reference").is_some() {
        return Err(WpsError::invalid(
            identifier,
            "reference inputs are not supported",
        ));
    }

    let data = match child(input, WPS_NS, "Data") {
        Some(data) => data,
        None => return Err(WpsError::missing(identifier)),
    };

    if let Some(literal) = child(&data, WPS_NS, "LiteralData") {
        return Ok((identifier, InputValue::Literal(text_content(&literal))));
    }

    if let Some(complex) = child(&data, WPS_NS, "ComplexData") {
        let mime_type = complex.attribute("mimeType").map(str::to_string);
        let data = match complex.children().find(|n| n.is_element()) {
            Some(element) => standalone_fragment(&element, source)?,
            None => text_content(&complex),
        };
        return Ok((identifier, InputValue::Complex { data, mime_type }));
    }

    Err(WpsError::invalid(
        identifier,
        "expected LiteralData or ComplexData",
    ))
}

fn is_element(node: &Node<'_, '_>, namespace: &str, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(namespace)
}

fn child<'a, 'input>(
    node: &Node<'a, 'input>,
    namespace: &str,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(n, namespace, name))
}

/// Concatenated text and CDATA children of `node`.
fn text_content(node: &Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Source text of `element`, with every in-scope namespace it does not
/// declare itself added to its start tag.
fn standalone_fragment(element: &Node<'_, '_>, source: &str) -> Result<String> {
    let fragment = &source[element.range()];

    // Attribute values may contain '>', so the start tag is tokenized properly
    let mut reader = Reader::from_str(fragment);
    let start = match reader.read_event() {
        Ok(Event::Start(start)) | Ok(Event::Empty(start)) => start,
        Ok(_) => return Err(WpsError::Xml("expected a start tag".to_string())),
        Err(e) => return Err(WpsError::Xml(e.to_string())),
    };
    let name_end = 1 + start.name().as_ref().len();
    let declared: Vec<Vec<u8>> = start
        .attributes()
        .with_checks(false)
        .filter_map(|attribute| attribute.ok())
        .map(|attribute| attribute.key.as_ref().to_vec())
        .collect();

    let mut declarations = String::new();
    for ns in element.namespaces() {
        let attribute = match ns.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        if !declared.iter().any(|key| key.as_slice() == attribute.as_bytes()) {
            declarations.push_str(&format!(
                " {}=\"{}\"",
                attribute,
                quick_xml::escape::escape(ns.uri())
            ));
        }
    }

    Ok(format!(
        "{}{}{}",
        &fragment[..name_end],
        declarations,
        &fragment[name_end..]
    ))
}
