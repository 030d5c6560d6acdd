//! Rendering of WPS 1.0.0 response documents.

use chrono::{SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use url::Url;

use super::{OWS_NS, VERSION, WPS_NS, XLINK_NS, XSI_NS};
use crate::error::{Result, WpsError};
use crate::process::{
    DataKind, Format, InputDescription, OutputDescription, OutputValue, Process,
    ProcessDescription, ProcessResponse,
};

const LANGUAGE: &str = "en-US";
const SERVICE_TITLE: &str = "GeoWPS demo service";

/// Thin wrapper over a quick-xml writer producing an indented document.
struct XmlDoc {
    writer: Writer<Vec<u8>>,
}

impl XmlDoc {
    fn new() -> Result<Self> {
        let mut doc = Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        };
        doc.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(doc)
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| WpsError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Empty(element))
    }

    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attributes)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| WpsError::Xml(e.to_string()))
    }
}

/// Namespace and version attributes shared by every WPS root element.
fn root_attributes<'a>(schema: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("xmlns:wps", WPS_NS),
        ("xmlns:ows", OWS_NS),
        ("xmlns:xlink", XLINK_NS),
        ("xmlns:xsi", XSI_NS),
        ("xsi:schemaLocation", schema),
        ("service", "WPS"),
        ("version", VERSION),
        ("xml:lang", LANGUAGE),
    ]
}

/// URL of the WPS endpoint for a service rooted at `base_url`.
pub fn endpoint_url(base_url: &Url) -> Result<Url> {
    Ok(base_url.join("wps")?)
}

/// Render the `wps:Capabilities` document.
pub fn capabilities(processes: &[Process], base_url: &Url) -> Result<String> {
    let endpoint = endpoint_url(base_url)?;
    let get_href = format!("{}?", endpoint);

    let mut doc = XmlDoc::new()?;
    let mut attributes = root_attributes(
        "http://www.opengis.net/wps/1.0.0 http://schemas.opengis.net/wps/1.0.0/wpsGetCapabilities_response.xsd",
    );
    attributes.push(("updateSequence", "1"));
    doc.start("wps:Capabilities", &attributes)?;

    doc.start("ows:ServiceIdentification", &[])?;
    doc.text_element("ows:Title", &[], SERVICE_TITLE)?;
    doc.text_element(
        "ows:Abstract",
        &[],
        "Echo, GML feature counting and centroid extraction.",
    )?;
    doc.text_element("ows:ServiceType", &[], "WPS")?;
    doc.text_element("ows:ServiceTypeVersion", &[], VERSION)?;
    doc.end("ows:ServiceIdentification")?;

    doc.start("ows:OperationsMetadata", &[])?;
    for operation in ["GetCapabilities", "DescribeProcess", "Execute"] {
        doc.start("ows:Operation", &[("name", operation)])?;
        doc.start("ows:DCP", &[])?;
        doc.start("ows:HTTP", &[])?;
        doc.empty("ows:Get", &[("xlink:href", get_href.as_str())])?;
        doc.empty("ows:Post", &[("xlink:href", endpoint.as_str())])?;
        doc.end("ows:HTTP")?;
        doc.end("ows:DCP")?;
        doc.end("ows:Operation")?;
    }
    doc.end("ows:OperationsMetadata")?;

    doc.start("wps:ProcessOfferings", &[])?;
    for process in processes {
        let description = process.description();
        doc.start(
            "wps:Process",
            &[("wps:processVersion", description.version.as_str())],
        )?;
        doc.text_element("ows:Identifier", &[], &description.identifier)?;
        doc.text_element("ows:Title", &[], &description.title)?;
        if let Some(abstract_text) = &description.abstract_text {
            doc.text_element("ows:Abstract", &[], abstract_text)?;
        }
        doc.end("wps:Process")?;
    }
    doc.end("wps:ProcessOfferings")?;

    doc.start("wps:Languages", &[])?;
    doc.start("wps:Default", &[])?;
    doc.text_element("ows:Language", &[], LANGUAGE)?;
    doc.end("wps:Default")?;
    doc.start("wps:Supported", &[])?;
    doc.text_element("ows:Language", &[], LANGUAGE)?;
    doc.end("wps:Supported")?;
    doc.end("wps:Languages")?;

    doc.end("wps:Capabilities")?;
    doc.finish()
}

/// Render `wps:ProcessDescriptions` for the given processes.
pub fn process_descriptions(descriptions: &[&ProcessDescription]) -> Result<String> {
    let mut doc = XmlDoc::new()?;
    doc.start(
        "wps:ProcessDescriptions",
        &root_attributes(
            "http://www.opengis.net/wps/1.0.0 http://schemas.opengis.net/wps/1.0.0/wpsDescribeProcess_response.xsd",
        ),
    )?;

    for description in descriptions {
        doc.start(
            "ProcessDescription",
            &[
                ("wps:processVersion", description.version.as_str()),
                ("storeSupported", "false"),
                ("statusSupported", "false"),
            ],
        )?;
        doc.text_element("ows:Identifier", &[], &description.identifier)?;
        doc.text_element("ows:Title", &[], &description.title)?;
        if let Some(abstract_text) = &description.abstract_text {
            doc.text_element("ows:Abstract", &[], abstract_text)?;
        }

        doc.start("DataInputs", &[])?;
        for input in &description.inputs {
            write_input(&mut doc, input)?;
        }
        doc.end("DataInputs")?;

        doc.start("ProcessOutputs", &[])?;
        for output in &description.outputs {
            write_output_description(&mut doc, output)?;
        }
        doc.end("ProcessOutputs")?;

        doc.end("ProcessDescription")?;
    }

    doc.end("wps:ProcessDescriptions")?;
    doc.finish()
}

fn write_input(doc: &mut XmlDoc, input: &InputDescription) -> Result<()> {
    let min_occurs = input.min_occurs.to_string();
    doc.start(
        "Input",
        &[("minOccurs", min_occurs.as_str()), ("maxOccurs", "1")],
    )?;
    doc.text_element("ows:Identifier", &[], &input.identifier)?;
    doc.text_element("ows:Title", &[], &input.title)?;
    match &input.kind {
        DataKind::Literal(data_type) => {
            doc.start("LiteralData", &[])?;
            doc.text_element(
                "ows:DataType",
                &[("ows:reference", data_type.reference())],
                data_type.as_str(),
            )?;
            doc.empty("ows:AnyValue", &[])?;
            doc.end("LiteralData")?;
        }
        DataKind::Complex(formats) => {
            doc.start("ComplexData", &[])?;
            write_formats(doc, formats)?;
            doc.end("ComplexData")?;
        }
    }
    doc.end("Input")
}

fn write_output_description(doc: &mut XmlDoc, output: &OutputDescription) -> Result<()> {
    doc.start("Output", &[])?;
    doc.text_element("ows:Identifier", &[], &output.identifier)?;
    doc.text_element("ows:Title", &[], &output.title)?;
    match &output.kind {
        DataKind::Literal(data_type) => {
            doc.start("LiteralOutput", &[])?;
            doc.text_element(
                "ows:DataType",
                &[("ows:reference", data_type.reference())],
                data_type.as_str(),
            )?;
            doc.end("LiteralOutput")?;
        }
        DataKind::Complex(formats) => {
            doc.start("ComplexOutput", &[])?;
            write_formats(doc, formats)?;
            doc.end("ComplexOutput")?;
        }
    }
    doc.end("Output")
}

fn write_formats(doc: &mut XmlDoc, formats: &[Format]) -> Result<()> {
    if let Some(default) = formats.first() {
        doc.start("Default", &[])?;
        write_format(doc, default)?;
        doc.end("Default")?;
    }
    doc.start("Supported", &[])?;
    for format in formats {
        write_format(doc, format)?;
    }
    doc.end("Supported")
}

fn write_format(doc: &mut XmlDoc, format: &Format) -> Result<()> {
    doc.start("Format", &[])?;
    doc.text_element("MimeType", &[], &format.mime_type)?;
    doc.end("Format")
}

/// Render the `wps:ExecuteResponse` of a successful synchronous execution.
pub fn execute_response(
    description: &ProcessDescription,
    response: &ProcessResponse,
    base_url: &Url,
) -> Result<String> {
    let endpoint = endpoint_url(base_url)?;
    let service_instance = format!("{}?service=WPS&request=GetCapabilities", endpoint);
    let creation_time = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut doc = XmlDoc::new()?;
    let mut attributes = root_attributes(
        "http://www.opengis.net/wps/1.0.0 http://schemas.opengis.net/wps/1.0.0/wpsExecute_response.xsd",
    );
    attributes.push(("serviceInstance", service_instance.as_str()));
    doc.start("wps:ExecuteResponse", &attributes)?;

    doc.start(
        "wps:Process",
        &[("wps:processVersion", description.version.as_str())],
    )?;
    doc.text_element("ows:Identifier", &[], &description.identifier)?;
    doc.text_element("ows:Title", &[], &description.title)?;
    doc.end("wps:Process")?;

    doc.start("wps:Status", &[("creationTime", creation_time.as_str())])?;
    doc.text_element(
        "wps:ProcessSucceeded",
        &[],
        &format!("Process {} finished successfully", description.identifier),
    )?;
    doc.end("wps:Status")?;

    doc.start("wps:ProcessOutputs", &[])?;
    for (identifier, value) in &response.outputs {
        let title = description
            .output(identifier)
            .map(|o| o.title.as_str())
            .unwrap_or(identifier.as_str());
        doc.start("wps:Output", &[])?;
        doc.text_element("ows:Identifier", &[], identifier)?;
        doc.text_element("ows:Title", &[], title)?;
        match value {
            OutputValue::Literal(text) => {
                let data_type = match description.output(identifier).map(|o| &o.kind) {
                    Some(DataKind::Literal(data_type)) => data_type.as_str(),
                    _ => "string",
                };
                doc.start("wps:Data", &[])?;
                doc.text_element("wps:LiteralData", &[("dataType", data_type)], text)?;
                doc.end("wps:Data")?;
            }
            OutputValue::Reference { href, mime_type } => {
                doc.empty(
                    "wps:Reference",
                    &[("href", href.as_str()), ("mimeType", mime_type.as_str())],
                )?;
            }
        }
        doc.end("wps:Output")?;
    }
    doc.end("wps:ProcessOutputs")?;

    doc.end("wps:ExecuteResponse")?;
    doc.finish()
}

/// Render an `ows:ExceptionReport` for `error`.
///
/// Client errors always carry their message. Processing errors carry the
/// full error chain only when `detailed` is set; otherwise the text is
/// generic so internal paths do not leak to clients.
pub fn exception_report(error: &WpsError, detailed: bool) -> String {
    let text = if error.is_client_error() || detailed {
        error_chain(error)
    } else {
        "Process failed, see server log for details".to_string()
    };

    render_exception_report(error, &text).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to render exception report");
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ows:ExceptionReport xmlns:ows=\"{}\" version=\"{}\"><ows:Exception exceptionCode=\"NoApplicableCode\"/></ows:ExceptionReport>",
            OWS_NS, VERSION
        )
    })
}

fn render_exception_report(error: &WpsError, text: &str) -> Result<String> {
    let mut doc = XmlDoc::new()?;
    doc.start(
        "ows:ExceptionReport",
        &[
            ("xmlns:ows", OWS_NS),
            ("xmlns:xsi", XSI_NS),
            (
                "xsi:schemaLocation",
                "http://www.opengis.net/ows/1.1 http://schemas.opengis.net/ows/1.1.0/owsExceptionReport.xsd",
            ),
            ("version", VERSION),
            ("xml:lang", LANGUAGE),
        ],
    )?;

    let mut attributes = vec![("exceptionCode", error.exception_code())];
    if let Some(locator) = error.locator() {
        attributes.push(("locator", locator));
    }
    doc.start("ows:Exception", &attributes)?;
    doc.text_element("ows:ExceptionText", &[], text)?;
    doc.end("ows:Exception")?;

    doc.end("ows:ExceptionReport")?;
    doc.finish()
}

fn error_chain(error: &WpsError) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
