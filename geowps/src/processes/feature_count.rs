//! Feature-count process: counts `gml:featureMember` elements in a layer.

use crate::error::Result;
use crate::process::{
    Format, InputDescription, LiteralType, OutputDescription, OutputValue, ProcessContext,
    ProcessDescription, ProcessRequest, ProcessResponse,
};
use crate::wps::GML_NS;

pub const IDENTIFIER: &str = "feature_count";

pub fn description() -> ProcessDescription {
    ProcessDescription {
        identifier: IDENTIFIER.to_string(),
        title: "Feature Count".to_string(),
        abstract_text: Some("Counts the features of a GML layer.".to_string()),
        version: "1.0".to_string(),
        inputs: vec![InputDescription::complex(
            "layer",
            "GML layer",
            vec![Format::new("text/xml")],
        )],
        outputs: vec![OutputDescription::literal(
            "count",
            "Number of features",
            LiteralType::String,
        )],
    }
}

/// Count the elements matching `//gml:featureMember` in `document`.
///
/// Only the GML 2/3.1 namespace (`http://www.opengis.net/gml`) is matched;
/// prefixes are resolved, so any prefix bound to that namespace counts.
///
/// # Errors
///
/// Returns [`crate::WpsError::InvalidXml`] if the document is not well formed.
pub fn count_features(document: &str) -> Result<usize> {
    let doc = roxmltree::Document::parse(document)?;

    Ok(doc
        .descendants()
        .filter(|node| {
            node.is_element()
                && node.tag_name().name() == "featureMember"
                && node.tag_name().namespace() == Some(GML_NS)
        })
        .count())
}

pub fn run(request: &ProcessRequest, _ctx: &ProcessContext<'_>) -> Result<ProcessResponse> {
    let count = count_features(request.complex("layer")?)?;
    tracing::debug!(count, "Counted features");
    Ok(ProcessResponse::new().with_output("count", OutputValue::Literal(count.to_string())))
}
