//! Echo process: greets the given name.

use crate::error::Result;
use crate::process::{
    InputDescription, LiteralType, OutputDescription, OutputValue, ProcessContext,
    ProcessDescription, ProcessRequest, ProcessResponse,
};

pub const IDENTIFIER: &str = "say_hello";

pub fn description() -> ProcessDescription {
    ProcessDescription {
        identifier: IDENTIFIER.to_string(),
        title: "Say Hello".to_string(),
        abstract_text: Some("Returns a greeting for the given name.".to_string()),
        version: "1.0".to_string(),
        inputs: vec![InputDescription::literal(
            "name",
            "Input name",
            LiteralType::String,
        )],
        outputs: vec![OutputDescription::literal(
            "message",
            "Greeting",
            LiteralType::String,
        )],
    }
}

/// Greeting text for `name`, which is used verbatim.
pub fn greeting(name: &str) -> String {
    format!("Hello {}!", name)
}

pub fn run(request: &ProcessRequest, _ctx: &ProcessContext<'_>) -> Result<ProcessResponse> {
    let name = request.literal("name")?;
    Ok(ProcessResponse::new().with_output("message", OutputValue::Literal(greeting(name))))
}
