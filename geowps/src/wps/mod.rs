//! OGC WPS 1.0.0 protocol handling.
//!
//! Only the subset needed by the demo processes is implemented:
//!
//! - `GetCapabilities`, `DescribeProcess` and `Execute`
//! - KVP encoding over GET and XML encoding over POST
//! - inline literal and complex inputs (no `wps:Reference` inputs)
//! - synchronous execution with the response document returned directly

pub mod request;
pub mod response;

pub use request::{ExecuteRequest, WpsRequest};

/// Protocol version supported by the service.
pub const VERSION: &str = "1.0.0";

pub const WPS_NS: &str = "http://www.opengis.net/wps/1.0.0";
pub const OWS_NS: &str = "http://www.opengis.net/ows/1.1";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const GML_NS: &str = "http://www.opengis.net/gml";
