//! # geowps - Minimal OGC Web Processing Service
//!
//! Library side of a small WPS 1.0.0 demo server: request decoding, process
//! registry, response rendering and the processes themselves. The HTTP layer
//! lives in the `geowps-service` crate.
//!
//! ## Processes
//!
//! | Identifier      | Input                | Output                          |
//! |-----------------|----------------------|---------------------------------|
//! | `say_hello`     | `name` (string)      | `message`: `Hello <name>!`      |
//! | `feature_count` | `layer` (GML)        | `count`: number of features     |
//! | `centroids`     | `layer` (GML)        | `centroids_layer`: GeoJSON file |
//!
//! The centroid process shells out to GDAL's `ogr2ogr` and stores its result
//! in a bounded in-memory cache; the response carries a link to
//! `/datafile/<id>` instead of the data.
//!
//! ## Quick Start
//!
//! ```ignore
//! use geowps::WpsService;
//! use url::Url;
//!
//! let service = WpsService::new();
//! let base_url = Url::parse("http://localhost:5000/")?;
//!
//! let capabilities = service.handle_kvp("service=WPS&request=GetCapabilities", &base_url)?;
//! println!("{}", capabilities);
//! ```

pub mod centroid;
pub mod datafile;
pub mod error;
pub mod ogr;
pub mod process;
pub mod processes;
pub mod service;
pub mod wps;

// Re-export main types at crate root for convenience
pub use datafile::{DataFile, DataFileCache};
pub use error::{Result, WpsError};
pub use ogr::Ogr2Ogr;
pub use process::{Process, ProcessDescription, ProcessResponse};
pub use service::{WpsService, WpsServiceBuilder};
pub use wps::{ExecuteRequest, WpsRequest};
