//! The processes offered by the service.
//!
//! | Identifier | Inputs | Output |
//! |------------|--------|--------|
//! | `say_hello` | `name` (string) | `message` (string) |
//! | `feature_count` | `layer` (GML) | `count` (string) |
//! | `centroids` | `layer` (GML) | `centroids_layer` (GeoJSON reference) |

pub mod centroids;
pub mod feature_count;
pub mod say_hello;

use crate::process::Process;

/// Every process, in the order they are advertised.
pub fn all() -> Vec<Process> {
    vec![
        Process::new(say_hello::description(), say_hello::run),
        Process::new(feature_count::description(), feature_count::run),
        Process::new(centroids::description(), centroids::run),
    ]
}
