//! Centroid replacement for GeoJSON features.
//!
//! GeoJSON geometries are converted to `geo` types and reduced with
//! [`geo::Centroid`]; the resulting points are converted back. Feature ids,
//! properties and foreign members are left untouched.
//!
//! # Example
//!
//! ```ignore
//! use geojson::FeatureCollection;
//! use geowps::centroid::replace_with_centroids;
//!
//! let mut collection: FeatureCollection = r#"{
//!     "type": "FeatureCollection",
//!     "features": [{
//!         "type": "Feature",
//!         "properties": {"name": "square"},
//!         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}
//!     }]
//! }"#.parse()?;
//!
//! replace_with_centroids(&mut collection)?;
//! // The square is now {"type": "Point", "coordinates": [1.0, 1.0]}
//! ```

use geo::Centroid;
use geojson::{FeatureCollection, Geometry, Value as GeoJsonValue};

use crate::error::{Result, WpsError};

/// Centroid of a single GeoJSON geometry.
///
/// Returns `None` for empty geometries, which have no centroid.
///
/// # Errors
///
/// Returns an error if any position has fewer than two coordinates, or the
/// geometry cannot otherwise be converted to a `geo` geometry.
pub fn centroid_of(geometry: &Geometry) -> Result<Option<Geometry>> {
    check_positions(&geometry.value)?;
    let shape: geo::Geometry<f64> = geometry.clone().try_into()?;

    Ok(shape
        .centroid()
        .map(|point| Geometry::new(GeoJsonValue::from(&point))))
}

/// Replace the geometry of every feature with its centroid.
///
/// Features without a geometry, or whose geometry is empty, end up with a
/// null geometry.
///
/// # Errors
///
/// Fails on the first geometry that cannot be converted; the collection may
/// then be partially rewritten.
pub fn replace_with_centroids(collection: &mut FeatureCollection) -> Result<()> {
    for feature in &mut collection.features {
        feature.geometry = match feature.geometry.take() {
            Some(geometry) => centroid_of(&geometry)?,
            None => None,
        };
    }
    Ok(())
}

/// Reject positions the `geo` conversion would index out of bounds.
fn check_positions(value: &GeoJsonValue) -> Result<()> {
    fn check(position: &[f64]) -> Result<()> {
        if position.len() < 2 {
            return Err(WpsError::InvalidGeometry(format!(
                "position {:?} has fewer than 2 coordinates",
                position
            )));
        }
        Ok(())
    }

    match value {
        GeoJsonValue::Point(p) => check(p),
        GeoJsonValue::MultiPoint(ps) | GeoJsonValue::LineString(ps) => {
            ps.iter().try_for_each(|p| check(p))
        }
        GeoJsonValue::MultiLineString(lines) | GeoJsonValue::Polygon(lines) => {
            lines.iter().flatten().try_for_each(|p| check(p))
        }
        GeoJsonValue::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .try_for_each(|p| check(p)),
        GeoJsonValue::GeometryCollection(geometries) => geometries
            .iter()
            .try_for_each(|g| check_positions(&g.value)),
    }
}
