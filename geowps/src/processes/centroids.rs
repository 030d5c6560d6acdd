//! Centroid process: converts a GML layer to GeoJSON with `ogr2ogr`, reduces
//! every feature to its centroid and publishes the result as a data file.
//!
//! All intermediate files live in a per-call temporary directory that is
//! removed when the call returns, whether it succeeded or not.

use std::fs;

use geojson::{FeatureCollection, GeoJson};
use tempfile::TempDir;

use crate::centroid::replace_with_centroids;
use crate::datafile::DataFile;
use crate::error::Result;
use crate::process::{
    Format, InputDescription, OutputDescription, OutputValue, ProcessContext, ProcessDescription,
    ProcessRequest, ProcessResponse,
};

pub const IDENTIFIER: &str = "centroids";

/// Media type of the published result.
pub const OUTPUT_MIME_TYPE: &str = "application/json";

pub fn description() -> ProcessDescription {
    ProcessDescription {
        identifier: IDENTIFIER.to_string(),
        title: "Centroids".to_string(),
        abstract_text: Some(
            "Replaces every feature geometry of a GML layer with its centroid and returns \
             the result as GeoJSON."
                .to_string(),
        ),
        version: "1.0".to_string(),
        inputs: vec![InputDescription::complex(
            "layer",
            "GML layer",
            vec![Format::new("text/xml")],
        )],
        outputs: vec![OutputDescription::complex(
            "centroids_layer",
            "Centroids as GeoJSON",
            vec![Format::new(OUTPUT_MIME_TYPE)],
        )],
    }
}

/// Convert a GML document to a GeoJSON feature collection.
///
/// The document is written to `input.gml` in a fresh temporary directory
/// and converted to `input.geojson` beside it.
pub fn convert_layer(gml: &str, ctx: &ProcessContext<'_>) -> Result<FeatureCollection> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("geowps-centroids-");
    let tmp: TempDir = match ctx.work_dir {
        Some(dir) => builder.tempdir_in(dir)?,
        None => builder.tempdir()?,
    };

    let input_gml = tmp.path().join("input.gml");
    fs::write(&input_gml, gml.as_bytes())?;

    let input_geojson = tmp.path().join("input.geojson");
    ctx.converter.to_geojson(&input_gml, &input_geojson)?;

    let text = fs::read_to_string(&input_geojson)?;
    let collection = FeatureCollection::try_from(text.parse::<GeoJson>()?)?;

    Ok(collection)
}

pub fn run(request: &ProcessRequest, ctx: &ProcessContext<'_>) -> Result<ProcessResponse> {
    let mut collection = convert_layer(request.complex("layer")?, ctx)?;
    replace_with_centroids(&mut collection)?;

    let payload = serde_json::to_string_pretty(&collection)?;
    let file = ctx.data_files.put(DataFile::new(payload, OUTPUT_MIME_TYPE));
    let href = ctx.datafile_url(&file.id)?;

    tracing::info!(
        id = %file.id,
        features = collection.features.len(),
        bytes = file.payload.len(),
        "Stored centroids layer"
    );

    Ok(ProcessResponse::new().with_output(
        "centroids_layer",
        OutputValue::Reference {
            href: href.to_string(),
            mime_type: file.media_type.clone(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datafile::DataFileCache;
    use crate::ogr::Ogr2Ogr;
    use crate::process::InputValue;
    use crate::WpsError;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use url::Url;

    const LAYER: &str = r#"<ogr:FeatureCollection xmlns:ogr="http://ogr.maptools.org/" xmlns:gml="http://www.opengis.net/gml"/>"#;

    const CONVERTED: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "square"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}},
            {"type": "Feature", "properties": {"name": "road"},
             "geometry": {"type": "LineString", "coordinates": [[0,0],[4,0]]}}
        ]
    }"#;

    /// Write a converter stand-in that copies `geojson` to its output argument.
    #[cfg(unix)]
    fn fake_converter(dir: &Path, geojson: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let fixture = dir.join("fixture.geojson");
        fs::write(&fixture, geojson).unwrap();

        let script = dir.join("fake-ogr2ogr");
        fs::write(
            &script,
            format!("#!/bin/sh\ncp '{}' \"$3\"\n", fixture.display()),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn request() -> ProcessRequest {
        description()
            .bind_inputs(vec![(
                "layer".to_string(),
                InputValue::Complex {
                    data: LAYER.to_string(),
                    mime_type: Some("text/xml".to_string()),
                },
            )])
            .unwrap()
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[cfg(unix)]
    #[test]
    fn test_run_stores_centroids() {
        let scratch = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        let converter = Ogr2Ogr::new(fake_converter(tools.path(), CONVERTED));
        let base_url = Url::parse("http://example.com:8080/").unwrap();
        let data_files = DataFileCache::default();
        let ctx = ProcessContext {
            base_url: &base_url,
            data_files: &data_files,
            converter: &converter,
            work_dir: Some(scratch.path()),
        };

        let response = run(&request(), &ctx).unwrap();

        let (href, mime_type) = match response.output("centroids_layer") {
            Some(OutputValue::Reference { href, mime_type }) => (href.clone(), mime_type.clone()),
            other => panic!("Expected reference output, got {:?}", other),
        };
        assert_eq!(mime_type, "application/json");
        assert!(href.starts_with("http://example.com:8080/datafile/"));

        let id = data_files.ids()[0];
        assert!(href.ends_with(&id.to_string()));

        let file = data_files.find(&id).unwrap();
        assert_eq!(file.media_type, "application/json");

        let json: serde_json::Value = serde_json::from_slice(&file.payload).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            serde_json::json!([1.0, 1.0])
        );
        assert_eq!(features[0]["properties"]["name"], "square");
        assert_eq!(
            features[1]["geometry"]["coordinates"],
            serde_json::json!([2.0, 0.0])
        );

        // Output is indented
        assert!(String::from_utf8_lossy(&file.payload).contains("\n  "));

        // Scratch directory removed
        assert_eq!(entries(scratch.path()), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_conversion_removes_temp_dir() {
        let scratch = TempDir::new().unwrap();
        let converter = Ogr2Ogr::new("false");
        let base_url = Url::parse("http://localhost:5000/").unwrap();
        let data_files = DataFileCache::default();
        let ctx = ProcessContext {
            base_url: &base_url,
            data_files: &data_files,
            converter: &converter,
            work_dir: Some(scratch.path()),
        };

        let err = run(&request(), &ctx).unwrap_err();

        assert!(matches!(err, WpsError::ConversionFailed { .. }));
        assert_eq!(entries(scratch.path()), 0);
        assert!(data_files.is_empty());
    }

    #[test]
    fn test_missing_converter_removes_temp_dir() {
        let scratch = TempDir::new().unwrap();
        let converter = Ogr2Ogr::new(scratch.path().join("missing-ogr2ogr"));
        let work_dir = scratch.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        let base_url = Url::parse("http://localhost:5000/").unwrap();
        let data_files = DataFileCache::default();
        let ctx = ProcessContext {
            base_url: &base_url,
            data_files: &data_files,
            converter: &converter,
            work_dir: Some(&work_dir),
        };

        let err = run(&request(), &ctx).unwrap_err();

        assert!(matches!(err, WpsError::ConverterUnavailable { .. }));
        assert_eq!(entries(&work_dir), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_converter_output_not_a_collection() {
        let scratch = TempDir::new().unwrap();
        let tools = TempDir::new().unwrap();
        let converter = Ogr2Ogr::new(fake_converter(
            tools.path(),
            r#"{"type": "Point", "coordinates": [1, 2]}"#,
        ));
        let base_url = Url::parse("http://localhost:5000/").unwrap();
        let data_files = DataFileCache::default();
        let ctx = ProcessContext {
            base_url: &base_url,
            data_files: &data_files,
            converter: &converter,
            work_dir: Some(scratch.path()),
        };

        assert!(run(&request(), &ctx).is_err());
        assert_eq!(entries(scratch.path()), 0);
    }
}
