//! Integration tests for the HTTP API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use geowps::{WpsService, WpsServiceBuilder};
use geowps_service::{app, AppState};
use serde_json::Value;
use tempfile::TempDir;

const LAYER: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<ogr:FeatureCollection
     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xmlns:ogr="http://ogr.maptools.org/"
     xmlns:gml="http://www.opengis.net/gml">
  <gml:featureMember>
    <ogr:parcels fid="parcels.0">
      <ogr:geometryProperty><gml:Polygon><gml:outerBoundaryIs><gml:LinearRing>
        <gml:coordinates>0,0 2,0 2,2 0,2 0,0</gml:coordinates>
      </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></ogr:geometryProperty>
      <ogr:name>a</ogr:name>
    </ogr:parcels>
  </gml:featureMember>
  <gml:featureMember>
    <ogr:parcels fid="parcels.1">
      <ogr:geometryProperty><gml:Polygon><gml:outerBoundaryIs><gml:LinearRing>
        <gml:coordinates>10,10 14,10 14,14 10,14 10,10</gml:coordinates>
      </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></ogr:geometryProperty>
      <ogr:name>b</ogr:name>
    </ogr:parcels>
  </gml:featureMember>
  <gml:featureMember>
    <ogr:parcels fid="parcels.2">
      <ogr:geometryProperty><gml:LineString>
        <gml:coordinates>0,0 4,0</gml:coordinates>
      </gml:LineString></ogr:geometryProperty>
      <ogr:name>c</ogr:name>
    </ogr:parcels>
  </gml:featureMember>
</ogr:FeatureCollection>
"#;

/// What `ogr2ogr` produces for [`LAYER`].
const LAYER_GEOJSON: &str = r#"{
"type": "FeatureCollection",
"name": "parcels",
"features": [
{ "type": "Feature", "properties": { "fid": "parcels.0", "name": "a" }, "geometry": { "type": "Polygon", "coordinates": [ [ [ 0.0, 0.0 ], [ 2.0, 0.0 ], [ 2.0, 2.0 ], [ 0.0, 2.0 ], [ 0.0, 0.0 ] ] ] } },
{ "type": "Feature", "properties": { "fid": "parcels.1", "name": "b" }, "geometry": { "type": "Polygon", "coordinates": [ [ [ 10.0, 10.0 ], [ 14.0, 10.0 ], [ 14.0, 14.0 ], [ 10.0, 14.0 ], [ 10.0, 10.0 ] ] ] } },
{ "type": "Feature", "properties": { "fid": "parcels.2", "name": "c" }, "geometry": { "type": "LineString", "coordinates": [ [ 0.0, 0.0 ], [ 4.0, 0.0 ] ] } }
]
}
"#;

fn execute_body(identifier: &str, input: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wps:Execute service="WPS" version="1.0.0"
    xmlns:wps="http://www.opengis.net/wps/1.0.0"
    xmlns:ows="http://www.opengis.net/ows/1.1">
  <ows:Identifier>{identifier}</ows:Identifier>
  <wps:DataInputs>
    <wps:Input>
      <ows:Identifier>layer</ows:Identifier>
      <wps:Data>
        <wps:ComplexData mimeType="text/xml">{input}</wps:ComplexData>
      </wps:Data>
    </wps:Input>
  </wps:DataInputs>
</wps:Execute>"#
    )
}

/// Strip the XML declaration so the layer can be embedded in a request.
fn embedded_layer() -> &'static str {
    LAYER
        .split_once("?>")
        .map(|(_, rest)| rest.trim())
        .unwrap_or(LAYER)
}

/// Create a test server around `service`.
fn create_test_server(service: WpsService) -> TestServer {
    let state = Arc::new(AppState::new(service, "localhost:5000", false).unwrap());
    TestServer::new(app(state)).unwrap()
}

/// Write a converter stand-in that copies `geojson` to its output argument.
#[cfg(unix)]
fn fake_converter(dir: &Path, geojson: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let fixture = dir.join("fixture.geojson");
    std::fs::write(&fixture, geojson).unwrap();

    let script = dir.join("fake-ogr2ogr");
    std::fs::write(
        &script,
        format!("#!/bin/sh\ncp '{}' \"$3\"\n", fixture.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Text of the first element with the given local name.
fn element_text(xml: &str, name: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    let text = doc
        .descendants()
        .find(|n| n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string());
    text
}

/// Attribute value of the first element with the given local name.
fn element_attribute(xml: &str, name: &str, attribute: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    let value = doc
        .descendants()
        .find(|n| n.tag_name().name() == name)
        .and_then(|n| n.attribute(attribute))
        .map(str::to_string);
    value
}

#[tokio::test]
async fn test_home_links_endpoint() {
    let server = create_test_server(WpsService::new());

    let response = server.get("/").await;

    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("/wps"));
    assert!(!html.contains("{{ url }}"));
}

#[tokio::test]
async fn test_get_capabilities() {
    let server = create_test_server(WpsService::new());

    let response = server
        .get("/wps")
        .add_query_params([("service", "WPS"), ("request", "GetCapabilities")])
        .await;

    response.assert_status_ok();
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("text/xml"));
    let xml = response.text();
    assert!(xml.contains("Capabilities"));
    for id in ["say_hello", "feature_count", "centroids"] {
        assert!(xml.contains(id), "missing {}", id);
    }
}

#[tokio::test]
async fn test_describe_process() {
    let server = create_test_server(WpsService::new());

    let response = server
        .get("/wps")
        .add_query_params([
            ("service", "WPS"),
            ("request", "DescribeProcess"),
            ("version", "1.0.0"),
            ("identifier", "say_hello"),
        ])
        .await;

    response.assert_status_ok();
    let xml = response.text();
    assert!(xml.contains("ProcessDescriptions"));
    assert!(xml.contains("name"));
}

#[tokio::test]
async fn test_execute_say_hello_get() {
    let server = create_test_server(WpsService::new());

    let response = server
        .get("/wps")
        .add_query_params([
            ("service", "WPS"),
            ("request", "Execute"),
            ("version", "1.0.0"),
            ("identifier", "say_hello"),
            ("DataInputs", "name=World"),
        ])
        .await;

    response.assert_status_ok();
    assert_eq!(
        element_text(&response.text(), "LiteralData").as_deref(),
        Some("Hello World!")
    );
}

#[tokio::test]
async fn test_execute_feature_count_post() {
    let server = create_test_server(WpsService::new());

    let response = server
        .post("/wps")
        .text(execute_body("feature_count", embedded_layer()))
        .await;

    response.assert_status_ok();
    assert_eq!(
        element_text(&response.text(), "LiteralData").as_deref(),
        Some("3")
    );
}

#[tokio::test]
async fn test_execute_missing_input() {
    let server = create_test_server(WpsService::new());

    let response = server
        .get("/wps")
        .add_query_params([
            ("service", "WPS"),
            ("request", "Execute"),
            ("version", "1.0.0"),
            ("identifier", "say_hello"),
        ])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let xml = response.text();
    assert_eq!(
        element_attribute(&xml, "Exception", "exceptionCode").as_deref(),
        Some("MissingParameterValue")
    );
    assert_eq!(
        element_attribute(&xml, "Exception", "locator").as_deref(),
        Some("name")
    );
}

#[tokio::test]
async fn test_literal_data_for_complex_input() {
    let server = create_test_server(WpsService::new());

    let body = execute_body("feature_count", "").replace(
        r#"<wps:ComplexData mimeType="text/xml"></wps:ComplexData>"#,
        "<wps:LiteralData>&lt;a/&gt;</wps:LiteralData>",
    );
    let response = server.post("/wps").text(body).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let xml = response.text();
    assert_eq!(
        element_attribute(&xml, "Exception", "exceptionCode").as_deref(),
        Some("InvalidParameterValue")
    );
    assert_eq!(
        element_attribute(&xml, "Exception", "locator").as_deref(),
        Some("layer")
    );
}

#[tokio::test]
async fn test_unsupported_operation() {
    let server = create_test_server(WpsService::new());

    let response = server
        .get("/wps")
        .add_query_params([("service", "WPS"), ("request", "GetStatus")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.text().contains("OperationNotSupported"));
}

#[tokio::test]
async fn test_malformed_post_body() {
    let server = create_test_server(WpsService::new());

    let response = server.post("/wps").text("<wps:Execute").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.text().contains("ExceptionReport"));
}

#[tokio::test]
async fn test_feature_count_malformed_layer() {
    let server = create_test_server(WpsService::new());

    // Well-formed request, but the layer text is not an XML document
    let body = execute_body("feature_count", "not &lt;xml");
    let response = server.post("/wps").text(body).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let xml = response.text();
    assert!(xml.contains("NoApplicableCode"));
    assert!(!xml.contains("not &lt;xml"));
}

#[tokio::test]
async fn test_datafile_not_found() {
    let server = create_test_server(WpsService::new());

    server
        .get("/datafile/5f0c6c2e-6d43-4e8c-9f0e-1d2b3c4d5e6f")
        .await
        .assert_status_not_found();
    server
        .get("/datafile/not-a-uuid")
        .await
        .assert_status_not_found();
}

#[cfg(unix)]
#[tokio::test]
async fn test_centroids_end_to_end() {
    let tools = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let service = WpsServiceBuilder::new()
        .ogr2ogr(fake_converter(tools.path(), LAYER_GEOJSON))
        .work_dir(scratch.path())
        .build();
    let server = create_test_server(service);

    let response = server
        .post("/wps")
        .text(execute_body("centroids", embedded_layer()))
        .await;

    response.assert_status_ok();
    let xml = response.text();
    let href = element_attribute(&xml, "Reference", "href").unwrap();
    assert_eq!(
        element_attribute(&xml, "Reference", "mimeType").as_deref(),
        Some("application/json")
    );

    let path = url::Url::parse(&href).unwrap().path().to_string();
    assert!(path.starts_with("/datafile/"));

    let data = server.get(&path).await;
    data.assert_status_ok();
    assert_eq!(
        data.header("content-type").to_str().unwrap(),
        "application/json"
    );

    let json: Value = serde_json::from_slice(data.as_bytes()).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    for feature in features {
        assert_eq!(feature["geometry"]["type"], "Point");
    }
    assert_eq!(
        features[1]["geometry"]["coordinates"],
        serde_json::json!([12.0, 12.0])
    );
    assert_eq!(features[2]["properties"]["name"], "c");

    // Scratch directory removed
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_centroids_converter_failure() {
    let scratch = TempDir::new().unwrap();
    let service = WpsServiceBuilder::new()
        .ogr2ogr("false")
        .work_dir(scratch.path())
        .build();
    let server = create_test_server(service);

    let response = server
        .post("/wps")
        .text(execute_body("centroids", embedded_layer()))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("NoApplicableCode"));
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

    // Server keeps serving
    server
        .get("/wps")
        .add_query_params([("service", "WPS"), ("request", "GetCapabilities")])
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_centroids_with_ogr2ogr() {
    if geowps::Ogr2Ogr::default().version().is_err() {
        eprintln!("ogr2ogr not installed, skipping");
        return;
    }
    let server = create_test_server(WpsService::new());

    let response = server
        .post("/wps")
        .text(execute_body("centroids", embedded_layer()))
        .await;

    response.assert_status_ok();
    let href = element_attribute(&response.text(), "Reference", "href").unwrap();
    let path = url::Url::parse(&href).unwrap().path().to_string();

    let data = server.get(&path).await;
    data.assert_status_ok();
    let json: Value = serde_json::from_slice(data.as_bytes()).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);
    assert_eq!(
        features[0]["geometry"]["coordinates"],
        serde_json::json!([1.0, 1.0])
    );
}
