//! HTTP request handlers for the WPS service.

use std::io;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use geowps::{wps::response, WpsError};
use quick_xml::escape::escape;
use url::Url;
use uuid::Uuid;

use crate::AppState;

/// Content type of every WPS document, including exception reports.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

const HOME_TEMPLATE: &str = include_str!("../templates/home.html");

/// Base URL the client used to reach us.
///
/// Taken from the `Host` header so that result links work behind port
/// forwarding; falls back to the listen address when the header is missing
/// or is not a bare `host[:port]`.
pub fn request_base_url(state: &AppState, headers: &HeaderMap) -> Url {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|host| Url::parse(&format!("http://{}/", host)).ok())
        .filter(|url| url.path() == "/" && url.query().is_none() && url.fragment().is_none())
        .unwrap_or_else(|| state.base_url.clone())
}

/// Landing page linking to the processing endpoint.
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let base_url = request_base_url(&state, &headers);
    match response::endpoint_url(&base_url) {
        Ok(url) => Html(render_home(&url)).into_response(),
        Err(e) => wps_error_response(&state, e),
    }
}

/// Landing page HTML for the endpoint at `url`.
///
/// The URL comes from the client's `Host` header, so it is escaped.
pub fn render_home(url: &Url) -> String {
    HOME_TEMPLATE.replace("{{ url }}", &escape(url.as_str()))
}

/// `GET /wps`: KVP-encoded request in the query string.
pub async fn wps_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let base_url = request_base_url(&state, &headers);
    let query = query.unwrap_or_default();
    tracing::debug!(query = %query, "WPS GET request");

    let worker = Arc::clone(&state);
    let result =
        tokio::task::spawn_blocking(move || worker.wps.handle_kvp(&query, &base_url)).await;
    into_wps_response(&state, result)
}

/// `POST /wps`: XML-encoded request in the body.
pub async fn wps_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let base_url = request_base_url(&state, &headers);
    tracing::debug!(bytes = body.len(), "WPS POST request");

    let body = match String::from_utf8(body.to_vec()) {
        Ok(body) => body,
        Err(_) => {
            return wps_error_response(
                &state,
                WpsError::invalid("request", "request body is not valid UTF-8"),
            )
        }
    };

    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || worker.wps.handle_xml(&body, &base_url)).await;
    into_wps_response(&state, result)
}

/// `GET /datafile/:id`: a stored process result.
pub async fn datafile(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let file = Uuid::parse_str(&id)
        .ok()
        .and_then(|id| state.wps.data_files().find(&id));

    match file {
        Some(file) => {
            tracing::debug!(id = %file.id, bytes = file.payload.len(), "Serving data file");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, file.media_type.clone())],
                file.payload.clone(),
            )
                .into_response()
        }
        None => {
            tracing::debug!(id = %id, "Data file not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn into_wps_response(
    state: &AppState,
    result: Result<geowps::Result<String>, tokio::task::JoinError>,
) -> Response {
    match result {
        Ok(Ok(document)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
            document,
        )
            .into_response(),
        Ok(Err(e)) => wps_error_response(state, e),
        Err(e) => {
            let e = WpsError::Io(io::Error::other(format!("request worker failed: {}", e)));
            wps_error_response(state, e)
        }
    }
}

/// Render an exception report; 400 for client errors, 500 otherwise.
fn wps_error_response(state: &AppState, e: WpsError) -> Response {
    let status = if e.is_client_error() {
        tracing::warn!(
            code = e.exception_code(),
            locator = ?e.locator(),
            error = %e,
            "Rejected WPS request"
        );
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(code = e.exception_code(), error = %e, "WPS request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        [(header::CONTENT_TYPE, XML_CONTENT_TYPE)],
        response::exception_report(&e, state.debug),
    )
        .into_response()
}
