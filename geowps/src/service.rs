//! The WPS service facade.
//!
//! [`WpsService`] owns the registered processes and the shared result cache,
//! decodes requests, dispatches Execute calls by process identifier and
//! renders the response documents. It knows nothing about HTTP: callers hand
//! it a query string or request body together with the base URL the client
//! used, and get back an XML document or a [`WpsError`].
//!
//! # Example
//!
//! ```ignore
//! use geowps::WpsService;
//! use url::Url;
//!
//! let service = WpsService::builder().ogr2ogr("/usr/bin/ogr2ogr").build();
//! let base_url = Url::parse("http://localhost:5000/")?;
//!
//! let xml = service.handle_kvp(
//!     "service=WPS&request=Execute&version=1.0.0&identifier=say_hello&DataInputs=name%3DWorld",
//!     &base_url,
//! )?;
//! ```

use std::path::{Path, PathBuf};

use url::Url;

use crate::datafile::{DataFileCache, DEFAULT_CAPACITY};
use crate::error::{Result, WpsError};
use crate::ogr::Ogr2Ogr;
use crate::process::{Process, ProcessContext, ProcessResponse};
use crate::processes;
use crate::wps::{response, ExecuteRequest, WpsRequest};

/// WPS facade over a fixed set of processes.
///
/// The process list is fixed at construction. The service is `Send + Sync`
/// and meant to be shared behind an `Arc`.
#[derive(Debug)]
pub struct WpsService {
    processes: Vec<Process>,
    data_files: DataFileCache,
    converter: Ogr2Ogr,
    work_dir: Option<PathBuf>,
}

impl WpsService {
    /// Create a service with default settings.
    pub fn new() -> Self {
        WpsServiceBuilder::new().build()
    }

    /// Create a builder for more configuration options.
    pub fn builder() -> WpsServiceBuilder {
        WpsServiceBuilder::new()
    }

    /// Registered processes, in the order they are advertised.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Look up a process by identifier.
    pub fn process(&self, identifier: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.identifier() == identifier)
    }

    /// Store of files produced by processes.
    pub fn data_files(&self) -> &DataFileCache {
        &self.data_files
    }

    /// Converter used by the centroid process.
    pub fn converter(&self) -> &Ogr2Ogr {
        &self.converter
    }

    /// Parent directory for per-request scratch directories, if configured.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Handle a KVP-encoded request (GET query string).
    pub fn handle_kvp(&self, query: &str, base_url: &Url) -> Result<String> {
        self.handle(WpsRequest::from_kvp(query)?, base_url)
    }

    /// Handle an XML-encoded request (POST body).
    pub fn handle_xml(&self, body: &str, base_url: &Url) -> Result<String> {
        self.handle(WpsRequest::from_xml(body)?, base_url)
    }

    /// Handle a decoded request and render the response document.
    pub fn handle(&self, request: WpsRequest, base_url: &Url) -> Result<String> {
        tracing::debug!(operation = request.operation(), "Handling WPS request");

        match request {
            WpsRequest::GetCapabilities => response::capabilities(&self.processes, base_url),
            WpsRequest::DescribeProcess { identifiers } => {
                let processes = self.describe(&identifiers)?;
                let descriptions: Vec<_> = processes.iter().map(|p| p.description()).collect();
                response::process_descriptions(&descriptions)
            }
            WpsRequest::Execute(execute) => {
                let process = self.find_process(&execute.identifier)?;
                let outputs = self.execute(execute, base_url)?;
                response::execute_response(process.description(), &outputs, base_url)
            }
        }
    }

    /// Resolve DescribeProcess identifiers; `all` selects every process.
    pub fn describe(&self, identifiers: &[String]) -> Result<Vec<&Process>> {
        if identifiers.iter().any(|id| id.eq_ignore_ascii_case("all")) {
            return Ok(self.processes.iter().collect());
        }
        identifiers.iter().map(|id| self.find_process(id)).collect()
    }

    /// Validate inputs and run a process.
    ///
    /// # Errors
    ///
    /// - `InvalidParameterValue` (locator `identifier`) for unknown processes
    /// - input validation errors from
    ///   [`ProcessDescription::bind_inputs`](crate::process::ProcessDescription::bind_inputs)
    /// - whatever the handler fails with
    pub fn execute(&self, request: ExecuteRequest, base_url: &Url) -> Result<ProcessResponse> {
        let process = self.find_process(&request.identifier)?;
        let ctx = ProcessContext {
            base_url,
            data_files: &self.data_files,
            converter: &self.converter,
            work_dir: self.work_dir.as_deref(),
        };

        tracing::info!(process = process.identifier(), "Executing process");
        let result = process.execute(request.inputs, &ctx);

        if let Err(e) = &result {
            tracing::warn!(
                process = process.identifier(),
                code = e.exception_code(),
                error = %e,
                "Process execution failed"
            );
        }
        result
    }

    fn find_process(&self, identifier: &str) -> Result<&Process> {
        self.process(identifier).ok_or_else(|| {
            WpsError::invalid("identifier", format!("unknown process {}", identifier))
        })
    }
}

impl Default for WpsService {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating [`WpsService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use geowps::WpsServiceBuilder;
///
/// let service = WpsServiceBuilder::new()
///     .ogr2ogr("/opt/gdal/bin/ogr2ogr")
///     .work_dir("/var/tmp/geowps")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct WpsServiceBuilder {
    ogr2ogr: PathBuf,
    work_dir: Option<PathBuf>,
    cache_capacity: usize,
}

impl WpsServiceBuilder {
    /// Create a builder with default settings: `ogr2ogr` from `PATH`, the
    /// system temp dir and a 20-file result cache.
    pub fn new() -> Self {
        Self {
            ogr2ogr: PathBuf::from(crate::ogr::DEFAULT_PROGRAM),
            work_dir: None,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the `ogr2ogr` program to run.
    pub fn ogr2ogr<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ogr2ogr = program.as_ref().to_path_buf();
        self
    }

    /// Create per-request scratch directories under `dir`.
    pub fn work_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set how many result files are kept.
    ///
    /// Default is 20 files.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Build the [`WpsService`] with every built-in process registered.
    pub fn build(self) -> WpsService {
        WpsService {
            processes: processes::all(),
            data_files: DataFileCache::new(self.cache_capacity),
            converter: Ogr2Ogr::new(self.ogr2ogr),
            work_dir: self.work_dir,
        }
    }
}

impl Default for WpsServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
