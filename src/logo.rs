//! Logo cleanup workflow.
//!
//! Takes one logo (a local file, a URL, or the first image in the logo input
//! directory), writes a cleaned `{stem}.png` into the output directory and,
//! when vectorizing, a traced `{stem}.svg` beside it. Logos are not recorded
//! in the manifest.

use crate::imaging::{BackendError, ImageBackend, LogoParams, SUPPORTED_INPUT_EXTENSIONS};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

/// Name used when a URL has no usable last path segment.
pub const FALLBACK_NAME: &str = "logo.png";

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum LogoError {
    #[error("no logo found in {} (use --file or --url, or place one there)", .0.display())]
    NoInput(PathBuf),
    #[error("failed to list {path}: {source}")]
    ListInputs {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid logo URL '{url}': {reason}")]
    Url { url: String, reason: String },
    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Where the logo comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoSource {
    File(PathBuf),
    Url(String),
    /// First supported image in this directory, by file name.
    Dir(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LogoJob<'a> {
    pub source: LogoSource,
    pub output_dir: &'a Path,
    pub params: LogoParams,
    pub vectorize: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogoReport {
    pub source_name: String,
    pub png: PathBuf,
    pub svg: Option<PathBuf>,
}

/// Last path segment of `url`, or [`FALLBACK_NAME`].
pub fn name_from_url(url: &str) -> Result<String, LogoError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| LogoError::Url {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_NAME);
    Ok(name.to_string())
}

/// First supported image directly inside `dir`, sorted by file name.
pub fn first_input(dir: &Path) -> Result<PathBuf, LogoError> {
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LogoError::ListInputs {
            path: dir.to_path_buf(),
            source,
        })?;
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SUPPORTED_INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if entry.file_type().is_file() && supported {
            return Ok(entry.into_path());
        }
    }
    Err(LogoError::NoInput(dir.to_path_buf()))
}

async fn read_file(path: &Path) -> Result<(String, Vec<u8>), LogoError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LogoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    Ok((name, bytes))
}

async fn fetch(url: &str) -> Result<(String, Vec<u8>), LogoError> {
    let name = name_from_url(url)?;
    let fetch_err = |reason: String| LogoError::Fetch {
        url: url.to_string(),
        reason,
    };
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| fetch_err(e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {}", status.as_u16())));
    }
    let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
    Ok((name, bytes.to_vec()))
}

/// Resolve the source to its name and bytes.
pub async fn load_source(source: &LogoSource) -> Result<(String, Vec<u8>), LogoError> {
    match source {
        LogoSource::File(path) => read_file(path).await,
        LogoSource::Url(url) => fetch(url).await,
        LogoSource::Dir(dir) => read_file(&first_input(dir)?).await,
    }
}

/// Clean `bytes` and write the outputs for a logo called `source_name`.
pub fn process_logo<B: ImageBackend>(
    backend: &B,
    source_name: &str,
    bytes: &[u8],
    job: &LogoJob<'_>,
) -> Result<LogoReport, LogoError> {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "logo".to_string());

    let cleaned = backend.clean_logo(bytes, &job.params)?;

    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| LogoError::Write { path, source }
    };
    std::fs::create_dir_all(job.output_dir).map_err(write_err(job.output_dir))?;
    let png = job.output_dir.join(format!("{stem}.png"));
    std::fs::write(&png, &cleaned).map_err(write_err(&png))?;
    info!(file = %png.display(), "logo cleaned");

    let svg = if job.vectorize {
        let svg = job.output_dir.join(format!("{stem}.svg"));
        backend.trace_svg(&png, &svg)?;
        info!(file = %svg.display(), "logo traced");
        Some(svg)
    } else {
        None
    };

    Ok(LogoReport {
        source_name: source_name.to_string(),
        png,
        svg,
    })
}

/// Load the source and [`process_logo`].
pub async fn run_logo<B: ImageBackend>(backend: &B, job: &LogoJob<'_>) -> Result<LogoReport, LogoError> {
    let (name, bytes) = load_source(&job.source).await?;
    process_logo(backend, &name, &bytes, job)
}
