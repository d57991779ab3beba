//! Static asset responder for the browser client pages

use std::path::{Path, PathBuf};

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs;

use crate::domain::utils::{asset_content_type_for, validate_file_name, OCTET_STREAM};
use crate::errors::AppError;

const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub landing_page: String,
    /// Directories never served as assets, even when they sit under `root`.
    /// Holds the transfer directories.
    pub withheld: Vec<PathBuf>,
}

/// Maps a decoded request path onto the asset root.
///
/// Every segment must be a plain name; `..`, absolute paths and backslashes
/// resolve to nothing rather than being normalized.
pub fn resolve_asset(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for segment in relative.split('/').filter(|segment| !segment.is_empty()) {
        let segment = validate_file_name(segment).ok()?;
        resolved.push(segment);
    }
    Some(resolved)
}

/// Compares canonical forms so `./received_files` and an absolute storage
/// path match the same directory. A withheld directory that does not exist
/// yet cannot contain `path`.
async fn is_withheld(withheld: &[PathBuf], path: &Path) -> bool {
    let Ok(resolved) = fs::canonicalize(path).await else {
        return true;
    };
    for directory in withheld {
        if let Ok(directory) = fs::canonicalize(directory).await {
            if resolved.starts_with(&directory) {
                return true;
            }
        }
    }
    false
}

pub async fn serve_asset(config: &AssetConfig, relative: &str) -> Result<Response, AppError> {
    let Some(mut path) = resolve_asset(&config.root, relative) else {
        return Err(AppError::not_found(relative));
    };

    if fs::metadata(&path).await.is_ok_and(|metadata| metadata.is_dir()) {
        path.push(INDEX_DOCUMENT);
    }

    if !fs::metadata(&path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
    {
        return Err(AppError::not_found(relative));
    }

    if is_withheld(&config.withheld, &path).await {
        return Err(AppError::not_found(relative));
    }

    let bytes = fs::read(&path).await.map_err(|err| {
        AppError::internal(format!("failed to read asset {}: {err}", path.display()))
    })?;

    let content_type = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(asset_content_type_for)
        .unwrap_or(OCTET_STREAM);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response())
}
