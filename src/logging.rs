use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::store::Direction;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// What a request does to the transfer directories, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Upload(Direction),
    Download(Direction),
    Listing(Direction),
}

impl Transfer {
    pub fn classify(path: &str) -> Option<Self> {
        match path {
            "/upload" => Some(Self::Upload(Direction::Inbound)),
            "/upload-to-mobile" => Some(Self::Upload(Direction::Outbound)),
            "/api/files" => Some(Self::Listing(Direction::Inbound)),
            "/api/shared-files" => Some(Self::Listing(Direction::Outbound)),
            _ => Direction::ALL
                .into_iter()
                .find(|direction| path.starts_with(direction.url_prefix()))
                .map(Self::Download),
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Upload(_) => "upload",
            Self::Download(_) => "download",
            Self::Listing(_) => "listing",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::Upload(direction) | Self::Download(direction) | Self::Listing(direction) => {
                direction
            }
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let transfer = Transfer::classify(&path);
    let request_bytes = content_length(request.headers());
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    match transfer {
        Some(transfer) => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            transfer = transfer.kind(),
            direction = transfer.direction().as_str(),
            request_bytes,
            response_bytes = content_length(response.headers()),
            duration_ms = elapsed_ms,
            "transfer request"
        ),
        None => info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = elapsed_ms,
            "request summary"
        ),
    }

    if status.is_server_error() {
        warn!(method = %method, path = %path, status = status.as_u16(), "request failed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_are_classified_by_route() {
        assert_eq!(
            Transfer::classify("/upload"),
            Some(Transfer::Upload(Direction::Inbound))
        );
        assert_eq!(
            Transfer::classify("/upload-to-mobile"),
            Some(Transfer::Upload(Direction::Outbound))
        );
        assert_eq!(
            Transfer::classify("/shared_files/photo.png"),
            Some(Transfer::Download(Direction::Outbound))
        );
        assert_eq!(
            Transfer::classify("/api/files"),
            Some(Transfer::Listing(Direction::Inbound))
        );
        assert_eq!(Transfer::classify("/api/messages"), None);
        assert_eq!(Transfer::classify("/mobile.html"), None);
    }
}
