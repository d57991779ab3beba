//! Shared file-name validation and formatting helpers

use std::{
    path::{Component, Path},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Local};

use crate::errors::StoreError;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Accepts a name only when it is exactly one normal path component.
///
/// Uploaders choose their own file names, so anything that could address a
/// path outside the target directory is refused: separators of either flavour,
/// `.`/`..`, NUL and other control characters, and platform prefixes.
pub fn validate_file_name(name: &str) -> Result<&str, StoreError> {
    let invalid = || StoreError::InvalidName(name.to_string());

    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(invalid());
    }

    if name.chars().any(char::is_control) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
}

/// Content type used when handing stored files back to a client.
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("zip") => "application/zip",
        _ => OCTET_STREAM,
    }
}

/// Content type for the web client's own assets; pages and scripts carry a charset.
pub fn asset_content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=UTF-8",
        Some("js") => "application/javascript; charset=UTF-8",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => content_type_for(name),
    }
}

pub fn attachment_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", name.replace('"', "\\\""))
}

pub fn epoch_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(before) => -before.duration().as_secs_f64(),
    }
}

/// `YYYY-MM-DD HH:MM:SS` in the server's local time zone.
pub fn format_local(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn format_local_clock(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["a.txt", "photo 1.JPG", "notes..txt", ".hidden", "résumé.pdf"] {
            assert_eq!(validate_file_name(name).expect("valid name"), name);
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for name in [
            "",
            ".",
            "..",
            "../../etc/passwd",
            "nested/file.txt",
            "/etc/passwd",
            "..\\windows.ini",
            "line\nbreak",
            "nul\0byte",
        ] {
            let error = validate_file_name(name).expect_err("expected invalid name");
            assert!(matches!(error, StoreError::InvalidName(_)));
        }
    }

    #[test]
    fn resolves_known_content_types_case_insensitively() {
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("IMG_0001.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("song.mp3"), "audio/mpeg");
        assert_eq!(content_type_for("archive.zip"), "application/zip");
    }

    #[test]
    fn unknown_extensions_are_octet_streams() {
        assert_eq!(content_type_for("data.bin"), OCTET_STREAM);
        assert_eq!(content_type_for("README"), OCTET_STREAM);
    }

    #[test]
    fn assets_carry_charset() {
        assert_eq!(
            asset_content_type_for("desktop.html"),
            "text/html; charset=UTF-8"
        );
        assert_eq!(asset_content_type_for("style.css"), "text/css");
    }

    #[test]
    fn disposition_escapes_quotes() {
        assert_eq!(
            attachment_disposition("say \"hi\".txt"),
            "attachment; filename=\"say \\\"hi\\\".txt\""
        );
    }

    #[test]
    fn epoch_seconds_keeps_fraction() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(epoch_seconds(time), 1.5);
    }

    #[test]
    fn local_format_has_date_and_time() {
        let formatted = format_local(SystemTime::now());
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[10..11], " ");
    }
}
