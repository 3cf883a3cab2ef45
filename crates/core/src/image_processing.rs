//! Image upload and download boundaries.
//!
//! Reference images come in from disk and are turned into base64 payloads for
//! the Gemini API. Generated images come back as `data:` URIs and are decoded
//! again when the user saves them.
//!
//! # Upload limits
//!
//! Files over [`MAX_REFERENCE_BYTES`] are rejected from their metadata alone,
//! before any bytes are read. The format is sniffed from the content rather
//! than trusted from the file extension.

use crate::error::{AppError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::ImageFormat;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Largest accepted reference image, in bytes (5 MiB).
pub const MAX_REFERENCE_BYTES: u64 = 5 * 1024 * 1024;

/// Mime type assumed when the API does not report one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Prefix of saved image file names.
pub const DOWNLOAD_PREFIX: &str = "lumina";

/// A `data:{mime};base64,{payload}` URI split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Splits a base64 data URI. Only the `;base64` form is accepted.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AppError::data_uri("missing 'data:' scheme"))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| AppError::data_uri("missing ',' separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::data_uri("payload is not base64"))?;
        if mime_type.is_empty() {
            return Err(AppError::data_uri("empty mime type"));
        }
        Ok(Self::new(mime_type, data))
    }

    /// Decodes the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.data)
            .map_err(|e| AppError::data_uri(format!("bad base64 payload: {}", e)))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A user-supplied image sent alongside the prompt.
///
/// Payload and mime type live together, so one is never present without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Base64 payload without any `data:` prefix.
    pub data: String,
    pub mime_type: String,
}

impl ReferenceImage {
    /// Validates and encodes raw image bytes.
    ///
    /// # Errors
    ///
    /// - [`AppError::ImageTooLarge`] above [`MAX_REFERENCE_BYTES`]
    /// - [`AppError::UnsupportedImage`] when the bytes are not a known image format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_size(bytes.len() as u64)?;
        let format = image::guess_format(bytes)
            .map_err(|e| AppError::UnsupportedImage(e.to_string()))?;
        Ok(Self {
            data: BASE64.encode(bytes),
            mime_type: format.to_mime_type().to_string(),
        })
    }

    /// Loads a reference image from disk.
    ///
    /// The size check uses file metadata so an oversized file is never read.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        check_size(size)?;

        let bytes = tokio::fs::read(path).await?;
        let reference = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.display(),
            size,
            mime = %reference.mime_type,
            "Loaded reference image"
        );
        Ok(reference)
    }

    /// Accepts an existing data URI, e.g. one taken from history.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let parsed = DataUri::parse(uri)?;
        let bytes = parsed.decode()?;
        check_size(bytes.len() as u64)?;
        Ok(Self {
            data: parsed.data,
            mime_type: parsed.mime_type,
        })
    }

    /// Preview form of the image.
    pub fn data_uri(&self) -> String {
        DataUri::new(&self.mime_type, &self.data).to_string()
    }

    /// Approximate decoded size in bytes.
    pub fn decoded_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

fn check_size(size: u64) -> Result<()> {
    if size > MAX_REFERENCE_BYTES {
        return Err(AppError::ImageTooLarge {
            size,
            limit: MAX_REFERENCE_BYTES,
        });
    }
    Ok(())
}

/// File name a generated image is saved under.
///
/// The extension follows the mime type, falling back to `png`.
pub fn download_file_name(id: Uuid, mime_type: &str) -> String {
    let extension = ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png");
    format!("{}-{}.{}", DOWNLOAD_PREFIX, id, extension)
}

/// Default directory for saved images: the user's download folder, else the working directory.
pub fn default_download_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Decodes `data_uri` and writes it into `dir`, returning the written path.
pub async fn save_data_uri(id: Uuid, data_uri: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let parsed = DataUri::parse(data_uri)?;
    let bytes = parsed.decode()?;

    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(download_file_name(id, &parsed.mime_type));
    tokio::fs::write(&path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), "Saved image");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG signature plus IHDR chunk header; enough for format sniffing.
    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn data_uri_formats_and_parses() {
        let uri = DataUri::new("image/png", "AAAA");
        assert_eq!(uri.to_string(), "data:image/png;base64,AAAA");
        assert_eq!(DataUri::parse("data:image/png;base64,AAAA").unwrap(), uri);
    }

    #[test]
    fn data_uri_rejects_malformed_input() {
        assert!(DataUri::parse("image/png;base64,AAAA").is_err());
        assert!(DataUri::parse("data:image/png;base64").is_err());
        assert!(DataUri::parse("data:image/png,AAAA").is_err());
        assert!(DataUri::parse("data:;base64,AAAA").is_err());
    }

    #[test]
    fn reference_from_png_bytes_sniffs_mime() {
        let reference = ReferenceImage::from_bytes(PNG_HEADER).unwrap();
        assert_eq!(reference.mime_type, "image/png");
        assert_eq!(reference.data, BASE64.encode(PNG_HEADER));
        assert!(reference.data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn reference_rejects_non_image_bytes() {
        let err = ReferenceImage::from_bytes(b"just some text").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedImage(_)));
    }

    #[test]
    fn reference_rejects_oversized_bytes() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.resize(MAX_REFERENCE_BYTES as usize + 1, 0);
        let err = ReferenceImage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, AppError::ImageTooLarge { .. }));
    }

    #[test]
    fn download_name_uses_id_and_mime_extension() {
        let id = Uuid::nil();
        assert_eq!(
            download_file_name(id, "image/png"),
            "lumina-00000000-0000-0000-0000-000000000000.png"
        );
        assert!(download_file_name(id, "image/jpeg").ends_with(".jpg"));
        assert!(download_file_name(id, "application/x-unknown").ends_with(".png"));
    }
}
