//! In-memory image payloads and `data:` URL conversion.
//!
//! Images are never decoded; the bytes are passed through to the model as-is
//! and results come back as base64 which is kept in `data:` URL form so
//! clients can display them directly.
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ImageData { mime_type: mime_type.into(), bytes }
    }

    pub fn from_base64(mime_type: &str, data: &str) -> AppResult<Self> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| AppError::InvalidImageData(format!("invalid base64 image data: {}", e)))?;
        Ok(ImageData::new(mime_type, bytes))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> AppResult<Self> {
        let invalid = || AppError::InvalidImageData("Dados da imagem inválidos para refinamento.".to_string());
        let rest = url.strip_prefix("data:").ok_or_else(invalid)?;
        let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
        if !is_mime_type(mime) || payload.is_empty() {
            return Err(invalid());
        }
        let bytes = BASE64.decode(payload).map_err(|_| invalid())?;
        Ok(ImageData::new(mime, bytes))
    }

    /// Read an image file. The type comes from the file signature; the
    /// extension is only consulted when the bytes are not recognised.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::validation(format!("Failed to read {}: {}", path.display(), e)))?;
        let mime = image_kind(&bytes).map(|k| k.mime_type()).unwrap_or_else(|| mime_from_extension(path));
        Ok(ImageData::new(mime, bytes))
    }

    /// File extension for saving, from the signature when known, else the MIME subtype.
    pub fn file_extension(&self) -> &str {
        if let Some(kind) = image_kind(&self.bytes) {
            return kind.extension();
        }
        match self.mime_type.split_once('/') {
            Some(("image", "jpeg")) => "jpg",
            Some(("image", sub)) if is_mime_type(&self.mime_type) => sub,
            _ => "png",
        }
    }
}

/// The image type recognised from the leading bytes, if any.
fn image_kind(bytes: &[u8]) -> Option<infer::Type> {
    infer::get(bytes).filter(|k| k.matcher_type() == infer::MatcherType::Image)
}

/// `type/subtype` made of the characters browsers actually send.
fn is_mime_type(s: &str) -> bool {
    let Some((ty, sub)) = s.split_once('/') else { return false };
    !ty.is_empty()
        && !sub.is_empty()
        && ty.chars().all(|c| c.is_ascii_alphanumeric())
        && sub.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+'))
}

/// Fallback for files whose signature `infer` does not know.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => DEFAULT_IMAGE_MIME,
    }
}

/// A user-selected file as sent by the browser: name, MIME type and base64 body.
#[derive(Clone, Debug, Deserialize)]
pub struct ImageUpload {
    #[serde(default)]
    pub file_name: Option<String>,
    pub mime_type: String,
    pub data: String,
}

impl ImageUpload {
    /// Decode the body and check its signature. The declared `mime_type` is
    /// not trusted: the stored type is the one detected from the bytes.
    pub fn decode(self) -> AppResult<UploadedImage> {
        let bytes = ImageData::from_base64(&self.mime_type, &self.data)?.bytes;
        if bytes.is_empty() {
            return Err(AppError::validation("Image file is empty"));
        }
        let kind = infer::get(&bytes).ok_or_else(|| {
            AppError::validation(format!("Unrecognised file type (declared '{}')", self.mime_type))
        })?;
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(AppError::validation(format!("Unsupported file type '{}'", kind.mime_type())));
        }
        Ok(UploadedImage { file_name: self.file_name, image: ImageData::new(kind.mime_type(), bytes) })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub image: ImageData,
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    #[test]
    fn data_url_round_trip_keeps_mime() {
        let img = ImageData::new("image/webp", vec![1, 2, 3, 250]);
        let url = img.to_data_url();
        assert!(url.starts_with("data:image/webp;base64,"));
        assert_eq!(ImageData::from_data_url(&url).unwrap(), img);
    }

    #[test]
    fn rejects_malformed_data_urls() {
        for bad in [
            "https://example.com/a.png",
            "data:image/png,AAAA",
            "data:;base64,AAAA",
            "data:image/png;base64,",
            "data:image/png;base64,@@@",
        ] {
            assert!(
                matches!(ImageData::from_data_url(bad), Err(AppError::InvalidImageData(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn upload_requires_recognised_image_content() {
        let ok = ImageUpload { file_name: Some("dish.jpg".into()), mime_type: "image/jpeg".into(), data: "/9j/".into() };
        let decoded = ok.decode().unwrap();
        assert_eq!(decoded.image.bytes, vec![0xff, 0xd8, 0xff]);

        let pdf = ImageUpload { file_name: None, mime_type: "application/pdf".into(), data: "AAAA".into() };
        assert!(matches!(pdf.decode(), Err(AppError::Validation(_))));

        let empty = ImageUpload { file_name: None, mime_type: "image/png".into(), data: "".into() };
        assert!(matches!(empty.decode(), Err(AppError::Validation(_))));
    }

    #[test]
    fn upload_rejects_non_image_bytes_declared_as_image() {
        // %PDF-1.4
        let pdf = ImageUpload { file_name: Some("menu.png".into()), mime_type: "image/png".into(), data: "JVBERi0xLjQK".into() };
        assert!(matches!(pdf.decode(), Err(AppError::Validation(_))));

        let unknown = ImageUpload { file_name: None, mime_type: "image/png".into(), data: "AQIDBAUG".into() };
        assert!(matches!(unknown.decode(), Err(AppError::Validation(_))));
    }

    #[test]
    fn upload_type_follows_signature_not_declaration() {
        let jpeg = ImageUpload { file_name: None, mime_type: "image/png".into(), data: BASE64.encode(JPEG) };
        assert_eq!(jpeg.decode().unwrap().image.mime_type, "image/jpeg");
    }

    const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    const PNG: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    #[tokio::test]
    async fn from_path_sniffs_signature_before_extension() {
        let dir = std::env::temp_dir().join(format!("photo-run-media-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let no_ext = dir.join("dish");
        tokio::fs::write(&no_ext, JPEG).await.unwrap();
        assert_eq!(ImageData::from_path(&no_ext).await.unwrap().mime_type, "image/jpeg");

        let wrong_ext = dir.join("dish.jpg");
        tokio::fs::write(&wrong_ext, PNG).await.unwrap();
        assert_eq!(ImageData::from_path(&wrong_ext).await.unwrap().mime_type, "image/png");

        let unknown = dir.join("photo.webp");
        tokio::fs::write(&unknown, [1u8, 2, 3]).await.unwrap();
        assert_eq!(ImageData::from_path(&unknown).await.unwrap().mime_type, "image/webp");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn extension_from_signature_then_mime() {
        assert_eq!(ImageData::new("image/png", JPEG.to_vec()).file_extension(), "jpg");
        assert_eq!(ImageData::new("image/jpeg", PNG.to_vec()).file_extension(), "png");
        assert_eq!(ImageData::new("image/jpeg", vec![]).file_extension(), "jpg");
        assert_eq!(ImageData::new("image/webp", vec![]).file_extension(), "webp");
        assert_eq!(ImageData::new("application/octet-stream", vec![]).file_extension(), "png");
        assert_eq!(mime_from_extension(Path::new("a/B.JPEG")), "image/jpeg");
        assert_eq!(mime_from_extension(Path::new("noext")), "image/png");
    }
}
