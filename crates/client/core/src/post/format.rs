//! On-store layout of a post: a JSON metadata envelope and a packed image blob.
//!
//! Data blob layout (all lengths `u32` little-endian):
//!
//! ```text
//! [count]
//! count × ( [header_len][header JSON] [data_len][image bytes] )
//! ```
use serde::{Deserialize, Serialize};

/// Only envelope version understood by readers.
pub const METADATA_VERSION: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported PostMetadata version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid post metadata: {0}")]
    Metadata(String),

    #[error("Data blob truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Invalid image header: {0}")]
    ImageHeader(String),

    #[error("Image too large to pack: {0} bytes")]
    TooLarge(usize),
}

/// Image description stored in the metadata envelope and in each packed header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostImage {
    pub index: u32,
    pub mime_type: String,
    pub file_name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Decoded metadata envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub version: u64,
    pub text: String,
    #[serde(default)]
    pub images: Vec<PostImage>,
}

impl PostMetadata {
    pub fn new(text: impl Into<String>, images: Vec<PostImage>) -> Self {
        Self {
            version: METADATA_VERSION,
            text: text.into(),
            images,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        serde_json::to_vec(self).map_err(|e| FormatError::Metadata(e.to_string()))
    }

    /// Parse an envelope, rejecting any version other than 1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| FormatError::Metadata(e.to_string()))?;
        match value.get("version") {
            Some(version) if version.as_u64() == Some(METADATA_VERSION) => {}
            Some(version) => return Err(FormatError::UnsupportedVersion(version.to_string())),
            None => return Err(FormatError::UnsupportedVersion("undefined".into())),
        }
        serde_json::from_value(value).map_err(|e| FormatError::Metadata(e.to_string()))
    }
}

/// An image selected for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub alt: Option<String>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
            alt: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// An image recovered from a data blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedImage {
    pub meta: PostImage,
    pub data: Vec<u8>,
}

/// Pixel dimensions read from PNG and GIF headers. Other formats yield `None`.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() >= 24 && bytes.starts_with(&[0x89, b'P', b'N', b'G']) && &bytes[12..16] == b"IHDR" {
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        return Some((width, height));
    }
    if bytes.len() >= 10 && (bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        let width = u16::from_le_bytes([bytes[6], bytes[7]]) as u32;
        let height = u16::from_le_bytes([bytes[8], bytes[9]]) as u32;
        return Some((width, height));
    }
    None
}

fn push_len(out: &mut Vec<u8>, len: usize) -> Result<(), FormatError> {
    let len = u32::try_from(len).map_err(|_| FormatError::TooLarge(len))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

/// Describe and pack images. No images pack to an empty blob.
pub fn pack_images(uploads: &[ImageUpload]) -> Result<(Vec<PostImage>, Vec<u8>), FormatError> {
    if uploads.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut metas = Vec::with_capacity(uploads.len());
    let mut blob = Vec::new();
    push_len(&mut blob, uploads.len())?;

    for (index, upload) in uploads.iter().enumerate() {
        let dimensions = image_dimensions(&upload.bytes);
        let meta = PostImage {
            index: index as u32,
            mime_type: upload.mime_type.clone(),
            file_name: upload.file_name.clone(),
            size: upload.size(),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            alt: upload.alt.clone(),
        };
        let header = serde_json::to_vec(&meta).map_err(|e| FormatError::ImageHeader(e.to_string()))?;

        push_len(&mut blob, header.len())?;
        blob.extend_from_slice(&header);
        push_len(&mut blob, upload.bytes.len())?;
        blob.extend_from_slice(&upload.bytes);
        metas.push(meta);
    }

    Ok((metas, blob))
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(FormatError::Truncated { offset: self.offset })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<usize, FormatError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
    }
}

/// Unpack a data blob. An empty blob holds no images.
pub fn unpack_images(blob: &[u8]) -> Result<Vec<PackedImage>, FormatError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader { bytes: blob, offset: 0 };
    let count = reader.u32()?;
    let mut images = Vec::with_capacity(count.min(16));
    for _ in 0..count {
        let header_len = reader.u32()?;
        let header = reader.take(header_len)?;
        let meta: PostImage =
            serde_json::from_slice(header).map_err(|e| FormatError::ImageHeader(e.to_string()))?;
        let data_len = reader.u32()?;
        let data = reader.take(data_len)?.to_vec();
        images.push(PackedImage { meta, data });
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes
    }

    #[test]
    fn packed_layout_is_length_prefixed() {
        let uploads = vec![
            ImageUpload::new("a.png", "image/png", png(640, 480)).with_alt("cover"),
            ImageUpload::new("b.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        ];
        let (metas, blob) = pack_images(&uploads).unwrap();

        assert_eq!(&blob[..4], &2u32.to_le_bytes());
        assert_eq!(metas[0].width, Some(640));
        assert_eq!(metas[1].width, None);
        assert_eq!(metas[1].index, 1);

        let images = unpack_images(&blob).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].meta.alt.as_deref(), Some("cover"));
        assert_eq!(images[1].data, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn no_images_pack_to_empty_blob() {
        let (metas, blob) = pack_images(&[]).unwrap();
        assert!(metas.is_empty());
        assert!(blob.is_empty());
        assert!(unpack_images(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let (_, blob) = pack_images(&[ImageUpload::new("a.gif", "image/gif", b"GIF89a\x01\x00\x01\x00".to_vec())]).unwrap();
        let err = unpack_images(&blob[..blob.len() - 3]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { .. }));
    }

    #[test]
    fn metadata_uses_camel_case_and_skips_missing_dimensions() {
        let metadata = PostMetadata::new(
            "hello",
            vec![PostImage {
                index: 0,
                mime_type: "image/webp".into(),
                file_name: "x.webp".into(),
                size: 3,
                width: None,
                height: None,
                alt: None,
            }],
        );
        let json: serde_json::Value = serde_json::from_slice(&metadata.to_bytes().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["images"][0]["mimeType"], "image/webp");
        assert!(json["images"][0].get("width").is_none());
    }

    #[test]
    fn other_versions_are_rejected() {
        let err = PostMetadata::from_bytes(br#"{"version":2,"text":"","images":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported PostMetadata version: 2");

        let ok = PostMetadata::from_bytes(br#"{"version":1,"text":"hi"}"#).unwrap();
        assert!(ok.images.is_empty());
    }
}
