//! Plaintext image detection by magic number.

/// Image formats recognised without decryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }
}

const JPEG_MAGIC: &[u8] = &[0xff, 0xd8, 0xff];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Detect a plaintext JPEG, PNG or WebP.
///
/// WebP needs both the `RIFF` container tag and the `WEBP` form type, so
/// other RIFF payloads are not mistaken for images.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(JPEG_MAGIC) {
        return Some(ImageKind::Jpeg);
    }
    if bytes.starts_with(PNG_MAGIC) {
        return Some(ImageKind::Png);
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(ImageKind::Webp);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_each_format() {
        assert_eq!(sniff_image(&[0xff, 0xd8, 0xff, 0xe0, 0x00]), Some(ImageKind::Jpeg));
        assert_eq!(
            sniff_image(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00]),
            Some(ImageKind::Png)
        );
        assert_eq!(sniff_image(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::Webp.mime_type(), "image/webp");
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(sniff_image(&[]), None);
        assert_eq!(sniff_image(&[0xff, 0xd8]), None);
        assert_eq!(sniff_image(&[0x89, b'P', b'N', b'G']), None);
        assert_eq!(sniff_image(b"RIFF\x10\x00\x00\x00WAVEfmt "), None);
        assert_eq!(sniff_image(b"{\"version\":1}"), None);
        assert_eq!(sniff_image(b"MOCKSEAL\x00\x00"), None);
    }
}
