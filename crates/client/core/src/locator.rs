//! Classification of content locators stored on-chain.
use client_blockchain_core::BlobId;

/// Where the bytes behind a locator live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Locator {
    /// Nothing to load; render a fallback.
    Empty,
    /// Absolute HTTP(S) URL, already renderable.
    Url(String),
    /// Blob store identifier that must be downloaded.
    Blob(BlobId),
}

impl Locator {
    /// Classify a raw locator. Never fails.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Locator::Empty;
        };

        if is_http_url(raw) {
            Locator::Url(raw.to_string())
        } else {
            Locator::Blob(BlobId::new(raw))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Locator::Empty)
    }
}

fn is_http_url(raw: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        raw.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
            && raw.len() > scheme.len()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_is_empty() {
        assert_eq!(Locator::classify(None), Locator::Empty);
        assert_eq!(Locator::classify(Some("")), Locator::Empty);
        assert_eq!(Locator::classify(Some("   ")), Locator::Empty);
    }

    #[test]
    fn urls_pass_through_unchanged() {
        for url in [
            "https://aggregator.walrus-testnet.walrus.space/v1/blobs/abc",
            "http://localhost:8080/a.png",
            "HTTPS://EXAMPLE.COM/x",
        ] {
            assert_eq!(Locator::classify(Some(url)), Locator::Url(url.to_string()));
        }
    }

    #[test]
    fn everything_else_is_a_blob() {
        assert_eq!(
            Locator::classify(Some("M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk")),
            Locator::Blob(BlobId::new("M4hsZGQ1oCktdzegB6HnI6Mi28S2nqOPHxK-W7_4BUk"))
        );
        assert!(matches!(Locator::classify(Some("https://")), Locator::Blob(_)));
        assert!(matches!(Locator::classify(Some("ftp://x")), Locator::Blob(_)));
    }
}
