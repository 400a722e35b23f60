use encoding_rs::{Encoding, UTF_8};
use scraper::ElementRef;

const ZERO_WIDTH_SPACE: char = '\u{200b}';

/// Flattens a subtree into clean text.
///
/// Zero-width spaces are removed, and characters that the output charset
/// cannot represent are dropped so that marker searches and downstream
/// writers see the same text.
#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer {
    encoding: &'static Encoding,
}

impl TextNormalizer {
    /// Normalizer for the charset named by `label` (`utf-8`, `gbk`, ...).
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(|encoding| Self {
            encoding: encoding.output_encoding(),
        })
    }

    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Full text content of `element`, normalized.
    #[must_use]
    pub fn normalize(&self, element: &ElementRef<'_>) -> String {
        let raw: String = element.text().collect();
        self.normalize_str(&raw)
    }

    /// Normalize an already-flattened string.
    #[must_use]
    pub fn normalize_str(&self, raw: &str) -> String {
        let without_zw = raw.chars().filter(|c| *c != ZERO_WIDTH_SPACE);
        if self.encoding == UTF_8 {
            return without_zw.collect();
        }

        let mut buf = [0u8; 4];
        without_zw
            .filter(|c| {
                let (_, _, unmappable) = self.encoding.encode(c.encode_utf8(&mut buf));
                !unmappable
            })
            .collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}
