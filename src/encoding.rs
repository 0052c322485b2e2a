use std::fmt;

use anyhow::{Result, anyhow};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

const BINARY_CHECK_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Override,
    Bom,
    Detector,
    AssumedUtf8,
}

impl fmt::Display for EncodingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EncodingSource::Override => "override",
            EncodingSource::Bom => "bom",
            EncodingSource::Detector => "detector",
            EncodingSource::AssumedUtf8 => "assumed-utf8",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct EncodingDecision {
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
}

/// File text plus what is needed to write it back byte-compatible.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub had_errors: bool,
    pub had_bom: bool,
    pub decision: EncodingDecision,
}

impl DecodedText {
    /// Encodes `text` the way the original bytes were encoded.
    pub fn encode(&self, text: &str) -> (Vec<u8>, bool) {
        let encoding = self.decision.encoding;
        let mut out = Vec::with_capacity(text.len() + 3);
        if self.had_bom {
            out.extend_from_slice(bom_for(encoding));
        }

        // encoding_rs only encodes UTF-16 as UTF-8, so those are done by hand
        if encoding == UTF_16LE {
            out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            return (out, false);
        }
        if encoding == UTF_16BE {
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            return (out, false);
        }

        let (bytes, _, had_errors) = encoding.encode(text);
        out.extend_from_slice(&bytes);
        (out, had_errors)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncodingStrategy {
    override_encoding: Option<&'static Encoding>,
}

impl EncodingStrategy {
    pub fn new(override_label: Option<&str>) -> Result<Self> {
        let Some(label) = override_label else {
            return Ok(Self::default());
        };
        let trimmed = label.trim();
        let encoding = Encoding::for_label(trimmed.as_bytes())
            .ok_or_else(|| anyhow!("unknown encoding override '{trimmed}'"))?;
        Ok(Self {
            override_encoding: Some(encoding),
        })
    }

    pub fn decide(&self, bytes: &[u8]) -> EncodingDecision {
        if let Some(encoding) = self.override_encoding {
            return EncodingDecision {
                encoding,
                source: EncodingSource::Override,
            };
        }

        detect_auto(bytes)
    }

    /// NUL bytes near the start mean binary, unless the text is UTF-16.
    pub fn looks_binary(&self, bytes: &[u8]) -> bool {
        if self.override_encoding.is_some_and(is_utf16) || detect_bom(bytes).is_some_and(is_utf16) {
            return false;
        }
        bytes.iter().take(BINARY_CHECK_BYTES).any(|byte| *byte == 0)
    }

    pub fn decode(&self, bytes: &[u8]) -> DecodedText {
        let mut decision = self.decide(bytes);
        let had_bom = detect_bom(bytes).is_some();
        // a BOM beats the override; write back in whatever decode() used
        let (cow, used, had_errors) = decision.encoding.decode(bytes);
        if used != decision.encoding {
            decision = EncodingDecision {
                encoding: used,
                source: EncodingSource::Bom,
            };
        }
        DecodedText {
            text: cow.into_owned(),
            had_errors,
            had_bom,
            decision,
        }
    }
}

fn detect_auto(bytes: &[u8]) -> EncodingDecision {
    if let Some(encoding) = detect_bom(bytes) {
        return EncodingDecision {
            encoding,
            source: EncodingSource::Bom,
        };
    }

    if std::str::from_utf8(bytes).is_ok() {
        return EncodingDecision {
            encoding: UTF_8,
            source: EncodingSource::AssumedUtf8,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    EncodingDecision {
        encoding,
        source: EncodingSource::Detector,
    }
}

fn detect_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some(UTF_8);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(UTF_16LE);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(UTF_16BE);
    }

    None
}

fn is_utf16(encoding: &'static Encoding) -> bool {
    encoding == UTF_16LE || encoding == UTF_16BE
}

fn bom_for(encoding: &'static Encoding) -> &'static [u8] {
    if encoding == UTF_16LE {
        &[0xFF, 0xFE]
    } else if encoding == UTF_16BE {
        &[0xFE, 0xFF]
    } else if encoding == UTF_8 {
        &[0xEF, 0xBB, 0xBF]
    } else {
        &[]
    }
}
