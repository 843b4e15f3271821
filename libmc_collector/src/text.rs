use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::constants::{GZIP_MAGIC, WINDOWS_1252_UNDEFINED};
use super::error::DecodeError;

/// A text codec that may be tried on the raw bytes of a file.
///
/// Codecs are tried in the configured order; the first that succeeds wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCodec {
    /// Strict UTF-8
    Utf8,
    /// Strict UTF-8 with an optional byte-order mark stripped
    Utf8Sig,
    /// Windows-1252, rejecting the five byte values the code page leaves undefined
    Windows1252,
    Latin1,
    /// UTF-8 with invalid sequences replaced by U+FFFD. Never fails.
    LossyUtf8,
}

impl TextCodec {
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(String::from),
            Self::Utf8Sig => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(String::from)
            }
            Self::Windows1252 => {
                // encoding_rs maps the undefined bytes to C1 controls, so it never fails alone
                if bytes.iter().any(|b| WINDOWS_1252_UNDEFINED.contains(b)) {
                    return None;
                }
                encoding_rs::WINDOWS_1252
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(|s| s.into_owned())
            }
            Self::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Self::LossyUtf8 => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::LossyUtf8)
    }

    pub fn default_chain() -> Vec<Self> {
        vec![Self::Utf8Sig, Self::Windows1252, Self::LossyUtf8]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
}

/// The decoded contents of a text file and how they were obtained
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub codec: TextCodec,
    pub compression: Compression,
}

impl DecodedText {
    /// True if decoding needed a lossy codec, i.e. some bytes may have been replaced
    pub fn is_lossy(&self) -> bool {
        self.codec.is_lossy()
    }
}

/// Run the codec chain over a byte buffer
pub fn decode_bytes(bytes: &[u8], codecs: &[TextCodec]) -> Option<(String, TextCodec)> {
    codecs
        .iter()
        .find_map(|codec| codec.decode(bytes).map(|text| (text, *codec)))
}

/// Read a text file, transparently decompressing gzip (detected by its magic bytes).
///
/// The file handle is released when this returns, on every path.
pub fn read_text(path: &Path, codecs: &[TextCodec]) -> Result<DecodedText, DecodeError> {
    if codecs.is_empty() {
        return Err(DecodeError::NoCodecs);
    }
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;

    let (bytes, compression) = if raw.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut inflated)?;
        (inflated, Compression::Gzip)
    } else {
        (raw, Compression::Plain)
    };

    match decode_bytes(&bytes, codecs) {
        Some((text, codec)) => Ok(DecodedText {
            text,
            codec,
            compression,
        }),
        None => Err(DecodeError::Exhausted(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_first_codec_wins() {
        let (text, codec) = decode_bytes("abc".as_bytes(), &TextCodec::default_chain()).unwrap();
        assert_eq!(text, "abc");
        assert_eq!(codec, TextCodec::Utf8Sig);
    }

    #[test]
    fn test_bom_is_stripped() {
        let (text, _) = decode_bytes(b"\xEF\xBB\xBF1.0", &[TextCodec::Utf8Sig]).unwrap();
        assert_eq!(text, "1.0");
    }

    #[test]
    fn test_fallback_to_windows1252() {
        // 0xB5 is the micro sign in cp1252 and invalid as a lone UTF-8 byte
        let (text, codec) = decode_bytes(b"5 \xB5m", &TextCodec::default_chain()).unwrap();
        assert_eq!(codec, TextCodec::Windows1252);
        assert_eq!(text, "5 \u{b5}m");
    }

    #[test]
    fn test_undefined_windows1252_bytes_fall_through() {
        for byte in WINDOWS_1252_UNDEFINED {
            assert!(TextCodec::Windows1252.decode(&[b'1', byte]).is_none(), "{byte:#x}");
        }
        let (text, codec) =
            decode_bytes(b"\x81\x8d\xff\xfe garbage", &TextCodec::default_chain()).unwrap();
        assert_eq!(codec, TextCodec::LossyUtf8);
        assert!(text.ends_with(" garbage"));
        assert!(text.starts_with('\u{FFFD}'));
    }

    #[test]
    fn test_exhausted_chain() {
        assert!(decode_bytes(b"\xFF\xFE", &[TextCodec::Utf8]).is_none());
        let (text, codec) = decode_bytes(b"\xFF", &[TextCodec::Utf8, TextCodec::LossyUtf8]).unwrap();
        assert!(codec.is_lossy());
        assert_eq!(text, "\u{FFFD}");
    }

    #[test]
    fn test_read_gzip_and_plain() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.ascii");
        std::fs::write(&plain, "1.0\n2.0\n").unwrap();
        let decoded = read_text(&plain, &TextCodec::default_chain()).unwrap();
        assert_eq!(decoded.compression, Compression::Plain);
        assert_eq!(decoded.text, "1.0\n2.0\n");

        let zipped = dir.path().join("zipped.ascii");
        let mut enc = GzEncoder::new(
            std::fs::File::create(&zipped).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(b"3.0\n4.0\n").unwrap();
        enc.finish().unwrap();
        let decoded = read_text(&zipped, &TextCodec::default_chain()).unwrap();
        assert_eq!(decoded.compression, Compression::Gzip);
        assert_eq!(decoded.text, "3.0\n4.0\n");
    }

    #[test]
    fn test_read_exhausted_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ascii");
        std::fs::write(&path, b"\xFF\xFE\xFD").unwrap();
        assert!(matches!(
            read_text(&path, &[TextCodec::Utf8]),
            Err(DecodeError::Exhausted(_))
        ));
        assert!(matches!(read_text(&path, &[]), Err(DecodeError::NoCodecs)));
    }
}
