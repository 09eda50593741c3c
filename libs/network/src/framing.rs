//! Text encodings and separator-based command framing
//!
//! Commands travel as text: received bytes are decoded with the module's
//! encoding and split on its separator, outgoing payloads are encoded and
//! terminated with the separator.

use gpio_config::service::framing::DEFAULT_ENCODING;
use gpio_types::{GpioError, Result};
use std::fmt;

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Invalid sequences decode to U+FFFD
    #[default]
    Utf8,
    /// 7-bit, bytes above 0x7F decode to U+FFFD
    Ascii,
    /// ISO-8859-1, every byte maps to the code point of the same value
    Latin1,
}

impl TextEncoding {
    /// Resolve an encoding name, defaulting to UTF-8 when none is configured
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        let name = name.unwrap_or(DEFAULT_ENCODING);
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(
                GpioError::configuration(format!("Encoding \"{}\" not supported.", name))
                    .into_fatal(),
            ),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Ascii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        char::from(b)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Ascii => {
                if text.is_ascii() {
                    Ok(text.as_bytes().to_vec())
                } else {
                    Err(self.unencodable(text))
                }
            }
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| self.unencodable(text)))
                .collect(),
        }
    }

    fn unencodable(self, text: &str) -> GpioError {
        GpioError::configuration(format!("\"{}\" cannot be encoded as {}", text, self)).into_fatal()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin-1",
        })
    }
}

/// Splits received payloads into command tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParser {
    encoding: TextEncoding,
    separator: String,
}

impl CommandParser {
    pub fn new(encoding: TextEncoding, separator: impl Into<String>) -> Self {
        Self {
            encoding,
            separator: separator.into(),
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Decode `payload` and split it into trimmed, non-empty tokens
    ///
    /// A payload without the separator is one token.
    pub fn parse(&self, payload: &[u8]) -> Vec<String> {
        let text = self.encoding.decode(payload);

        let pieces: Vec<&str> = if self.separator.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(self.separator.as_str()).collect()
        };

        pieces
            .into_iter()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_newline_separated_commands() {
        let parser = CommandParser::new(TextEncoding::Utf8, "\n");
        assert_eq!(parser.parse(b"OPEN\nCLOSE\n"), vec!["OPEN", "CLOSE"]);
    }

    #[test]
    fn test_payload_without_separator_is_single_token() {
        let parser = CommandParser::new(TextEncoding::Utf8, "\n");
        assert_eq!(parser.parse(b"PING"), vec!["PING"]);
    }

    #[test]
    fn test_tokens_are_trimmed_and_empties_dropped() {
        let parser = CommandParser::new(TextEncoding::Utf8, ";");
        assert_eq!(parser.parse(b" A ;;\r\nB\r\n; "), vec!["A", "B"]);
        assert!(parser.parse(b"").is_empty());
        assert!(parser.parse(b" ; ;").is_empty());
    }

    #[test]
    fn test_multi_character_separator() {
        let parser = CommandParser::new(TextEncoding::Utf8, "\r\n");
        assert_eq!(parser.parse(b"ON AIR\r\nOFF AIR"), vec!["ON AIR", "OFF AIR"]);
    }

    #[test]
    fn test_empty_separator_keeps_whole_payload() {
        let parser = CommandParser::new(TextEncoding::Utf8, "");
        assert_eq!(parser.parse(b"  START\n"), vec!["START"]);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(TextEncoding::from_name(None).unwrap(), TextEncoding::Utf8);
        assert_eq!(TextEncoding::from_name(Some("UTF8")).unwrap(), TextEncoding::Utf8);
        assert_eq!(TextEncoding::from_name(Some("us-ascii")).unwrap(), TextEncoding::Ascii);
        assert_eq!(TextEncoding::from_name(Some("ISO_8859-1")).unwrap(), TextEncoding::Latin1);

        let err = TextEncoding::from_name(Some("ebcdic")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_latin1_round_trip_and_limits() {
        let encoded = TextEncoding::Latin1.encode("Café").unwrap();
        assert_eq!(encoded, vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(TextEncoding::Latin1.decode(&encoded), "Café");
        assert!(TextEncoding::Latin1.encode("€").is_err());
    }

    #[test]
    fn test_ascii_rejects_non_ascii() {
        assert!(TextEncoding::Ascii.encode("Café").is_err());
        assert_eq!(TextEncoding::Ascii.decode(&[b'O', 0xC3, b'K']), "O\u{FFFD}K");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let parser = CommandParser::new(TextEncoding::Utf8, "\n");
        assert_eq!(parser.parse(&[b'G', 0xFF, b'O']), vec!["G\u{FFFD}O"]);
    }

    proptest! {
        #[test]
        fn prop_tokens_never_empty_nor_contain_separator(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            separator in prop::sample::select(vec!["\n", ";", "\r\n", "|"]),
        ) {
            let parser = CommandParser::new(TextEncoding::Utf8, separator);
            for token in parser.parse(&payload) {
                prop_assert!(!token.is_empty());
                prop_assert!(!token.contains(separator));
                prop_assert_eq!(token.trim(), token.as_str());
            }
        }

        #[test]
        fn prop_joined_tokens_parse_back(
            tokens in proptest::collection::vec("[A-Z0-9_]{1,12}", 0..16),
        ) {
            let parser = CommandParser::new(TextEncoding::Ascii, "\n");
            let payload = tokens.join("\n");
            prop_assert_eq!(parser.parse(payload.as_bytes()), tokens);
        }
    }
}
