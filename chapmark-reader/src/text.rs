//! Text decoding for tag and chapter strings

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};

/// ID3v2 text encoding byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1,
    /// UTF-16 with a byte-order mark (little endian without one)
    Utf16,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    /// Map the encoding byte; unknown values fall back to ISO-8859-1
    pub fn from_id3(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16Be,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Latin1,
        }
    }

    fn is_wide(self) -> bool {
        matches!(self, TextEncoding::Utf16 | TextEncoding::Utf16Be)
    }

    /// Decode `bytes`, stopping at the first terminator
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _) = self.decode_terminated(bytes);
        text
    }

    /// Decode up to the first terminator
    ///
    /// Returns the text and the number of bytes consumed including the
    /// terminator (or the whole input when unterminated).
    pub fn decode_terminated(self, bytes: &[u8]) -> (String, usize) {
        let (content, consumed) = split_terminated(bytes, self.is_wide());
        let text = match self {
            TextEncoding::Latin1 => encoding_rs::mem::decode_latin1(content).into_owned(),
            TextEncoding::Utf16 => decode_utf16_with_bom(content),
            TextEncoding::Utf16Be => UTF_16BE.decode_without_bom_handling(content).0.into_owned(),
            TextEncoding::Utf8 => UTF_8.decode_with_bom_removal(content).0.into_owned(),
        };
        (text, consumed)
    }
}

fn split_terminated(bytes: &[u8], wide: bool) -> (&[u8], usize) {
    let end = if wide {
        bytes
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|index| index * 2)
    } else {
        bytes.iter().position(|byte| *byte == 0)
    };

    match end {
        Some(end) => (&bytes[..end], end + if wide { 2 } else { 1 }),
        None => (bytes, bytes.len()),
    }
}

/// UTF-16 honoring a leading byte-order mark, little endian otherwise
pub fn decode_utf16_with_bom(bytes: &[u8]) -> String {
    let (encoding, content) = match bytes {
        [0xFE, 0xFF, rest @ ..] => (UTF_16BE, rest),
        [0xFF, 0xFE, rest @ ..] => (UTF_16LE, rest),
        _ => (UTF_16LE, bytes),
    };
    encoding.decode_without_bom_handling(content).0.into_owned()
}

/// UTF-8 that switches to UTF-16 when the bytes start with a byte-order mark
///
/// This is how QuickTime chapter text samples are stored.
pub fn decode_sample_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, ..] | [0xFF, 0xFE, ..] => decode_utf16_with_bom(bytes),
        _ => UTF_8.decode_with_bom_removal(bytes).0.into_owned(),
    }
}

/// UTF-8 string element, trimmed of trailing NUL padding
pub fn decode_padded_utf8(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|byte| *byte != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Latin-1 decoding (every byte maps to one code point)
pub fn decode_latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_stops_at_nul() {
        let (text, consumed) = TextEncoding::Latin1.decode_terminated(b"Caf\xe9\0rest");
        assert_eq!(text, "Café");
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_utf16_with_bom_both_orders() {
        let le = [0xFF, 0xFE, b'H', 0, b'i', 0, 0, 0, b'x', 0];
        let (text, consumed) = TextEncoding::Utf16.decode_terminated(&le);
        assert_eq!(text, "Hi");
        assert_eq!(consumed, 8);

        let be = [0xFE, 0xFF, 0, b'H', 0, b'i'];
        assert_eq!(TextEncoding::Utf16.decode(&be), "Hi");
    }

    #[test]
    fn test_utf16_ignores_utf8_bom() {
        assert_eq!(decode_utf16_with_bom(&[0xEF, 0xBB, 0xBF, 0x00]), "\u{BBEF}\u{00BF}");
        assert_eq!(decode_utf16_with_bom(&[b'O', 0, b'k', 0]), "Ok");
    }

    #[test]
    fn test_utf16_terminator_is_aligned() {
        // 0x0100 followed by 0x0041: the zero bytes straddle a code unit boundary
        let be = [0x01, 0x00, 0x00, 0x41, 0x00, 0x00];
        let (text, consumed) = TextEncoding::Utf16Be.decode_terminated(&be);
        assert_eq!(text, "\u{0100}A");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_utf8_unterminated_uses_everything() {
        let (text, consumed) = TextEncoding::Utf8.decode_terminated("Kapitel Zwölf".as_bytes());
        assert_eq!(text, "Kapitel Zwölf");
        assert_eq!(consumed, "Kapitel Zwölf".len());
    }

    #[test]
    fn test_unknown_encoding_is_latin1() {
        assert_eq!(TextEncoding::from_id3(7), TextEncoding::Latin1);
    }

    #[test]
    fn test_sample_text() {
        assert_eq!(decode_sample_text("Intro".as_bytes()), "Intro");
        assert_eq!(decode_sample_text(&[0xFE, 0xFF, 0, b'A']), "A");
    }

    #[test]
    fn test_padded_utf8() {
        assert_eq!(decode_padded_utf8(b"webm\0\0"), "webm");
        assert_eq!(decode_padded_utf8(b"\0\0"), "");
    }
}
