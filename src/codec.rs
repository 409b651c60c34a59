//! Document encoding
//!
//! Documents are canonical JSON, optionally passed through the lz-string
//! `compressToUTF16` transform. The transform only emits valid UTF-16 code
//! units, so the compressed form is itself a valid string and the files stay
//! byte-compatible with stores written by the mobile app.
//!
//! Decoding accepts both shapes: a compressed document is recognized by
//! decompressing to text that parses as JSON; anything else is parsed as
//! plain JSON.
//!
//! `compressToUTF16` maps every 15-bit chunk to `chunk + 32`, so a compressed
//! payload never contains a code unit below U+0020. Text that does (the
//! newlines and tabs of pretty-printed JSON) is not handed to the
//! decompressor at all, and neither is text opening with `{` or `[`: the
//! first unit of a compressed JSON document is always well above ASCII.

use serde_json::Value;

/// How a stored document was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Compressed,
    Plain,
}

/// Compress a JSON text with lz-string's UTF-16 transform.
pub fn compress(json: &str) -> String {
    lz_str::compress_to_utf16(json)
}

/// Lowest code unit `compressToUTF16` emits
const UTF16_OFFSET: u16 = 32;

/// Whether `content` could have been produced by [`compress`].
pub fn is_compressed_shape(content: &str) -> bool {
    !content.is_empty()
        && !content.starts_with(['{', '['])
        && content.encode_utf16().all(|unit| unit >= UTF16_OFFSET)
}

/// Decompress lz-string UTF-16 text.
///
/// Returns `None` when the input is not a compressed payload or decompresses
/// to nothing.
pub fn decompress(content: &str) -> Option<String> {
    if !is_compressed_shape(content) {
        return None;
    }
    let units = lz_str::decompress_from_utf16(content)?;
    let text = String::from_utf16(&units).ok()?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Encode a JSON value for storage.
pub fn encode(value: &Value, compressed: bool) -> serde_json::Result<String> {
    if compressed {
        Ok(compress(&serde_json::to_string(value)?))
    } else {
        serde_json::to_string_pretty(value)
    }
}

/// Decode stored text: decompression first, plain JSON as the fallback.
///
/// On failure the error describes both attempts.
pub fn decode(content: &str) -> Result<(Value, Encoding), String> {
    let decompressed = decompress(content);
    if let Some(text) = &decompressed {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return Ok((value, Encoding::Compressed));
        }
    }

    match serde_json::from_str::<Value>(content) {
        Ok(value) => Ok((value, Encoding::Plain)),
        Err(err) => {
            let first = if decompressed.is_some() {
                "decompressed text is not JSON"
            } else {
                "not a compressed payload"
            };
            Err(format!("{first}; plain JSON parse failed: {err}"))
        }
    }
}
