//! Key/value codec
//!
//! Turns serde values into whitespace-free strings and back.
//!
//! Slot records are tokenized on whitespace, so the compact JSON text is
//! percent-escaped: `%` and every whitespace character become `%XX` per
//! UTF-8 byte. Compact JSON only contains such characters inside string
//! literals, so the escaping never touches structure.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Serialize `value` into a string with no whitespace characters
pub fn stringify<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    Ok(escape(&json))
}

/// Inverse of [`stringify`]
pub fn parse<T: DeserializeOwned>(encoded: &str) -> Result<T> {
    let json = unescape(encoded)?;
    Ok(serde_json::from_str(&json)?)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c == '%' || c.is_whitespace() {
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'%' {
            let hex = text
                .get(pos + 1..pos + 3)
                .ok_or_else(|| StoreError::Serialization(format!("truncated escape in {:?}", text)))?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| {
                StoreError::Serialization(format!("bad escape %{} in {:?}", hex, text))
            })?;
            out.push(byte);
            pos += 3;
        } else {
            out.push(bytes[pos]);
            pos += 1;
        }
    }
    String::from_utf8(out).map_err(|e| StoreError::Serialization(e.to_string()))
}
