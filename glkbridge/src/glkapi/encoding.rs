/*

Stream text encodings
=====================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use super::arrays::{narrow_latin1, QUESTION_MARK};

const MAX_UNICODE: u32 = 0x10FFFF;

/** How characters are stored in the bytes of a file or resource stream */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextEncoding {
    /** One byte per character; wider characters are written as `?` */
    Latin1,
    /** Text mode Unicode streams */
    Utf8,
    /** Binary mode Unicode streams: four big-endian bytes per character */
    Utf32Be,
}

impl TextEncoding {
    pub fn new(unicode: bool, binary: bool) -> Self {
        match (unicode, binary) {
            (false, _) => TextEncoding::Latin1,
            (true, false) => TextEncoding::Utf8,
            (true, true) => TextEncoding::Utf32Be,
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("malformed UTF-8 at byte {0}")]
pub struct MalformedUtf8(pub usize);

/** Append one encoded character */
pub fn encode_char(encoding: TextEncoding, ch: u32, out: &mut Vec<u8>) {
    match encoding {
        TextEncoding::Latin1 => out.push(narrow_latin1(ch)),
        TextEncoding::Utf8 => encode_utf8_char(ch, out),
        TextEncoding::Utf32Be => {
            let mut bytes = [0; 4];
            BigEndian::write_u32(&mut bytes, ch);
            out.extend_from_slice(&bytes);
        },
    }
}

/** Overwrite or extend `buf` at `pos` with one encoded character, returning the new position */
pub fn write_char_at(encoding: TextEncoding, ch: u32, buf: &mut Vec<u8>, pos: usize) -> usize {
    let mut encoded = Vec::with_capacity(4);
    encode_char(encoding, ch, &mut encoded);
    let end = pos + encoded.len();
    if end > buf.len() {
        buf.resize(end, 0);
    }
    buf[pos..end].copy_from_slice(&encoded);
    end
}

/** Read one character from `buf` at `*pos`. `None` at the end of the data */
pub fn decode_char(encoding: TextEncoding, buf: &[u8], pos: &mut usize) -> Option<Result<u32, MalformedUtf8>> {
    if *pos >= buf.len() {
        return None;
    }
    match encoding {
        TextEncoding::Latin1 => {
            let ch = buf[*pos] as u32;
            *pos += 1;
            Some(Ok(ch))
        },
        TextEncoding::Utf8 => Some(decode_utf8_char(buf, pos)),
        TextEncoding::Utf32Be => {
            // A trailing partial character is dropped
            if *pos + 4 > buf.len() {
                *pos = buf.len();
                return None;
            }
            let ch = BigEndian::read_u32(&buf[*pos..*pos + 4]);
            *pos += 4;
            Some(Ok(ch))
        },
    }
}

/** Encode a code point as UTF-8 without validating surrogates */
pub fn encode_utf8_char(ch: u32, out: &mut Vec<u8>) {
    if ch < 0x80 {
        out.push(ch as u8);
    }
    else if ch < 0x800 {
        out.push(0xC0 | (ch >> 6) as u8);
        out.push(0x80 | (ch & 0x3F) as u8);
    }
    else if ch < 0x10000 {
        out.push(0xE0 | (ch >> 12) as u8);
        out.push(0x80 | ((ch >> 6) & 0x3F) as u8);
        out.push(0x80 | (ch & 0x3F) as u8);
    }
    else if ch <= MAX_UNICODE {
        out.push(0xF0 | (ch >> 18) as u8);
        out.push(0x80 | ((ch >> 12) & 0x3F) as u8);
        out.push(0x80 | ((ch >> 6) & 0x3F) as u8);
        out.push(0x80 | (ch & 0x3F) as u8);
    }
    else {
        out.push(QUESTION_MARK as u8);
    }
}

pub fn encode_utf8(chars: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(chars.len());
    for &ch in chars {
        encode_utf8_char(ch, &mut out);
    }
    out
}

/** Decode one UTF-8 sequence of 1 to 4 bytes. Truncated sequences and bad continuation bytes are errors */
pub fn decode_utf8_char(buf: &[u8], pos: &mut usize) -> Result<u32, MalformedUtf8> {
    let start = *pos;
    let lead = buf[start];
    let (len, initial) = match lead {
        0x00..=0x7F => (1, lead as u32),
        0xC0..=0xDF => (2, (lead & 0x1F) as u32),
        0xE0..=0xEF => (3, (lead & 0x0F) as u32),
        0xF0..=0xF7 => (4, (lead & 0x07) as u32),
        _ => return Err(MalformedUtf8(start)),
    };
    if start + len > buf.len() {
        return Err(MalformedUtf8(start));
    }
    let mut ch = initial;
    for &byte in &buf[start + 1..start + len] {
        if byte & 0xC0 != 0x80 {
            return Err(MalformedUtf8(start));
        }
        ch = (ch << 6) | (byte & 0x3F) as u32;
    }
    *pos = start + len;
    Ok(ch)
}

pub fn decode_utf8(buf: &[u8]) -> Result<Vec<u32>, MalformedUtf8> {
    let mut pos = 0;
    let mut chars = Vec::with_capacity(buf.len());
    while pos < buf.len() {
        chars.push(decode_utf8_char(buf, &mut pos)?);
    }
    Ok(chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_lengths() {
        assert_eq!(encode_utf8(&[0x41]), vec![0x41]);
        assert_eq!(encode_utf8(&[0xE9]), vec![0xC3, 0xA9]);
        assert_eq!(encode_utf8(&[0x20AC]), vec![0xE2, 0x82, 0xAC]);
        assert_eq!(encode_utf8(&[0x1F600]), vec![0xF0, 0x9F, 0x98, 0x80]);
        assert_eq!(encode_utf8(&[0x110000]), vec![b'?']);
    }

    #[test]
    fn malformed_utf8() {
        assert_eq!(decode_utf8(&[0xC3, 0x41]), Err(MalformedUtf8(0)));
        assert_eq!(decode_utf8(&[0x41, 0xE2, 0x82]), Err(MalformedUtf8(1)));
        assert_eq!(decode_utf8(&[0x80]), Err(MalformedUtf8(0)));
    }

    #[test]
    fn utf32_and_latin1() {
        let mut buf = Vec::new();
        encode_char(TextEncoding::Utf32Be, 0x1F600, &mut buf);
        encode_char(TextEncoding::Latin1, 0x1F600, &mut buf);
        assert_eq!(buf, vec![0, 1, 0xF6, 0, b'?']);
        let mut pos = 0;
        assert_eq!(decode_char(TextEncoding::Utf32Be, &buf, &mut pos), Some(Ok(0x1F600)));
        assert_eq!(decode_char(TextEncoding::Latin1, &buf, &mut pos), Some(Ok('?' as u32)));
        assert_eq!(decode_char(TextEncoding::Latin1, &buf, &mut pos), None);
    }

    #[test]
    fn overwrite_in_place() {
        let mut buf = b"abc".to_vec();
        let pos = write_char_at(TextEncoding::Utf8, 0xE9, &mut buf, 2);
        assert_eq!(pos, 4);
        assert_eq!(buf, vec![b'a', b'b', 0xC3, 0xA9]);
    }
}
