//! PDF object parser.
//!
//! Combines lexer tokens into [`Object`] values: arrays, dictionaries,
//! streams and indirect references. Stream payloads are captured raw; filter
//! decoding happens in [`crate::pdf::decode`].
//!
//! The parser never resolves indirect references. When a stream's `/Length`
//! is itself a reference the payload boundary is recovered by scanning for
//! the `endstream` keyword instead, which is what the repair path of most
//! readers does for broken length entries anyway.

use super::lexer::{is_whitespace, lex_token, skip_ws, Token};
use super::object::{Dict, ObjRef, Object};
use crate::error::{Error, Result};

/// Parse one object starting at `input`, returning the remaining bytes.
pub fn parse_object(input: &[u8]) -> Result<(Object, &[u8])> {
    let (rest, tok) = lex_token(input).map_err(|_| parse_err(input, "expected object"))?;
    match tok {
        Token::Null => Ok((Object::Null, rest)),
        Token::True => Ok((Object::Boolean(true), rest)),
        Token::False => Ok((Object::Boolean(false), rest)),
        Token::Real(v) => Ok((Object::Real(v), rest)),
        Token::String(s) => Ok((Object::String(s), rest)),
        Token::Name(n) => Ok((Object::Name(n), rest)),
        Token::Integer(v) => parse_possible_reference(v, rest),
        Token::ArrayStart => parse_array(rest),
        Token::DictStart => parse_dict_or_stream(rest),
        other => Err(parse_err(input, &format!("unexpected token {:?}", other))),
    }
}

/// `int` may begin an indirect reference `num gen R`. Look ahead two tokens;
/// back off to the bare integer when the pattern does not hold.
fn parse_possible_reference(first: i64, rest: &[u8]) -> Result<(Object, &[u8])> {
    if first >= 0 {
        if let Ok((r1, Token::Integer(gen))) = lex_token(rest) {
            if (0..=u16::MAX as i64).contains(&gen) {
                if let Ok((r2, Token::RefMarker)) = lex_token(r1) {
                    return Ok((
                        Object::Reference(ObjRef::new(first as u32, gen as u16)),
                        r2,
                    ));
                }
            }
        }
    }
    Ok((Object::Integer(first), rest))
}

fn parse_array(mut input: &[u8]) -> Result<(Object, &[u8])> {
    let mut items = Vec::new();
    loop {
        if let Ok((rest, Token::ArrayEnd)) = lex_token(input) {
            return Ok((Object::Array(items), rest));
        }
        let (obj, rest) = parse_object(input)?;
        items.push(obj);
        input = rest;
    }
}

fn parse_dict_entries(mut input: &[u8]) -> Result<(Dict, &[u8])> {
    let mut dict = Dict::new();
    loop {
        match lex_token(input) {
            Ok((rest, Token::DictEnd)) => return Ok((dict, rest)),
            Ok((rest, Token::Name(key))) => {
                let (val, rest2) = parse_object(rest)?;
                dict.insert(key, val);
                input = rest2;
            }
            _ => return Err(parse_err(input, "expected name key or >> in dictionary")),
        }
    }
}

/// Parse a dictionary; when the `stream` keyword follows, capture the raw
/// stream payload as well.
fn parse_dict_or_stream(input: &[u8]) -> Result<(Object, &[u8])> {
    let (dict, rest) = parse_dict_entries(input)?;
    let (after_ws, _) = skip_ws(rest).map_err(|_| parse_err(rest, "whitespace"))?;
    if !after_ws.starts_with(b"stream") {
        return Ok((Object::Dictionary(dict), rest));
    }
    let mut data_start = &after_ws[b"stream".len()..];
    // ISO 32000: the stream keyword is followed by CRLF or LF, not a bare CR
    if data_start.starts_with(b"\r\n") {
        data_start = &data_start[2..];
    } else if data_start.starts_with(b"\n") {
        data_start = &data_start[1..];
    } else if data_start.starts_with(b"\r") {
        data_start = &data_start[1..];
    }

    let declared_len = dict.get("Length").and_then(Object::as_int);
    if let Some(len) = declared_len {
        let len = len.max(0) as usize;
        if len <= data_start.len() {
            let tail = &data_start[len..];
            if endstream_follows(tail) {
                let data = data_start[..len].to_vec();
                let rest = skip_past_endstream(tail);
                return Ok((Object::Stream { dict, data }, rest));
            }
        }
    }
    // Length missing, indirect, or wrong: recover by scanning for endstream
    match find_subslice(data_start, b"endstream") {
        Some(pos) => {
            let mut end = pos;
            // strip the EOL that precedes endstream
            if end > 0 && data_start[end - 1] == b'\n' {
                end -= 1;
            }
            if end > 0 && data_start[end - 1] == b'\r' {
                end -= 1;
            }
            let data = data_start[..end].to_vec();
            let rest = &data_start[pos + b"endstream".len()..];
            Ok((Object::Stream { dict, data }, rest))
        }
        None => Err(parse_err(data_start, "unterminated stream")),
    }
}

fn endstream_follows(tail: &[u8]) -> bool {
    let mut i = 0;
    while i < tail.len() && is_whitespace(tail[i]) {
        i += 1;
    }
    tail[i..].starts_with(b"endstream")
}

fn skip_past_endstream(tail: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < tail.len() && is_whitespace(tail[i]) {
        i += 1;
    }
    &tail[i + b"endstream".len()..]
}

/// Parse an indirect object `num gen obj … endobj` at `input`.
///
/// The trailing `endobj` is tolerated missing (several generators drop it on
/// the last object of a revision); parsing stops after the body either way.
pub fn parse_indirect(input: &[u8]) -> Result<(ObjRef, Object, &[u8])> {
    let (rest, t1) = lex_token(input).map_err(|_| parse_err(input, "object number"))?;
    let (rest, t2) = lex_token(rest).map_err(|_| parse_err(input, "generation number"))?;
    let (rest, t3) = lex_token(rest).map_err(|_| parse_err(input, "obj keyword"))?;
    let (num, gen) = match (t1, t2, t3) {
        (Token::Integer(n), Token::Integer(g), Token::Obj)
            if n >= 0 && (0..=u16::MAX as i64).contains(&g) =>
        {
            (n as u32, g as u16)
        }
        _ => return Err(parse_err(input, "expected `num gen obj`")),
    };
    let (body, rest) = parse_object(rest)?;
    let rest = match lex_token(rest) {
        Ok((r, Token::EndObj)) => r,
        _ => rest,
    };
    Ok((ObjRef::new(num, gen), body, rest))
}

/// Byte-wise subslice search.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_err(at: &[u8], reason: &str) -> Error {
    Error::Parse {
        offset: at.len(), // callers translate: distance from end of buffer
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_objects() {
        assert_eq!(parse_object(b"null ").unwrap().0, Object::Null);
        assert_eq!(parse_object(b"42").unwrap().0, Object::Integer(42));
        assert_eq!(
            parse_object(b"(hi)").unwrap().0,
            Object::String(b"hi".to_vec())
        );
    }

    #[test]
    fn reference_lookahead() {
        let (obj, _) = parse_object(b"12 0 R").unwrap();
        assert_eq!(obj, Object::Reference(ObjRef::new(12, 0)));
        // `7 8` followed by something else stays two integers
        let (obj, rest) = parse_object(b"7 8 9").unwrap();
        assert_eq!(obj, Object::Integer(7));
        let (obj2, _) = parse_object(rest).unwrap();
        assert_eq!(obj2, Object::Integer(8));
    }

    #[test]
    fn arrays_and_dicts() {
        let (obj, _) = parse_object(b"[1 2 /Three (four)]").unwrap();
        let arr = obj.as_array().unwrap().to_vec();
        assert_eq!(arr.len(), 4);

        let (obj, _) = parse_object(b"<< /Type /Page /Count 3 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("Page"));
        assert_eq!(dict.get("Count").and_then(Object::as_int), Some(3));
    }

    #[test]
    fn stream_with_length() {
        let src = b"<< /Length 5 >>\nstream\nhello\nendstream rest";
        let (obj, rest) = parse_object(src).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(data, b"hello"),
            other => panic!("expected stream, got {:?}", other),
        }
        assert!(rest.starts_with(b" rest"));
    }

    #[test]
    fn stream_with_broken_length_recovers() {
        let src = b"<< /Length 99 >>\nstream\nhello\nendstream";
        let (obj, _) = parse_object(src).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(data, b"hello"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn indirect_object() {
        let src = b"4 0 obj << /Type /Catalog >> endobj tail";
        let (id, obj, rest) = parse_indirect(src).unwrap();
        assert_eq!(id, ObjRef::new(4, 0));
        assert!(obj.as_dict().is_some());
        assert!(rest.starts_with(b" tail"));
    }
}
