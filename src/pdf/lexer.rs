//! PDF tokenizer.
//!
//! Low-level tokenization of PDF byte streams: numbers, literal and hex
//! strings, names (with `#xx` escapes), keywords and structural delimiters.
//! Whitespace (space, \t, \r, \n, \0, \f) and `%` comments are skipped,
//! except that `%PDF` / `%%EOF` handling happens above this layer on raw
//! bytes.
//!
//! Literal-string escape sequences and name escapes are decoded here; the
//! parser above works with fully decoded payloads.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    combinator::{map, opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};

/// Token types recognized by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer number (e.g. `42`, `-123`)
    Integer(i64),
    /// Real number (e.g. `3.14`, `-.5`)
    Real(f64),
    /// Literal or hex string, escapes decoded
    String(Vec<u8>),
    /// Name without the leading slash, `#xx` escapes decoded
    Name(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// `obj`
    Obj,
    /// `endobj`
    EndObj,
    /// `stream` (raw data follows; handled by the parser)
    Stream,
    /// `endstream`
    EndStream,
    /// `R` (indirect reference marker)
    RefMarker,
    /// Any other bare keyword (`xref`, `trailer`, `startxref`, …)
    Keyword(String),
}

/// True for PDF whitespace characters.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\0' | b'\x0c')
}

/// True for PDF delimiter characters.
pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Skip whitespace and comments. Always succeeds.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut rest = input;
    loop {
        let (r, _) = take_while::<_, _, nom::error::Error<&[u8]>>(is_whitespace)(rest)?;
        if r.first() == Some(&b'%') {
            let (r2, _) = take_till::<_, _, nom::error::Error<&[u8]>>(|b| b == b'\r' || b == b'\n')(r)?;
            rest = r2;
        } else {
            return Ok((r, ()));
        }
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parse a number token (integer or real).
fn number(input: &[u8]) -> IResult<&[u8], Token> {
    let (rest, matched) = recognize(tuple((
        opt(alt((tag("+"), tag("-")))),
        take_while(|b: u8| b.is_ascii_digit()),
        opt(pair(tag("."), take_while(|b: u8| b.is_ascii_digit()))),
    )))(input)?;
    let text = std::str::from_utf8(matched)
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))?;
    // recognize() can match an empty or sign-only string; reject those
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    if text.contains('.') {
        let v: f64 = text.parse().map_err(|_| {
            nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
        })?;
        Ok((rest, Token::Real(v)))
    } else {
        match text.parse::<i64>() {
            Ok(v) => Ok((rest, Token::Integer(v))),
            // overflowing integers degrade to reals, some generators emit them
            Err(_) => {
                let v: f64 = text.parse().map_err(|_| {
                    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
                })?;
                Ok((rest, Token::Real(v)))
            }
        }
    }
}

/// Parse a literal string `( ... )` with nested parentheses and escapes.
fn literal_string(input: &[u8]) -> IResult<&[u8], Token> {
    if input.first() != Some(&b'(') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 1usize;
    while i < input.len() {
        let b = input[i];
        match b {
            b'\\' => {
                i += 1;
                if i >= input.len() {
                    break;
                }
                match input[i] {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'(' => out.push(b'('),
                    b')' => out.push(b')'),
                    b'\\' => out.push(b'\\'),
                    b'\r' => {
                        // line continuation; swallow a following \n too
                        if input.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    d @ b'0'..=b'7' => {
                        let mut v = (d - b'0') as u16;
                        for _ in 0..2 {
                            match input.get(i + 1) {
                                Some(&n @ b'0'..=b'7') => {
                                    v = v * 8 + (n - b'0') as u16;
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((v & 0xff) as u8);
                    }
                    other => out.push(other),
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                out.push(b);
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], Token::String(out)));
                }
                out.push(b);
                i += 1;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeTill1,
    )))
}

/// Parse a hex string `<48656C6C6F>`; whitespace inside is ignored and an
/// odd final digit is padded with zero per the PDF convention.
fn hex_string(input: &[u8]) -> IResult<&[u8], Token> {
    if input.first() != Some(&b'<') || input.get(1) == Some(&b'<') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut out = Vec::new();
    let mut pending: Option<u8> = None;
    let mut i = 1usize;
    while i < input.len() {
        let b = input[i];
        if b == b'>' {
            if let Some(hi) = pending {
                out.push(hi << 4);
            }
            return Ok((&input[i + 1..], Token::String(out)));
        }
        if let Some(v) = hex_val(b) {
            match pending.take() {
                Some(hi) => out.push((hi << 4) | v),
                None => pending = Some(v),
            }
        } else if !is_whitespace(b) {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            )));
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeTill1,
    )))
}

/// Parse a name token `/Name` decoding `#xx` escapes.
fn name(input: &[u8]) -> IResult<&[u8], Token> {
    let (rest, raw) = preceded(tag("/"), take_while(is_regular))(input)?;
    let mut out = String::with_capacity(raw.len());
    let mut i = 0usize;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_val(raw[i + 1]), hex_val(raw[i + 2])) {
                out.push(((hi << 4) | lo) as char);
                i += 3;
                continue;
            }
        }
        out.push(raw[i] as char);
        i += 1;
    }
    Ok((rest, Token::Name(out)))
}

/// Parse a bare keyword made of regular characters.
fn keyword(input: &[u8]) -> IResult<&[u8], Token> {
    let (rest, word) = take_while1(is_regular)(input)?;
    let tok = match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::Obj,
        b"endobj" => Token::EndObj,
        b"stream" => Token::Stream,
        b"endstream" => Token::EndStream,
        b"R" => Token::RefMarker,
        other => Token::Keyword(String::from_utf8_lossy(other).into_owned()),
    };
    Ok((rest, tok))
}

/// Lex a single token, skipping leading whitespace and comments.
pub fn lex_token(input: &[u8]) -> IResult<&[u8], Token> {
    let (input, _) = skip_ws(input)?;
    alt((
        map(tag("<<"), |_| Token::DictStart),
        map(tag(">>"), |_| Token::DictEnd),
        value(Token::ArrayStart, tag("[")),
        value(Token::ArrayEnd, tag("]")),
        name,
        literal_string,
        hex_string,
        number,
        keyword,
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &[u8]) -> Token {
        lex_token(input).expect("token").1
    }

    #[test]
    fn numbers() {
        assert_eq!(one(b" 42 "), Token::Integer(42));
        assert_eq!(one(b"-17"), Token::Integer(-17));
        assert_eq!(one(b"3.14"), Token::Real(3.14));
        assert_eq!(one(b"-.5"), Token::Real(-0.5));
    }

    #[test]
    fn strings() {
        assert_eq!(one(b"(hello)"), Token::String(b"hello".to_vec()));
        assert_eq!(one(b"(a(b)c)"), Token::String(b"a(b)c".to_vec()));
        assert_eq!(one(br"(a\)b)"), Token::String(b"a)b".to_vec()));
        assert_eq!(one(br"(\101)"), Token::String(b"A".to_vec()));
        assert_eq!(one(b"<414243>"), Token::String(b"ABC".to_vec()));
        assert_eq!(one(b"<41 42 43>"), Token::String(b"ABC".to_vec()));
        // odd digit pads with zero
        assert_eq!(one(b"<4>"), Token::String(vec![0x40]));
    }

    #[test]
    fn names_and_keywords() {
        assert_eq!(one(b"/Type"), Token::Name("Type".into()));
        assert_eq!(one(b"/A#20B"), Token::Name("A B".into()));
        assert_eq!(one(b"true"), Token::True);
        assert_eq!(one(b"endobj"), Token::EndObj);
        assert_eq!(one(b"R"), Token::RefMarker);
        assert_eq!(one(b"xref"), Token::Keyword("xref".into()));
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(one(b"% remark\n /Next"), Token::Name("Next".into()));
    }

    #[test]
    fn delimiters() {
        assert_eq!(one(b"<< /K 1 >>"), Token::DictStart);
        assert_eq!(one(b"[1 2]"), Token::ArrayStart);
    }
}
