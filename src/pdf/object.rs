//! PDF object model.
//!
//! The object model is deliberately small: the pipeline only ever reads
//! PDFs, so there is no writer-side state here. Dictionaries keep insertion
//! order because the raw metadata view exposed to reports must list keys in
//! the order the container advertised them.

use indexmap::IndexMap;

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef {
    /// Object number
    pub num: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjRef {
    /// Create a new object reference.
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl std::fmt::Display for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

/// Dictionary type: name keys to objects, insertion-ordered.
pub type Dict = IndexMap<String, Object>;

/// A parsed PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String payload (escape sequences already decoded; encoding unknown)
    String(Vec<u8>),
    /// Name (without the leading `/`; `#xx` escapes decoded)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary
    Dictionary(Dict),
    /// Stream: dictionary plus raw (still encoded) data
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Raw stream bytes, filters not yet applied
        data: Vec<u8>,
    },
    /// Indirect reference
    Reference(ObjRef),
}

impl Object {
    /// Cast to integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Cast to a float, accepting integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Cast to string bytes.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Cast to array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Cast to dictionary; streams expose their dictionary too.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Cast to reference.
    pub fn as_ref_id(&self) -> Option<ObjRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// True if this is the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode the string payload as text.
    ///
    /// PDF text strings are either UTF-16BE (BOM `FE FF`) or PDFDocEncoding,
    /// which for the characters we care about coincides with Latin-1.
    pub fn as_text(&self) -> Option<String> {
        let bytes = self.as_string()?;
        Some(decode_text_string(bytes))
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let mut out = String::new();
        let mut units = Vec::with_capacity(bytes.len() / 2);
        let mut it = bytes[2..].chunks_exact(2);
        for pair in &mut it {
            units.push(u16::from_be_bytes([pair[0], pair[1]]));
        }
        for c in char::decode_utf16(units.into_iter()) {
            out.push(c.unwrap_or('\u{FFFD}'));
        }
        out
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts() {
        assert_eq!(Object::Integer(7).as_int(), Some(7));
        assert_eq!(Object::Integer(7).as_float(), Some(7.0));
        assert_eq!(Object::Real(1.5).as_float(), Some(1.5));
        assert_eq!(Object::Name("Type".into()).as_name(), Some("Type"));
        assert!(Object::Null.is_null());
        assert_eq!(Object::Boolean(true).as_bool(), Some(true));
    }

    #[test]
    fn stream_exposes_dict() {
        let mut dict = Dict::new();
        dict.insert("Length".into(), Object::Integer(0));
        let s = Object::Stream { dict, data: vec![] };
        assert!(s.as_dict().is_some());
    }

    #[test]
    fn text_string_latin1_and_utf16() {
        assert_eq!(decode_text_string(b"Facture"), "Facture");
        assert_eq!(decode_text_string(&[0xE9]), "é");
        let utf16 = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9];
        assert_eq!(decode_text_string(&utf16), "Aé");
    }

    #[test]
    fn objref_display() {
        assert_eq!(ObjRef::new(12, 0).to_string(), "12 0 R");
    }
}
