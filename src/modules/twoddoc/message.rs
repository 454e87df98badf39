//! Message-zone parsing.
//!
//! After the header, the message is a sequence of `DI value` pairs. The
//! parser is a small state machine over the registry's length rules:
//! fixed-width DIs consume exactly their width, variable DIs consume until
//! a GS (0x1D). An RS (0x1E) also terminates a field but marks it
//! truncated; a US (0x1F) ends the message — everything after it is the
//! signature payload.

use super::registry::{length_for, name_for, DiLength};

const GS: u8 = 0x1D;
const RS: u8 = 0x1E;
const US: u8 = 0x1F;

/// One parsed message field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Data identifier
    pub di: String,
    /// Registry name of the field
    pub name: String,
    /// Field value (Latin-1 decoded)
    pub value: String,
    /// The field ended on an RS: present but cut short
    pub truncated: bool,
}

/// Result of parsing the message zone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// Fields in barcode order
    pub fields: Vec<Field>,
    /// Raw signature payload after the US separator
    pub signature: Option<Vec<u8>>,
}

impl Message {
    /// First field with the given DI.
    pub fn get(&self, di: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.di == di)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse the message zone.
pub fn parse_message(input: &[u8]) -> Message {
    let mut message = Message::default();
    let mut i = 0usize;
    while i < input.len() {
        if input[i] == US {
            let sig = &input[i + 1..];
            message.signature = Some(sig.to_vec());
            break;
        }
        // stray separators (emitters that terminate fixed-width fields too)
        if input[i] == GS || input[i] == RS {
            i += 1;
            continue;
        }
        if i + 2 > input.len() {
            break;
        }
        let di = latin1(&input[i..i + 2]).to_uppercase();
        i += 2;
        let (value, truncated, consumed) = match length_for(&di) {
            DiLength::Fixed(width) => {
                let end = (i + width).min(input.len());
                let value = latin1(&input[i..end]);
                (value, end - i < width, end - i)
            }
            DiLength::Variable => {
                let mut j = i;
                while j < input.len() && input[j] != GS && input[j] != RS && input[j] != US {
                    j += 1;
                }
                let value = latin1(&input[i..j]);
                match input.get(j) {
                    Some(&RS) => (value, true, j - i + 1),
                    Some(&GS) => (value, false, j - i + 1),
                    // US stays in the stream for the loop head to see
                    _ => (value, false, j - i),
                }
            }
        };
        message.fields.push(Field {
            name: name_for(&di),
            di,
            value,
            truncated,
        });
        i += consumed;
    }
    message
}
