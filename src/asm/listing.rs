//! Disassembly listing reader.
//!
//! Turns a text listing back into a ROM image. Only lines shaped like
//!
//! ```text
//! AAA: DD [EE] anything...
//! ```
//!
//! are used: a 3-digit hex address, a colon at column 3, an opcode byte at
//! columns 5-6 and, when column 8 is not blank, a second byte at columns
//! 8-9. The second byte belongs at the polynomial successor of `AAA` in the
//! same bank. Every other line is ignored.

use crate::bits::{poly_next, Address};
use thiserror::Error;

/// Size of the image produced from a listing: the full 10-bit space.
pub const LISTING_IMAGE_SIZE: usize = 1024;

/// Build a ROM image from a listing.
pub fn parse_listing(text: &str) -> Result<Vec<u8>, ListingError> {
    let mut image = vec![0u8; LISTING_IMAGE_SIZE];

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1;
        if line.len() <= 3 || line.as_bytes()[3] != b':' {
            continue;
        }

        let addr = line.get(0..3)
            .and_then(|s| u16::from_str_radix(s, 16).ok())
            .ok_or_else(|| ListingError::BadAddress { line: line_num, text: line.to_string() })?;
        if addr as usize >= LISTING_IMAGE_SIZE {
            return Err(ListingError::AddressOutOfRange { line: line_num, addr });
        }
        let addr = Address::new(addr);

        image[addr.value() as usize] = byte_at(line, 5, line_num)?;

        let has_second = line.as_bytes().get(8).is_some_and(|c| !c.is_ascii_whitespace());
        if has_second {
            let next = Address::from_parts(addr.bank(), poly_next(addr.poly()));
            image[next.value() as usize] = byte_at(line, 8, line_num)?;
        }
    }

    Ok(image)
}

fn byte_at(line: &str, column: usize, line_num: usize) -> Result<u8, ListingError> {
    line.get(column..column + 2)
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .ok_or_else(|| ListingError::BadByte { line: line_num, column })
}

/// Errors that can occur while reading a listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("bad address on line {line}: {text}")]
    BadAddress { line: usize, text: String },

    #[error("bad hex byte on line {line} at column {column}")]
    BadByte { line: usize, column: usize },

    #[error("address {addr:#05x} on line {line} is outside the 10-bit space")]
    AddressOutOfRange { line: usize, addr: u16 },
}
