//! `IBM-<ccsid>.txt`: one line per codepoint

use crate::chars::{text_label, CharDatabase};
use ccsid_bridge::CodepageTable;
use std::fmt::Write;

/// Render the text report of `table`
///
/// Each line is `0x<codepoint>\t0x<output hex>\t<name>`; codepoints are two hex
/// digits wide for single-byte tables and four for double-byte ones.
pub fn render_text<D: CharDatabase>(table: &CodepageTable, db: &D) -> String {
    let width = table.scheme().width() * 2;
    let mut out = String::with_capacity(table.len() * 32);

    for (codepoint, bytes) in table.iter() {
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "0x{:0width$x}\t0x{}\t{}",
            codepoint,
            hex(bytes),
            text_label(db, bytes),
            width = width
        );
    }
    out
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut acc, b| {
        let _ = write!(acc, "{:02x}", b);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_lowercase() {
        assert_eq!(hex(&[0x00, 0xAB]), "00ab");
        assert_eq!(hex(&[]), "");
    }
}
