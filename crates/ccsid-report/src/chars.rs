//! Character properties used by the reports

use std::fmt;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Source of character names and general categories
pub trait CharDatabase {
    /// Unicode name, `None` for unnamed characters
    fn name(&self, c: char) -> Option<String>;

    fn category(&self, c: char) -> GeneralCategory;
}

/// Names and categories from the Unicode Character Database
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeDatabase;

impl CharDatabase for UnicodeDatabase {
    fn name(&self, c: char) -> Option<String> {
        // Controls have no name of their own, only the "<control>" label
        if self.category(c) == GeneralCategory::Control {
            return None;
        }
        unicode_names2::name(c).map(|name| name.to_string())
    }

    fn category(&self, c: char) -> GeneralCategory {
        get_general_category(c)
    }
}

/// The single character encoded by `bytes` as UTF-16BE
///
/// `None` for empty or odd-length input, unpaired surrogates, and output of
/// more than one character.
pub fn decode_single(bytes: &[u8]) -> Option<char> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    let mut chars = char::decode_utf16(units);
    let c = chars.next()?.ok()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}

/// Name column of the text report
pub fn text_label<D: CharDatabase>(db: &D, bytes: &[u8]) -> String {
    let Some(c) = decode_single(bytes) else {
        return "<error>".to_string();
    };
    match db.name(c) {
        Some(name) => name,
        None if db.category(c) == GeneralCategory::Control => "<control>".to_string(),
        None => "<unknown>".to_string(),
    }
}

/// Style class of an HTML cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    ControlCode,
    SpaceSeparator,
    Symbol,
    Punctuation,
    Number,
    Normal,
}

impl CellClass {
    pub fn of(category: GeneralCategory) -> Self {
        use GeneralCategory::*;

        match category {
            Control => CellClass::ControlCode,
            SpaceSeparator => CellClass::SpaceSeparator,
            CurrencySymbol | ModifierSymbol | MathSymbol | OtherSymbol => CellClass::Symbol,
            ConnectorPunctuation | DashPunctuation | ClosePunctuation | FinalPunctuation
            | InitialPunctuation | OtherPunctuation | OpenPunctuation => CellClass::Punctuation,
            DecimalNumber | LetterNumber | OtherNumber => CellClass::Number,
            _ => CellClass::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellClass::ControlCode => "control-code",
            CellClass::SpaceSeparator => "space-separator",
            CellClass::Symbol => "symbol",
            CellClass::Punctuation => "punctuation",
            CellClass::Number => "number",
            CellClass::Normal => "normal",
        }
    }
}

impl fmt::Display for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const C0_MNEMONICS: [&str; 32] = [
    "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", //
    "BS", "HT", "LF", "VT", "FF", "CR", "SO", "SI", //
    "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", //
    "CAN", "EM", "SUB", "ESC", "FS", "GS", "RS", "US",
];

const C1_MNEMONICS: [&str; 32] = [
    "PAD", "HOP", "BPH", "NBH", "IND", "NEL", "SSA", "ESA", //
    "HTS", "HTJ", "VTS", "PLD", "PLU", "RI", "SS2", "SS3", //
    "DCS", "PU1", "PU2", "STS", "CCH", "MW", "SPA", "EPA", //
    "SOS", "SGCI", "SCI", "CSI", "ST", "OSC", "PM", "APC",
];

/// Abbreviation shown for a C0/C1 control or DEL
pub fn control_mnemonic(c: char) -> Option<&'static str> {
    match c as u32 {
        cp @ 0x00..=0x1F => Some(C0_MNEMONICS[cp as usize]),
        0x7F => Some("DEL"),
        cp @ 0x80..=0x9F => Some(C1_MNEMONICS[(cp - 0x80) as usize]),
        _ => None,
    }
}

/// Abbreviation shown for a space character
pub fn space_mnemonic(c: char) -> Option<&'static str> {
    match c {
        '\u{0020}' => Some("SP"),
        '\u{00A0}' => Some("NBSP"),
        '\u{00AD}' => Some("SHY"),
        '\u{202F}' => Some("NNBSP"),
        '\u{205F}' => Some("MMSP"),
        _ => None,
    }
}

/// Whether `c` is in the invariant character set shared by EBCDIC codepages
pub fn is_invariant(c: char) -> bool {
    c.is_ascii_alphanumeric() || "+<=>%&*\"'(),_-./:;?".contains(c)
}
