//! `IBM-<ccsid>.html`: a 16×16 grid of a single-byte table

use crate::chars::{
    control_mnemonic, decode_single, is_invariant, space_mnemonic, CellClass, CharDatabase,
};
use ccsid_bridge::CodepageTable;
use std::fmt::Write;
use unicode_general_category::GeneralCategory;

const STYLE: &str = r#"<style>
#ebcdic-table {
    text-align: center;
    font-size: large;
    border-collapse: collapse;
    color: black;
}
th {
    font-weight: 700;
    width: 3em;
    background-color: #EEEEEE;
}
.th {
    font-weight: 700;
    width: 1.6em;
    background-color: #EEEEEE;
}
.row {
    height: 4em;
}
.glyph {
    line-height: 1.6;
}
.control-code {
    font-variant: small-caps;
    font-family: monospace;
    background-color: #F0FFF0;
}
.space-separator {
    font-variant: small-caps;
    font-family: monospace;
    background-color: #F0FFF0;
}
.symbol {
    background-color: #FFFFD7;
}
.punctuation {
    background-color: #F4F4FF;
}
.number {
    background-color: #FFF4F4;
}
.normal {
    background-color: #FFFFFF;
}
.error {
    background-color: #FFD7D7;
}
.invariant {
    border: 2px solid;
}
</style>
"#;

const TABLE_HEAD: &str = "<tr>
    <th class='th'></th>
    <th>_0</th><th>_1</th><th>_2</th><th>_3</th>
    <th>_4</th><th>_5</th><th>_6</th><th>_7</th>
    <th>_8</th><th>_9</th><th>_A</th><th>_B</th>
    <th>_C</th><th>_D</th><th>_E</th><th>_F</th>
</tr>
";

/// Render the HTML grid of `table`; `None` unless it has 256 entries
pub fn render_html<D: CharDatabase>(table: &CodepageTable, db: &D) -> Option<String> {
    if table.len() != 0x100 {
        return None;
    }

    let mut out = String::with_capacity(32 * 1024);
    out.push_str(STYLE);
    out.push_str("<table id=\"ebcdic-table\" border=\"1\" frame=\"box\">\n");
    out.push_str(TABLE_HEAD);

    for row in 0..16 {
        out.push_str("<tr class='row'>\n");
        let _ = writeln!(out, "<td class='th'>_{:X}</td>", row);
        for column in 0..16 {
            let bytes = table.get(row * 16 + column).unwrap_or_default();
            out.push_str(&cell(db, bytes));
            out.push('\n');
        }
        out.push_str("</tr>\n");
    }

    out.push_str(TABLE_HEAD);
    out.push_str("</table>\n");
    Some(out)
}

/// One `<td>` of the grid
pub fn cell<D: CharDatabase>(db: &D, bytes: &[u8]) -> String {
    let Some(c) = decode_single(bytes) else {
        return "<td class=\"error\"></td>".to_string();
    };

    let category = db.category(c);
    let glyph = if c == char::REPLACEMENT_CHARACTER {
        String::new()
    } else {
        let shown = match category {
            GeneralCategory::Control => control_mnemonic(c).unwrap_or("").to_string(),
            GeneralCategory::SpaceSeparator => space_mnemonic(c).unwrap_or("").to_string(),
            _ => html_escape(c.encode_utf8(&mut [0; 4])),
        };
        format!("<span class='glyph'>{}</span>", shown)
    };

    let mut class = CellClass::of(category).as_str().to_string();
    if is_invariant(c) {
        class.push_str(" invariant");
    }

    format!(
        "<td class=\"{}\">{}<br><small>{:04X}</small></td>",
        class, glyph, c as u32
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
