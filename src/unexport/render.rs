//! Renders identities as CSV rows or gorename directives.
//!
//! The CSV form is both the listing output and the blacklist input, so a
//! listing can be trimmed by hand into a blacklist.

use crate::model::SymbolIdentity;
use csv::{StringRecord, Writer, WriterBuilder};
use std::io::Write;

/// Lower-cases the first character of `name`, leaving the rest untouched.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Directive asking gorename to unexport `symbol`.
///
/// The quotes around the package are escaped for a shell that re-evaluates
/// the line, e.g. `gorename -from \"example.org/m\".Widget.Name -to name`.
pub fn rename_command(symbol: &SymbolIdentity) -> String {
    let from = if symbol.is_package_level() {
        format!("\\\"{}\\\".{}", symbol.package, symbol.name)
    } else {
        format!(
            "\\\"{}\\\".{}.{}",
            symbol.package, symbol.receiver, symbol.name
        )
    };
    format!("gorename -from {} -to {}", from, lower_first(&symbol.name))
}

fn csv_writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

/// Writes one `package,receiver,name` row per symbol.
pub fn write_rows<'a, W, I>(out: W, symbols: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a SymbolIdentity>,
{
    let mut writer = csv_writer(out);
    for symbol in symbols {
        writer.write_record([&symbol.package, &symbol.receiver, &symbol.name])?;
    }
    writer.flush()?;
    Ok(())
}

/// Single CSV row for `symbol`, without the line terminator.
pub fn to_row(symbol: &SymbolIdentity) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_rows(&mut buf, [symbol])?;
    let row = String::from_utf8_lossy(&buf);
    Ok(row.trim_end_matches('\n').to_string())
}

/// Builds an identity from a three-field record. `None` on any other width.
pub fn from_record(record: &StringRecord) -> Option<SymbolIdentity> {
    match (record.len(), record.get(0), record.get(1), record.get(2)) {
        (3, Some(package), Some(receiver), Some(name)) => {
            Some(SymbolIdentity::member(package, receiver, name))
        }
        _ => None,
    }
}
