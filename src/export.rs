//! CSV export of masked transcripts
//!
//! One row per session under the header `Session ID,Chat History`. Fields
//! containing a comma, quote, CR or LF are quoted with inner quotes doubled
//! (RFC 4180), so multi-line transcripts survive a round trip through any
//! spreadsheet tool.

use crate::error::Result;
use crate::types::MaskedTranscript;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: [&str; 2] = ["Session ID", "Chat History"];

/// Write transcripts to `path`, returning the number of data rows
pub fn write_csv(path: &Path, transcripts: &[MaskedTranscript]) -> Result<usize> {
    let mut out = BufWriter::new(File::create(path)?);
    let rows = write_rows(&mut out, transcripts)?;
    out.flush()?;
    tracing::info!(path = %path.display(), rows, "Wrote transcripts");
    Ok(rows)
}

/// Write header and rows to any writer
pub fn write_rows<W: Write>(out: &mut W, transcripts: &[MaskedTranscript]) -> Result<usize> {
    write_record(out, &HEADER)?;
    for t in transcripts {
        write_record(out, &[t.session_id.as_str(), t.text.as_str()])?;
    }
    Ok(transcripts.len())
}

fn write_record<W: Write>(out: &mut W, fields: &[&str]) -> Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    write!(out, "{}\r\n", line.join(","))?;
    Ok(())
}

/// Quote a field when it contains a delimiter, quote, or line break
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
