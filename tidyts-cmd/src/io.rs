//! Opening inputs and writing outputs.
//!
//! Inputs ending in `.gz` are decompressed on the fly. Outputs are JSON when
//! the path ends in `.json` and CSV otherwise.

use anyhow::Context;
use flate2::read::GzDecoder;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);
    if has_extension(path, "gz") {
        debug!("Decompressing {}", path.display());
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Write `rows` to any writer as CSV with a header row.
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_output<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let writer = BufWriter::new(file);
    if has_extension(path, "json") {
        serde_json::to_writer_pretty(writer, rows)?;
    } else {
        write_csv(writer, rows)?;
    }
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
