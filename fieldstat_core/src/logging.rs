use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::anova::AnovaResult;
use crate::supply::EntityFilter;

fn log_dir() -> io::Result<()> {
    fs::create_dir_all("logs")
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[derive(Debug, Serialize)]
pub struct AnalysisLogEntry {
    pub design: String,
    pub dv: String,
    pub subjects: usize,
    pub conditions: usize,
    pub effects: usize,
    pub imputed_cells: usize,
    pub trim: usize,
    pub timestamp_ms: u128,
}

pub fn log_analysis(result: &AnovaResult) -> io::Result<()> {
    log_dir()?;
    let entry = AnalysisLogEntry {
        design: format!("{:?}", result.design).to_lowercase(),
        dv: result.dv.clone(),
        subjects: result.subjects,
        conditions: result.conditions,
        effects: result.effects.len(),
        imputed_cells: result.imputed_cells,
        trim: result.trim,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line("logs/analyses.jsonl", &entry)
}

#[derive(Debug, Serialize)]
pub struct ExportLogEntry {
    pub filter: String,
    pub rows: usize,
    pub timestamp_ms: u128,
}

pub fn log_export(filter: &EntityFilter, rows: usize) -> io::Result<()> {
    log_dir()?;
    let entry = ExportLogEntry {
        filter: filter.summary(),
        rows,
        timestamp_ms: timestamp_ms(),
    };
    append_json_line("logs/exports.jsonl", &entry)
}
