//! Tab-separated manual review store
//!
//! The store is a TSV file with a fixed header. Each run rewrites it
//! completely: rows are written and flushed one at a time to
//! `<path>.partial`, which replaces `<path>` once the run completes. After a
//! crash the previous file is intact and the rows finished so far remain in
//! the partial file, which the next load picks up.
//!
//! Rows recovered that way are not yet part of `<path>`. Before a new run
//! truncates the partial file they are saved to `<path>.recovered`, so a
//! second crash cannot lose them. A successful commit removes that file.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{ReviewError, ReviewResult};
use crate::models::{AnalysisKind, AnalysisRecord, LabelCounts, ReviewOutcome, SKIPPED_LARGE_ANALYSIS};

/// Header of the store, in column order
///
/// Must match the field order of [`StoreRow`].
pub const STORE_COLUMNS: [&str; 15] = [
    "reference",
    "analysis_type",
    "pipeline_name",
    "target_panel",
    "created_on",
    "last_updated_on",
    "molecular_variant_count",
    "cnv_count",
    "result_status",
    "molecular_manual_review_y",
    "molecular_manual_review_y2",
    "molecular_manual_review_y3_rare",
    "cnv_manual_review_y",
    "cnv_manual_review_y2",
    "cnv_manual_review_y3_rare",
];

const DELIMITER: u8 = b'\t';
const PARTIAL_SUFFIX: &str = "partial";
const RECOVERED_SUFFIX: &str = "recovered";

/// On-disk row layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoreRow {
    reference: String,
    analysis_type: String,
    pipeline_name: String,
    target_panel: String,
    created_on: String,
    last_updated_on: String,
    molecular_variant_count: u64,
    cnv_count: u64,
    result_status: Option<String>,
    molecular_manual_review_y: Option<u64>,
    molecular_manual_review_y2: Option<u64>,
    molecular_manual_review_y3_rare: Option<u64>,
    cnv_manual_review_y: Option<u64>,
    cnv_manual_review_y2: Option<u64>,
    cnv_manual_review_y3_rare: Option<u64>,
}

impl From<&AnalysisRecord> for StoreRow {
    fn from(record: &AnalysisRecord) -> Self {
        let (molecular, cnv) = match record.outcome {
            ReviewOutcome::Reviewed { molecular, cnv } => (Some(molecular), Some(cnv)),
            ReviewOutcome::SkippedLargeAnalysis => (None, None),
        };

        Self {
            reference: record.reference.clone(),
            analysis_type: record.analysis_type.as_str().to_string(),
            pipeline_name: record.pipeline_name.clone(),
            target_panel: record.target_panel.clone(),
            created_on: record.created_on.clone(),
            last_updated_on: record.last_updated_on.clone(),
            molecular_variant_count: record.molecular_variant_count,
            cnv_count: record.cnv_count,
            result_status: record.outcome.status().map(str::to_string),
            molecular_manual_review_y: molecular.map(|c| c.y),
            molecular_manual_review_y2: molecular.map(|c| c.y2),
            molecular_manual_review_y3_rare: molecular.map(|c| c.y3_rare),
            cnv_manual_review_y: cnv.map(|c| c.y),
            cnv_manual_review_y2: cnv.map(|c| c.y2),
            cnv_manual_review_y3_rare: cnv.map(|c| c.y3_rare),
        }
    }
}

impl StoreRow {
    fn into_record(self, path: &Path) -> ReviewResult<AnalysisRecord> {
        let invalid = |reference: &str, message: String| ReviewError::InvalidRow {
            path: path.display().to_string(),
            reference: reference.to_string(),
            message,
        };

        let analysis_type: AnalysisKind = self
            .analysis_type
            .parse()
            .map_err(|e: String| invalid(&self.reference, e))?;

        let outcome = match self.result_status.as_deref() {
            Some(SKIPPED_LARGE_ANALYSIS) => ReviewOutcome::SkippedLargeAnalysis,
            Some(other) => {
                return Err(invalid(
                    &self.reference,
                    format!("unknown result_status '{}'", other),
                ))
            }
            None => {
                let counters = (
                    self.molecular_manual_review_y,
                    self.molecular_manual_review_y2,
                    self.molecular_manual_review_y3_rare,
                    self.cnv_manual_review_y,
                    self.cnv_manual_review_y2,
                    self.cnv_manual_review_y3_rare,
                );
                match counters {
                    (Some(my), Some(my2), Some(my3), Some(cy), Some(cy2), Some(cy3)) => {
                        ReviewOutcome::Reviewed {
                            molecular: LabelCounts::new(my, my2, my3),
                            cnv: LabelCounts::new(cy, cy2, cy3),
                        }
                    }
                    _ => {
                        return Err(invalid(
                            &self.reference,
                            "row has neither result_status nor all review counters".to_string(),
                        ))
                    }
                }
            }
        };

        Ok(AnalysisRecord {
            reference: self.reference,
            analysis_type,
            pipeline_name: self.pipeline_name,
            target_panel: self.target_panel,
            created_on: self.created_on,
            last_updated_on: self.last_updated_on,
            molecular_variant_count: self.molecular_variant_count,
            cnv_count: self.cnv_count,
            outcome,
        })
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// `<path>.partial`
pub fn partial_path(path: &Path) -> PathBuf {
    with_suffix(path, PARTIAL_SUFFIX)
}

/// `<path>.recovered`
pub fn recovered_path(path: &Path) -> PathBuf {
    with_suffix(path, RECOVERED_SUFFIX)
}

/// Read all rows of one store file, validating the header
fn read_table(path: &Path) -> ReviewResult<Vec<AnalysisRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_path(path)?;

    let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if found != STORE_COLUMNS {
        return Err(ReviewError::SchemaMismatch {
            path: path.display().to_string(),
            expected: STORE_COLUMNS.join(", "),
            found: found.join(", "),
        });
    }

    reader
        .deserialize::<StoreRow>()
        .map(|row| row.map_err(ReviewError::from)?.into_record(path))
        .collect()
}

/// Write a complete table to `path` through a temporary file and rename
fn write_table(path: &Path, records: &[AnalysisRecord]) -> ReviewResult<()> {
    let tmp = with_suffix(path, "tmp");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_path(&tmp)?;

    writer.write_record(STORE_COLUMNS)?;
    for record in records {
        writer.serialize(StoreRow::from(record))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| ReviewError::Io(e.into_error()))?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Previously persisted records keyed by analysis reference
#[derive(Debug)]
pub struct ReviewStore {
    path: PathBuf,
    records: HashMap<String, AnalysisRecord>,
    /// Records finished by interrupted runs but never committed
    recovered: Vec<AnalysisRecord>,
}

impl ReviewStore {
    /// Load the store at `path`
    ///
    /// A missing file yields an empty store. A header that differs from
    /// [`STORE_COLUMNS`] is a fatal [`ReviewError::SchemaMismatch`]. Rows
    /// left by interrupted runs are merged in when their reference is not
    /// already known.
    pub fn load(path: impl AsRef<Path>) -> ReviewResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path,
            records: HashMap::new(),
            recovered: Vec::new(),
        };

        if store.path.exists() {
            for record in read_table(&store.path)? {
                store.records.entry(record.reference.clone()).or_insert(record);
            }
            tracing::info!(path = %store.path.display(), records = store.records.len(), "Loaded review store");
        } else {
            tracing::warn!(path = %store.path.display(), "Review store not found, starting empty");
        }

        for leftover in [recovered_path(&store.path), partial_path(&store.path)] {
            if leftover.exists() {
                store.recover(&leftover)?;
            }
        }

        Ok(store)
    }

    fn recover(&mut self, leftover: &Path) -> ReviewResult<()> {
        let mut recovered = 0usize;
        for record in read_table(leftover)? {
            if !self.records.contains_key(&record.reference) {
                self.records.insert(record.reference.clone(), record.clone());
                self.recovered.push(record);
                recovered += 1;
            }
        }
        tracing::warn!(
            path = %leftover.display(),
            recovered,
            "Recovered rows from an interrupted run"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, reference: &str) -> Option<&AnalysisRecord> {
        self.records.get(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.records.contains_key(reference)
    }

    /// Rows recovered from interrupted runs, not yet committed
    pub fn recovered(&self) -> &[AnalysisRecord] {
        &self.recovered
    }

    /// Start writing this run's output
    ///
    /// Recovered rows are saved to `<path>.recovered` before the partial
    /// file is truncated.
    pub fn begin_run(&self) -> ReviewResult<StoreWriter> {
        let recovered = recovered_path(&self.path);
        if !self.recovered.is_empty() {
            write_table(&recovered, &self.recovered)?;
            tracing::debug!(
                path = %recovered.display(),
                rows = self.recovered.len(),
                "Saved recovered rows"
            );
        } else if recovered.exists() {
            std::fs::remove_file(&recovered)?;
        }

        StoreWriter::create(&self.path)
    }
}

/// Progressive writer for one run's output
///
/// Dropping the writer without [`StoreWriter::commit`] leaves the partial
/// file in place and the previous store untouched.
pub struct StoreWriter {
    target: PathBuf,
    partial: PathBuf,
    writer: csv::Writer<File>,
    written: HashSet<String>,
}

impl StoreWriter {
    fn create(target: &Path) -> ReviewResult<Self> {
        let partial = partial_path(target);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_path(&partial)?;

        writer.write_record(STORE_COLUMNS)?;
        writer.flush()?;

        Ok(Self {
            target: target.to_path_buf(),
            partial,
            writer,
            written: HashSet::new(),
        })
    }

    /// Append one record and flush it to disk
    ///
    /// Returns `false` when the reference was already written this run.
    pub fn write(&mut self, record: &AnalysisRecord) -> ReviewResult<bool> {
        if !self.written.insert(record.reference.clone()) {
            tracing::warn!(reference = %record.reference, "Duplicate analysis reference, keeping first row");
            return Ok(false);
        }

        self.writer.serialize(StoreRow::from(record))?;
        self.writer.flush()?;
        Ok(true)
    }

    pub fn rows_written(&self) -> usize {
        self.written.len()
    }

    /// Replace the store with this run's output; returns the row count
    pub fn commit(mut self) -> ReviewResult<usize> {
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| ReviewError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&self.partial, &self.target)?;

        let recovered = recovered_path(&self.target);
        if recovered.exists() {
            std::fs::remove_file(&recovered)?;
        }

        tracing::info!(
            path = %self.target.display(),
            rows = self.written.len(),
            "Review store written"
        );
        Ok(self.written.len())
    }
}
