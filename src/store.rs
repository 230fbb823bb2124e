//! Append-only directory of Parquet batch files.
//!
//! One file per classify call, named `pred_<uuid>.parquet`. Files are written
//! under a dot-prefixed temp name and renamed into place, so readers never
//! see a partial batch. Nothing here deletes or rewrites a batch.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{anyhow, Context, Result};
use arrow_array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use metrics::counter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::classify::ScoredRecord;

pub const BATCH_PREFIX: &str = "pred_";
pub const BATCH_EXT: &str = "parquet";

/// Column names of a persisted batch, in file order.
pub const BATCH_COLUMNS: [&str; 6] = [
    "id",
    "source",
    "title",
    "publishedAt",
    "sentiment",
    "prob_pos",
];

#[derive(Debug, Clone)]
pub struct BatchStore {
    dir: PathBuf,
}

impl BatchStore {
    /// Open (and create if missing) the store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating store dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Write one batch atomically and return its final path.
    pub fn write_batch(&self, records: &[ScoredRecord]) -> Result<PathBuf> {
        // v7 ids are time-ordered, which gives a stable tie-break on equal mtimes.
        let name = format!("{BATCH_PREFIX}{}.{BATCH_EXT}", uuid::Uuid::now_v7().simple());
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        let batch = to_record_batch(records)?;
        let written = write_parquet(&tmp, batch).and_then(|_| {
            fs::rename(&tmp, &path)
                .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        counter!("batches_written_total").increment(1);
        Ok(path)
    }

    /// Newest-first batch paths by mtime, capped at `cap` before anything is read.
    pub fn recent_batches(&self, cap: usize) -> Result<Vec<PathBuf>> {
        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("listing store dir {}", self.dir.display()))?;
        for e in entries {
            let e = e.with_context(|| format!("listing store dir {}", self.dir.display()))?;
            let path = e.path();
            if !is_batch_file(&path) {
                continue;
            }
            let mtime = e
                .metadata()
                .and_then(|m| m.modified())
                .with_context(|| format!("reading mtime of {}", path.display()))?;
            files.push((mtime, path));
        }

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        files.truncate(cap);
        Ok(files.into_iter().map(|(_, p)| p).collect())
    }

    /// Read every row of one batch file.
    pub fn read_batch(&self, path: &Path) -> Result<Vec<ScoredRecord>> {
        read_parquet(path)
    }
}

fn is_batch_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    name.starts_with(BATCH_PREFIX)
        && path.extension().and_then(|s| s.to_str()) == Some(BATCH_EXT)
        && path.is_file()
}

fn batch_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(BATCH_COLUMNS[0], DataType::Utf8, false),
        Field::new(BATCH_COLUMNS[1], DataType::Utf8, true),
        Field::new(BATCH_COLUMNS[2], DataType::Utf8, false),
        Field::new(BATCH_COLUMNS[3], DataType::Utf8, true),
        Field::new(BATCH_COLUMNS[4], DataType::Utf8, false),
        Field::new(BATCH_COLUMNS[5], DataType::Float64, false),
    ]))
}

fn to_record_batch(records: &[ScoredRecord]) -> Result<RecordBatch> {
    let ids = StringArray::from(
        records
            .iter()
            .map(|r| Some(r.id.as_str()))
            .collect::<Vec<_>>(),
    );
    let sources = StringArray::from(
        records
            .iter()
            .map(|r| r.source.as_deref())
            .collect::<Vec<_>>(),
    );
    let titles =
        StringArray::from(records.iter().map(|r| Some(r.title.as_str())).collect::<Vec<_>>());
    let published = StringArray::from(
        records
            .iter()
            .map(|r| r.published_at.as_deref())
            .collect::<Vec<_>>(),
    );
    let labels = StringArray::from(
        records
            .iter()
            .map(|r| Some(r.sentiment.as_str()))
            .collect::<Vec<_>>(),
    );
    let probs = Float64Array::from(records.iter().map(|r| r.prob_pos).collect::<Vec<_>>());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(ids),
        Arc::new(sources),
        Arc::new(titles),
        Arc::new(published),
        Arc::new(labels),
        Arc::new(probs),
    ];
    RecordBatch::try_new(batch_schema(), columns).context("building batch record batch")
}

fn write_parquet(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    let file = writer
        .into_inner()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing {}", path.display()))?;
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str, path: &Path) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{}: missing or non-string column '{name}'", path.display()))
}

fn read_parquet(path: &Path) -> Result<Vec<ScoredRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata {}", path.display()))?
        .build()
        .with_context(|| format!("building parquet reader {}", path.display()))?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("decoding {}", path.display()))?;
        let ids = string_column(&batch, "id", path)?;
        let sources = string_column(&batch, "source", path)?;
        let titles = string_column(&batch, "title", path)?;
        let published = string_column(&batch, "publishedAt", path)?;
        let labels = string_column(&batch, "sentiment", path)?;
        let probs = batch
            .column_by_name("prob_pos")
            .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
            .ok_or_else(|| anyhow!("{}: missing or non-float column 'prob_pos'", path.display()))?;

        out.reserve(batch.num_rows());
        for i in 0..batch.num_rows() {
            let opt = |a: &StringArray| (!a.is_null(i)).then(|| a.value(i).to_string());
            out.push(ScoredRecord {
                id: ids.value(i).to_string(),
                source: opt(sources),
                title: opt(titles).unwrap_or_default(),
                published_at: opt(published),
                sentiment: labels
                    .value(i)
                    .parse()
                    .with_context(|| format!("{}: row {i}", path.display()))?,
                prob_pos: if probs.is_null(i) { 0.0 } else { probs.value(i) },
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Sentiment;

    fn rec(id: &str, source: Option<&str>, published: Option<&str>) -> ScoredRecord {
        ScoredRecord {
            id: id.to_string(),
            source: source.map(str::to_string),
            title: format!("title {id}"),
            published_at: published.map(str::to_string),
            sentiment: Sentiment::Positive,
            prob_pos: 0.5,
        }
    }

    #[test]
    fn written_batch_reads_back_with_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let store = BatchStore::open(dir.path().join("nested")).unwrap();
        let rows = vec![
            rec("a", Some("Reuters"), Some("2024-01-02T00:00:00Z")),
            rec("b", None, None),
        ];
        let path = store.write_batch(&rows).unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with(BATCH_PREFIX));
        assert_eq!(store.read_batch(&path).unwrap(), rows);
    }

    #[test]
    fn no_temp_files_are_left_or_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = BatchStore::open(dir.path()).unwrap();
        store.write_batch(&[rec("a", None, None)]).unwrap();
        fs::write(dir.path().join(".pred_x.parquet.tmp"), b"partial").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let listed = store.recent_batches(50).unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn names_are_unique_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = BatchStore::open(dir.path()).unwrap();
        let a = store.write_batch(&[rec("a", None, None)]).unwrap();
        let b = store.write_batch(&[rec("a", None, None)]).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.recent_batches(50).unwrap().len(), 2);
    }
}
