//! Corpus loading from the ingestion collaborator's JSONL export.
//!
//! One JSON object per line: the item fields plus an optional `embedding`
//! array. Items without embeddings are indexed lexically only.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use braq_core::{InMemoryItemIndex, Item};

/// One line of the corpus export.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorpusRecord {
    #[serde(flatten)]
    item: Item,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Load a JSONL corpus export into an in-memory item index.
///
/// Blank lines are skipped; a malformed line fails the load with its line
/// number so the export can be fixed at the source.
pub fn load_corpus(path: &Path) -> Result<InMemoryItemIndex> {
    let file = File::open(path)
        .with_context(|| format!("failed to open corpus at {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut index = InMemoryItemIndex::new();
    let mut loaded = 0usize;
    let mut with_embeddings = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let record: CorpusRecord = serde_json::from_str(&line)
            .with_context(|| format!("malformed corpus record on line {}", line_no + 1))?;

        if record.embedding.is_some() {
            with_embeddings += 1;
        }
        index.insert(record.item, record.embedding);
        loaded += 1;
    }

    tracing::info!(
        items = loaded,
        with_embeddings,
        "Loaded corpus from {}",
        path.display()
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use braq_core::ItemIndex;

    #[test]
    fn test_load_corpus() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id": "T1", "content": "fix login", "attributes": {{"iteration": "Sprint 1", "status": "done"}}, "embedding": [0.1, 0.2]}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"id": "T2", "content": "payment flow"}}"#).unwrap();

        let index = load_corpus(file.path()).unwrap();
        assert_eq!(index.count().unwrap(), 2);
        assert!(index.has_embeddings());
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "T1", "content": "ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = load_corpus(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_corpus(Path::new("/nonexistent/corpus.jsonl")).is_err());
    }
}
