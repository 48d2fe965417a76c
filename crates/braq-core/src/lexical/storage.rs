//! Lexical index serialization and storage.
//!
//! The lexical model is cheap to rebuild for corpora this size, but a disk
//! cache lets long-running processes skip the rebuild across restarts.
//! Uses bincode v2 for the index with a JSON metadata sidecar:
//!
//! ```text
//! <cache_dir>/
//! ├── lexical.bin       # Serialized LexicalIndex
//! └── meta.json         # Version, stats, and the corpus fingerprint
//! ```
//!
//! A cached index is only usable while the item index still reports the
//! same fingerprint; any drift invalidates the cache.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use bincode::config;
use serde::{Deserialize, Serialize};

use super::index::{LexicalIndex, LexicalIndexStats};
use crate::errors::BraqError;
use crate::index::CorpusFingerprint;

/// Filename for the serialized index.
pub const LEXICAL_INDEX_FILENAME: &str = "lexical.bin";

/// Filename for index metadata.
const META_FILENAME: &str = "meta.json";

/// Lexical index cache metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalIndexMeta {
    /// Cache format version for compatibility checks.
    pub version: u32,
    /// Statistics about the index.
    pub stats: LexicalIndexStats,
    /// Fingerprint of the corpus the index was built from.
    pub fingerprint: CorpusFingerprint,
    /// When the index was built.
    pub built_at: chrono::DateTime<chrono::Utc>,
}

impl LexicalIndexMeta {
    /// Current cache format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Create new metadata for an index.
    pub fn new(stats: LexicalIndexStats, fingerprint: CorpusFingerprint) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            stats,
            fingerprint,
            built_at: chrono::Utc::now(),
        }
    }
}

fn index_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(LEXICAL_INDEX_FILENAME)
}

fn meta_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(META_FILENAME)
}

/// Save a lexical index and its fingerprint to the cache directory.
///
/// Creates the directory if needed.
pub fn save_lexical_index(
    index: &LexicalIndex,
    fingerprint: &CorpusFingerprint,
    cache_dir: &Path,
) -> Result<(), BraqError> {
    fs::create_dir_all(cache_dir).map_err(|e| BraqError::LexicalStoreIo {
        path: cache_dir.to_path_buf(),
        message: format!("Failed to create cache directory: {}", e),
    })?;

    let index_file = index_path(cache_dir);
    let file = fs::File::create(&index_file).map_err(|e| BraqError::LexicalStoreIo {
        path: index_file.clone(),
        message: format!("Failed to create index file: {}", e),
    })?;
    let mut writer = BufWriter::new(file);

    bincode::encode_into_std_write(index, &mut writer, config::standard()).map_err(|e| {
        BraqError::LexicalStoreParse {
            path: index_file.clone(),
            message: format!("Failed to serialize index: {}", e),
        }
    })?;

    let meta = LexicalIndexMeta::new(index.stats(), fingerprint.clone());
    let meta_file = meta_path(cache_dir);
    let meta_json =
        serde_json::to_string_pretty(&meta).map_err(|e| BraqError::LexicalStoreParse {
            path: meta_file.clone(),
            message: format!("Failed to serialize metadata: {}", e),
        })?;
    fs::write(&meta_file, meta_json).map_err(|e| BraqError::LexicalStoreIo {
        path: meta_file.clone(),
        message: format!("Failed to write metadata: {}", e),
    })?;

    tracing::debug!(
        "Saved lexical index to {}: {} docs, {} terms",
        cache_dir.display(),
        index.num_documents(),
        index.vocabulary_size()
    );

    Ok(())
}

/// Load a cached lexical index if it matches the expected fingerprint.
///
/// Returns `None` when no cache exists, the cache version is stale, or the
/// fingerprint has drifted — all three mean "rebuild".
pub fn load_lexical_index(
    cache_dir: &Path,
    expected: &CorpusFingerprint,
) -> Result<Option<LexicalIndex>, BraqError> {
    let index_file = index_path(cache_dir);
    let meta_file = meta_path(cache_dir);

    if !index_file.exists() || !meta_file.exists() {
        tracing::debug!("No lexical index cache at {}", cache_dir.display());
        return Ok(None);
    }

    let meta_content = fs::read_to_string(&meta_file).map_err(|e| BraqError::LexicalStoreIo {
        path: meta_file.clone(),
        message: format!("Failed to read metadata: {}", e),
    })?;
    let meta: LexicalIndexMeta =
        serde_json::from_str(&meta_content).map_err(|e| BraqError::LexicalStoreParse {
            path: meta_file.clone(),
            message: format!("Failed to parse metadata: {}", e),
        })?;

    if meta.version != LexicalIndexMeta::CURRENT_VERSION {
        tracing::warn!(
            "Lexical cache version mismatch: found {}, expected {}. Index will be rebuilt.",
            meta.version,
            LexicalIndexMeta::CURRENT_VERSION
        );
        return Ok(None);
    }

    if meta.fingerprint != *expected {
        tracing::debug!(
            "Lexical cache fingerprint drift (cached {:?}, current {:?}); rebuilding",
            meta.fingerprint,
            expected
        );
        return Ok(None);
    }

    let file = fs::File::open(&index_file).map_err(|e| BraqError::LexicalStoreIo {
        path: index_file.clone(),
        message: format!("Failed to open index: {}", e),
    })?;
    let mut reader = BufReader::new(file);

    let index: LexicalIndex = bincode::decode_from_std_read(&mut reader, config::standard())
        .map_err(|e| BraqError::LexicalStoreParse {
            path: index_file.clone(),
            message: format!("Failed to deserialize index: {}", e),
        })?;

    tracing::debug!(
        "Loaded lexical index from {}: {} docs, {} terms",
        cache_dir.display(),
        index.num_documents(),
        index.vocabulary_size()
    );

    Ok(Some(index))
}
