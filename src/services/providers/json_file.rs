use std::path::PathBuf;

use tracing::instrument;

use crate::{
    error::{ModelError, ModelResult},
    models::CorpusRow,
};

use super::CorpusProvider;

/// Corpus stored on disk as a JSON array of rows
///
/// A file that is not a JSON array is a provider error; individual rows
/// that fail to parse are skipped.
///
/// Each row carries the trait fields (`age`, `gender`, `mbti`/`personality`,
/// `purpose`, `fashionstyle`, `prefercolor`, ...) and a free-text
/// `category` (also accepted as `perfume_category`).
#[derive(Debug, Clone)]
pub struct JsonCorpusFile {
    path: PathBuf,
}

impl JsonCorpusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl CorpusProvider for JsonCorpusFile {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load_corpus(&self) -> ModelResult<Vec<CorpusRow>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ModelError::Provider(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&text).map_err(|e| {
            ModelError::Provider(format!("invalid corpus {}: {}", self.path.display(), e))
        })?;

        let total = values.len();
        let rows: Vec<CorpusRow> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::debug!(index, error = %e, "Skipping malformed corpus row");
                    None
                }
            })
            .collect();

        let dropped = total - rows.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped malformed corpus rows");
        }
        tracing::info!(rows = rows.len(), "Loaded corpus file");
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}
