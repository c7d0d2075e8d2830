use async_trait::async_trait;
use std::path::PathBuf;

use super::{SeedError, StaticSeeds};

/// Extracts targets from a line-oriented seed list.
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn parse_seed_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Static seed list stored in a local text file.
pub struct FileSeedList {
    path: PathBuf,
    name: String,
}

impl FileSeedList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl StaticSeeds for FileSeedList {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<String>, SeedError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SeedError::Read {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(parse_seed_list(&contents))
    }
}
