//! Named text sources for the summarize feature

use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use log::{debug, warn};

/// Resolves a caller-supplied identifier to text
///
/// `None` means the source could not be read, which is different from
/// a source that exists and is empty.
#[async_trait]
pub trait TextSource: Send + Sync
{   async fn read_text(&self, identifier: &str) -> Option<String>;
}

/// Reads UTF-8 files from a single directory
#[derive(Debug, Clone)]
pub struct DirectorySource
{   root: PathBuf
}

impl DirectorySource
{   pub fn new(root: impl Into<PathBuf>) -> Self
    {   DirectorySource
        {   root: root.into()
        }
    }

    /// Path inside the root, or `None` if the identifier escapes it
    fn resolve(&self, identifier: &str) -> Option<PathBuf>
    {   let relative = Path::new(identifier.trim());
        let contained = relative
          .components()
          .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained || relative.as_os_str().is_empty()
        {   warn!("Rejecting source identifier {:?}", identifier);
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl TextSource for DirectorySource
{   async fn read_text(&self, identifier: &str) -> Option<String>
    {   let path = self.resolve(identifier)?;
        debug!("Reading source {}", path.display());
        match tokio::fs::read_to_string(&path).await
        {   Ok(text) => Some(text)
          , Err(e) => {
              warn!("Could not read {}: {}", path.display(), e);
              None
            }
        }
    }
}
