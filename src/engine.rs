//! Archive-to-storage extraction walk.

use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::{InstallError, Result};
use crate::io::ReadAt;
use crate::ui::ProgressSink;
use crate::zip::Archive;

/// Walks an archive in index order, materializing entries under an install
/// root.
///
/// The walk is strictly sequential: directories are created before the
/// files archived after them, progress is reported after every entry, and
/// the first failure aborts the run. Entries extracted before a failure
/// stay in place; the install root is scratch space and a re-run converges
/// over whatever is already there.
pub struct ExtractionEngine<'a, R: ReadAt> {
    archive: &'a Archive<R>,
    root: PathBuf,
}

impl<'a, R: ReadAt> ExtractionEngine<'a, R> {
    pub fn new(archive: &'a Archive<R>, root: impl Into<PathBuf>) -> Self {
        Self {
            archive,
            root: root.into(),
        }
    }

    /// Extract every entry in archival order.
    ///
    /// After each entry the sink is told `(index + 1, total)`, so a
    /// successful walk always ends on `(total, total)`.
    pub async fn run(&self, progress: &mut dyn ProgressSink) -> Result<()> {
        let total = self.archive.entry_count();

        for index in 0..total {
            let entry = self.archive.entry(index);

            if entry.is_directory {
                // A stored directory name conventionally ends with one
                // separator; drop it so the created path does not.
                let name = entry.name.strip_suffix('/').unwrap_or(&entry.name);
                let dir = self.dest_path(name)?;
                // Already-existing directories are success: a prior
                // partial run may have created them.
                fs::create_dir_all(&dir)
                    .await
                    .map_err(|source| InstallError::DirectoryCreateFailed { path: dir, source })?;
            } else {
                let dest = self.dest_path(&entry.name)?;
                self.archive.extract_entry_to_path(index, &dest).await?;
            }

            progress.entry_done(index + 1, total, &entry.name);
        }

        Ok(())
    }

    /// Destination for a stored entry name, confined to the install root.
    ///
    /// Leading separators are stripped so an absolute stored name lands
    /// under the root instead of replacing it, and parent-directory
    /// components are refused outright.
    fn dest_path(&self, name: &str) -> Result<PathBuf> {
        let relative = name.trim_start_matches('/');
        let path = Path::new(relative);

        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(InstallError::FileExtractFailed {
                path: PathBuf::from(name),
                reason: "entry path escapes the install root".to_string(),
            });
        }

        Ok(self.root.join(path))
    }
}
