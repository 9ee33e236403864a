use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::entry::{DeadLetterEntry, StoredLine};
use crate::{DeadLetterError, DeadLetterStore};

/// Newline-delimited JSON dead-letter log.
///
/// Each append hands a complete line to a single blocking `write_all` on a
/// file opened with `O_APPEND`, serialized by an in-process lock. [`replace`] writes a
/// sibling temp file and renames it over the log, so readers never observe
/// a half-written store.
///
/// Replacing requires exclusive access: an append from another process that
/// lands between [`load`] and [`replace`] goes to the old file and is lost
/// when the rename happens.
///
/// [`load`]: DeadLetterStore::load
/// [`replace`]: DeadLetterStore::replace
pub struct JsonlStore {
  path: PathBuf,
  write_lock: Mutex<()>,
}

impl JsonlStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      write_lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn temp_path(&self) -> PathBuf {
    let file_name = self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "dead-letter".to_string());
    self.path.with_file_name(format!(".{}.replace", file_name))
  }

  async fn ensure_parent(&self) -> Result<(), std::io::Error> {
    match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
      _ => Ok(()),
    }
  }
}

#[async_trait]
impl DeadLetterStore for JsonlStore {
  async fn append(&self, entry: &DeadLetterEntry) -> Result<(), DeadLetterError> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let _guard = self.write_lock.lock().await;
    self.ensure_parent().await?;

    // tokio's File splits buffers above its max buf size into several writes
    let path = self.path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
      let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
      file.write_all(line.as_bytes())
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(())
  }

  async fn load(&self) -> Result<Vec<StoredLine>, DeadLetterError> {
    let content = match fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    Ok(
      content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(StoredLine::parse)
        .collect(),
    )
  }

  async fn replace(&self, lines: &[StoredLine]) -> Result<(), DeadLetterError> {
    let mut content = String::new();
    for line in lines {
      content.push_str(&line.render()?);
      content.push('\n');
    }

    let _guard = self.write_lock.lock().await;
    self.ensure_parent().await?;

    let temp_path = self.temp_path();
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, &self.path).await?;
    Ok(())
  }
}
