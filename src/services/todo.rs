use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Result, Write};
use std::path::{Path, PathBuf};

/// Line-oriented to-do storage.
pub trait TodoStore: Send + Sync {
    /// Appends one item; never checks for duplicates.
    fn append(&self, item: &str) -> Result<()>;

    /// Non-blank items in order, or `None` when nothing has ever been stored.
    fn load(&self) -> Result<Option<Vec<String>>>;
}

pub struct FileTodoStore {
    path: PathBuf,
}

impl FileTodoStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TodoStore for FileTodoStore {
    fn append(&self, item: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", item)
    }

    fn load(&self) -> Result<Option<Vec<String>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}
