use crate::{
    config::BoardConfig,
    domain::{Board, BoardId, BoardSnapshot},
    error::{HlaviError, Result},
    storage::Storage,
};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::fs;
use tracing::{debug, warn};

/// File-based storage: one JSON document per board
pub struct FileStorage {
    root_path: PathBuf,
}

impl FileStorage {
    const HLAVI_DIR: &'static str = ".hlavi";
    const BOARDS_DIR: &'static str = "boards";
    const CONFIG_FILE: &'static str = "config.toml";

    /// Creates a new FileStorage instance for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::HLAVI_DIR),
        }
    }

    fn boards_dir(&self) -> PathBuf {
        self.root_path.join(Self::BOARDS_DIR)
    }

    fn config_file(&self) -> PathBuf {
        self.root_path.join(Self::CONFIG_FILE)
    }

    fn board_file(&self, id: &BoardId) -> PathBuf {
        self.boards_dir().join(format!("{}.json", id))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    /// Loads the board template, falling back to the default one
    pub async fn load_config(&self) -> Result<BoardConfig> {
        let path = self.config_file();
        if !path.exists() {
            return Ok(BoardConfig::default());
        }
        let contents = fs::read_to_string(&path).await?;
        BoardConfig::from_toml_str(&contents)
    }

    pub async fn save_config(&self, config: &BoardConfig) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;
        fs::write(self.config_file(), config.to_toml_string()?).await?;
        Ok(())
    }

    async fn read_snapshot(&self, path: &Path) -> Result<BoardSnapshot> {
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;
        self.ensure_directory_exists(&self.boards_dir()).await?;

        if !self.config_file().exists() {
            self.save_config(&BoardConfig::default()).await?;
        }

        // Create a board from the template if there is none yet
        if self.list_board_ids().await?.is_empty() {
            let config = self.load_config().await?;
            let board = Board::from_config(&config)?;
            self.save_board(&board).await?;
        }

        Ok(())
    }

    async fn save_board(&self, board: &Board) -> Result<Board> {
        self.ensure_directory_exists(&self.boards_dir()).await?;

        let path = self.board_file(&board.id());
        let found = if path.exists() {
            self.read_snapshot(&path).await?.version
        } else {
            0
        };
        if found != board.version() {
            return Err(HlaviError::ConcurrencyConflict {
                board_id: board.id(),
                expected: board.version(),
                found,
            });
        }

        let saved = board.clone().with_version(found + 1);
        let json = serde_json::to_string_pretty(&saved)?;

        // Write then rename so a crash never leaves a half-written board
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!(board_id = %saved.id(), version = saved.version(), "board saved");
        Ok(saved)
    }

    async fn load_board(&self, id: &BoardId) -> Result<Board> {
        if !self.is_initialized().await {
            return Err(HlaviError::BoardNotInitialized);
        }

        let path = self.board_file(id);
        if !path.exists() {
            return Err(HlaviError::BoardNotFound(*id));
        }

        let snapshot = self.read_snapshot(&path).await?;
        Ok(Board::restore(snapshot)?)
    }

    async fn list_board_ids(&self) -> Result<Vec<BoardId>> {
        let boards_dir = self.boards_dir();

        if !boards_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&boards_dir).await?;
        let mut ids: Vec<BoardId> = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                match BoardId::from_str(stem) {
                    Ok(id) => ids.push(id),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unrecognised board file"),
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.exists() && self.boards_dir().exists()
    }
}
