//! Storage collaborator and block encoding.
//!
//! Each mode keeps one opaque block keyed by [`BlockKind`]. Blocks are JSON so
//! they survive field additions; a block that fails to decode is treated as
//! fresh and replaced by defaults.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    System,
    Grid,
    Arc,
    Midi,
    Div,
}

impl BlockKind {
    fn file_name(self) -> &'static str {
        match self {
            BlockKind::System => "system.json",
            BlockKind::Grid => "grid.json",
            BlockKind::Arc => "arc.json",
            BlockKind::Midi => "midi.json",
            BlockKind::Div => "div.json",
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Non-volatile storage for state blocks. Atomicity across power loss is not promised.
pub trait Storage {
    fn load_block(&self, kind: BlockKind) -> Option<Vec<u8>>;
    fn store_block(&mut self, kind: BlockKind, bytes: &[u8]) -> Result<(), StorageError>;
    /// True until `mark_initialized` has been called once.
    fn first_boot(&self) -> bool;
    fn mark_initialized(&mut self);
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load a block, falling back to `T::default()` when missing or unreadable.
pub fn load_or_default<T: DeserializeOwned + Default>(storage: &dyn Storage, kind: BlockKind) -> T {
    match storage.load_block(kind) {
        Some(bytes) => match decode(&bytes) {
            Ok(v) => v,
            Err(e) => {
                log::warn!(target: "storage", "discarding unreadable {:?} block: {}", kind, e);
                T::default()
            }
        },
        None => T::default(),
    }
}

/// Encode and store a block. Failures are logged and reported as `false`.
pub fn save<T: Serialize>(storage: &mut dyn Storage, kind: BlockKind, value: &T) -> bool {
    let result = encode(value).and_then(|bytes| storage.store_block(kind, &bytes));
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!(target: "storage", "failed to write {:?} block: {}", kind, e);
            false
        }
    }
}

/// Volatile storage for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blocks: HashMap<BlockKind, Vec<u8>>,
    initialized: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `store_block` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Storage for MemoryStorage {
    fn load_block(&self, kind: BlockKind) -> Option<Vec<u8>> {
        self.blocks.get(&kind).cloned()
    }

    fn store_block(&mut self, kind: BlockKind, bytes: &[u8]) -> Result<(), StorageError> {
        self.blocks.insert(kind, bytes.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn first_boot(&self) -> bool {
        !self.initialized
    }

    fn mark_initialized(&mut self) {
        self.initialized = true;
    }
}

const INITIALIZED_MARKER: &str = "initialized";

/// One file per block inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `<data_dir>/transit/state`, or `./transit-state` when no data dir exists.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("transit").join("state"))
            .unwrap_or_else(|| PathBuf::from("transit-state"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn block_path(&self, kind: BlockKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl Storage for FileStorage {
    fn load_block(&self, kind: BlockKind) -> Option<Vec<u8>> {
        fs::read(self.block_path(kind)).ok()
    }

    fn store_block(&mut self, kind: BlockKind, bytes: &[u8]) -> Result<(), StorageError> {
        fs::write(self.block_path(kind), bytes)?;
        Ok(())
    }

    fn first_boot(&self) -> bool {
        !self.dir.join(INITIALIZED_MARKER).exists()
    }

    fn mark_initialized(&mut self) {
        if let Err(e) = fs::write(self.dir.join(INITIALIZED_MARKER), b"1") {
            log::warn!(target: "storage", "could not write init marker: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_types::{DivState, GridState};

    #[test]
    fn memory_storage_round_trip() {
        let mut storage = MemoryStorage::new();
        assert!(storage.first_boot());
        let state = DivState { clock_period_ms: 42 };
        assert!(save(&mut storage, BlockKind::Div, &state));
        assert_eq!(storage.writes(), 1);
        let back: DivState = load_or_default(&storage, BlockKind::Div);
        assert_eq!(back, state);
        storage.mark_initialized();
        assert!(!storage.first_boot());
    }

    #[test]
    fn missing_block_loads_defaults() {
        let storage = MemoryStorage::new();
        let state: GridState = load_or_default(&storage, BlockKind::Grid);
        assert_eq!(state, GridState::default());
    }

    #[test]
    fn corrupt_block_loads_defaults() {
        let mut storage = MemoryStorage::new();
        storage.store_block(BlockKind::Div, b"{ not json").unwrap();
        let state: DivState = load_or_default(&storage, BlockKind::Div);
        assert_eq!(state, DivState::default());
    }

    #[test]
    fn file_storage_persists_blocks_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut storage = FileStorage::open(dir.path()).unwrap();
            assert!(storage.first_boot());
            assert!(save(&mut storage, BlockKind::Div, &DivState { clock_period_ms: 7 }));
            storage.mark_initialized();
        }
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(!storage.first_boot());
        let state: DivState = load_or_default(&storage, BlockKind::Div);
        assert_eq!(state.clock_period_ms, 7);
        assert!(storage.load_block(BlockKind::Arc).is_none());
    }
}
