pub mod checkpoint;

pub use checkpoint::CheckpointWriter;

use std::path::PathBuf;

/// Phases of a run, in the order the controller walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    LoadingFile,
    Selecting,
    Translating,
    Checkpointing,
    Finalizing,
    Done,
    Aborted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Initializing => write!(f, "initializing"),
            RunState::LoadingFile => write!(f, "loading_file"),
            RunState::Selecting => write!(f, "selecting"),
            RunState::Translating => write!(f, "translating"),
            RunState::Checkpointing => write!(f, "checkpointing"),
            RunState::Finalizing => write!(f, "finalizing"),
            RunState::Done => write!(f, "done"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    /// Nothing was written for this file.
    Skipped(String),
    Failed(String),
    Aborted,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub language: Option<String>,
    pub rows_selected: usize,
    pub rows_translated: usize,
    pub rows_fallback: usize,
    pub checkpoints: usize,
    pub status: FileStatus,
}

impl FileReport {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            output: None,
            language: None,
            rows_selected: 0,
            rows_translated: 0,
            rows_fallback: 0,
            checkpoints: 0,
            status: FileStatus::Skipped("not processed".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .count()
    }

    pub fn rows_translated(&self) -> usize {
        self.files.iter().map(|f| f.rows_translated).sum()
    }

    pub fn rows_fallback(&self) -> usize {
        self.files.iter().map(|f| f.rows_fallback).sum()
    }
}
