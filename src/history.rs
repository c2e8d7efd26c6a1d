// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::episode::episode_key;
use crate::error::HistoryError;
use crate::feed::Episode;

/// File name used when no history path is given
pub const DEFAULT_HISTORY_FILENAME: &str = ".radionews-history.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    played: Vec<String>,
}

/// Keys of played episodes, backed by a JSON file
#[derive(Debug, Clone)]
pub struct PlayedHistory {
    path: PathBuf,
    played: Vec<String>,
}

impl PlayedHistory {
    /// Load the history at `path`; a missing file is an empty history
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                played: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| HistoryError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: HistoryFile =
            serde_json::from_str(&content).map_err(|e| HistoryError::JsonParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            played: file.played,
        })
    }

    /// Write the history back to its file
    pub fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = HistoryFile {
            played: self.played.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        std::fs::write(&self.path, json).map_err(|e| HistoryError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.played.len()
    }

    pub fn is_empty(&self) -> bool {
        self.played.is_empty()
    }

    /// Record a key as played; returns false if it already was
    pub fn mark_played(&mut self, key: &str) -> bool {
        if self.is_played(key) {
            return false;
        }
        self.played.push(key.to_string());
        true
    }

    pub fn is_played(&self, key: &str) -> bool {
        self.played.iter().any(|k| k == key)
    }

    pub fn is_episode_played(&self, episode: &Episode) -> bool {
        self.is_played(&episode_key(episode))
    }

    /// Forget every played key, returning how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.played.len();
        self.played.clear();
        count
    }

    /// Episodes not yet played, in their original order
    pub fn unplayed<'a>(&self, episodes: &'a [Episode]) -> Vec<&'a Episode> {
        episodes
            .iter()
            .filter(|episode| !self.is_episode_played(episode))
            .collect()
    }
}
