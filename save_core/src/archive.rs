//! Save archive access: discovery, document reads and member-preserving
//! rewrites.

use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::{result::ZipError, write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    hashing::content_digest,
    inspector_config::ArchiveConfig,
    world::{WorldDocument, WorldError},
};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt archive {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("archive {path} has no member named {name}")]
    MissingDocument { path: PathBuf, name: String },
    #[error("failed to read {name} from {path}: {source}")]
    Read {
        path: PathBuf,
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unusable world document in {path}: {source}")]
    World {
        path: PathBuf,
        #[source]
        source: WorldError,
    },
    #[error("failed to serialize world document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write temporary archive next to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to rebuild archive {path}: {source}")]
    Rewrite {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("failed to replace {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    /// The archive could not be read as a save; batch callers skip it.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ArchiveError::Open { .. }
                | ArchiveError::Corrupt { .. }
                | ArchiveError::MissingDocument { .. }
                | ArchiveError::Read { .. }
                | ArchiveError::Malformed { .. }
                | ArchiveError::World { .. }
        )
    }

    /// A rewrite failed; the original archive was left in place.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ArchiveError::Serialize(_)
                | ArchiveError::Write { .. }
                | ArchiveError::Rewrite { .. }
                | ArchiveError::Commit { .. }
        )
    }
}

/// One entry of an archive manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveMember {
    pub name: String,
    pub size: u64,
    pub digest: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveStore {
    config: ArchiveConfig,
}

impl ArchiveStore {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn is_candidate(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(self.config.extension()))
            .unwrap_or(false)
    }

    /// Save archives in `directory`, oldest first.
    pub fn list_candidates(&self, directory: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    target: "save_inspector::archive",
                    path = %directory.display(),
                    error = %err,
                    "archive.list_failed"
                );
                return Vec::new();
            }
        };

        let mut candidates: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() || !self.is_candidate(&path) {
                    return None;
                }
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, path))
            })
            .collect();
        candidates.sort();

        debug!(
            target: "save_inspector::archive",
            path = %directory.display(),
            count = candidates.len(),
            "archive.listed"
        );
        candidates.into_iter().map(|(_, path)| path).collect()
    }

    pub fn latest(&self, directory: &Path) -> Option<PathBuf> {
        self.list_candidates(directory).pop()
    }

    pub fn read_document(&self, path: &Path) -> Result<WorldDocument, ArchiveError> {
        let mut archive = open_archive(path)?;
        let name = self.config.world_document();
        let mut bytes = Vec::new();
        {
            let mut member = archive.by_name(name).map_err(|err| match err {
                ZipError::FileNotFound => ArchiveError::MissingDocument {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                },
                source => ArchiveError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
            member
                .read_to_end(&mut bytes)
                .map_err(|source| ArchiveError::Read {
                    path: path.to_path_buf(),
                    name: name.to_string(),
                    source,
                })?;
        }

        let value = WorldDocument::from_slice(&bytes).map_err(|source| ArchiveError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        let document = WorldDocument::from_value(value).map_err(|source| ArchiveError::World {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            target: "save_inspector::archive",
            path = %path.display(),
            timestamp = document.timestamp().as_deref().unwrap_or("<none>"),
            bytes = bytes.len(),
            "archive.document_read"
        );
        Ok(document)
    }

    /// Replace the world document inside `path`.
    ///
    /// The new archive is assembled in a temporary file beside the original.
    /// Other members are copied without recompression and the world document
    /// is appended last. The original is only touched by the final rename.
    pub fn write_document(&self, path: &Path, document: &WorldDocument) -> Result<(), ArchiveError> {
        let bytes = document
            .to_json_bytes(self.config.json_indent())
            .map_err(ArchiveError::Serialize)?;
        let name = self.config.world_document();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut source = open_archive(path)?;
        let write_err = |source: io::Error| ArchiveError::Write {
            path: path.to_path_buf(),
            source,
        };
        let rewrite_err = |source: ZipError| ArchiveError::Rewrite {
            path: path.to_path_buf(),
            source,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(directory)
            .map_err(write_err)?;

        let mut method = CompressionMethod::Deflated;
        {
            let mut writer = ZipWriter::new(temp.as_file_mut());
            for index in 0..source.len() {
                let member = source.by_index_raw(index).map_err(rewrite_err)?;
                if member.name() == name {
                    if member.compression() == CompressionMethod::Stored {
                        method = CompressionMethod::Stored;
                    }
                    continue;
                }
                writer.raw_copy_file(member).map_err(rewrite_err)?;
            }

            let options = FileOptions::default().compression_method(method);
            writer.start_file(name, options).map_err(rewrite_err)?;
            writer.write_all(&bytes).map_err(write_err)?;
            writer.finish().map_err(rewrite_err)?;
        }
        temp.as_file().sync_all().map_err(write_err)?;
        drop(source);

        // Temp files are created owner-only; keep the save's own mode.
        let permissions = fs::metadata(path).map_err(write_err)?.permissions();
        fs::set_permissions(temp.path(), permissions).map_err(write_err)?;

        temp.persist(path).map_err(|err| ArchiveError::Commit {
            path: path.to_path_buf(),
            source: err.error,
        })?;

        info!(
            target: "save_inspector::archive",
            path = %path.display(),
            bytes = bytes.len(),
            "archive.document_written"
        );
        Ok(())
    }

    /// Name, size and content digest of every member, in archive order.
    pub fn members(&self, path: &Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
        let mut archive = open_archive(path)?;
        let mut members = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut member = archive.by_index(index).map_err(|source| ArchiveError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
            let name = member.name().to_string();
            let mut bytes = Vec::with_capacity(member.size() as usize);
            member
                .read_to_end(&mut bytes)
                .map_err(|source| ArchiveError::Read {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    source,
                })?;
            members.push(ArchiveMember {
                name,
                size: bytes.len() as u64,
                digest: content_digest(&bytes),
            });
        }
        Ok(members)
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
