//! Error types for mirror operations

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::StoreError;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("failed to read local filesystem under {root}: {source}")]
    LocalScan {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to list objects in bucket '{bucket}': {source}")]
    RemoteListing {
        bucket: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to stat object '{key}': {source}")]
    Stat {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to open object '{key}': {source}")]
    Open {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object key '{0}' does not map to a path inside the sync root")]
    UnsafeKey(String),

    #[error("refusing to write object '{key}' through symbolic link {link}")]
    SymlinkInPath { key: String, link: PathBuf },

    #[error("interrupted by shutdown")]
    Interrupted,
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
