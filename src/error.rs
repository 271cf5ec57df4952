use thiserror::Error;

use crate::FamilyKey;
use std::fmt::Debug;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ResourceLoad(#[from] ResourceLoadError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to send a command to the overlay thread")]
    SendError,

    #[error("the overlay thread hung up before answering")]
    RecvError,
}

#[derive(Debug, Error)]
pub enum ResourceLoadError {
    #[error("no image set registered for family `{0}`")]
    MissingFamily(FamilyKey),

    #[error("failed decoding {path} for family `{key}`: {reason}")]
    Decode {
        key: FamilyKey,
        path: String,
        reason: String,
    },

    #[error("image {path} for family `{key}` has no frames")]
    EmptyImage { key: FamilyKey, path: String },

    #[error("Failed reading asset path {path}")]
    FailedReadingPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed reading layout path {path}")]
    FailedReadingPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("layout for family `{key}` is malformed")]
    Malformed {
        key: FamilyKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("no layout registered for family `{0}`")]
    UnknownFamily(FamilyKey),
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("panel {0} has no shell on this surface")]
    UnknownPanel(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed reading config path {path}")]
    FailedReadingPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is malformed")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl<T> From<crossbeam_channel::SendError<T>> for AppError
where
    T: Debug,
{
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        AppError::SendError
    }
}
