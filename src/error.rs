use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::{DataKind, Domain};

#[derive(Debug, Error, Diagnostic)]
pub enum ConsoleError {
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("no {kind} available for {domain}")]
    DataUnavailable { domain: Domain, kind: DataKind },

    #[error("no domain has data; upload a dataset first")]
    NoDomainAvailable,

    #[error("analytics request failed: {0}")]
    ApiHttp(String),

    #[error("analytics backend returned status {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("upload for {domain} failed: {message}")]
    UploadFailed { domain: Domain, message: String },

    #[error("login rejected: {0}")]
    AuthFailed(String),

    #[error("malformed payload: {0}")]
    InvalidPayload(String),

    #[error("missing config file insightify.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
