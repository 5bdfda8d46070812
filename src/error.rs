use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no user matches the query")]
    NoResultFound,
    #[error("more than one user matches the query")]
    MultipleResultsFound,
    #[error("user {0} already exists")]
    UserAlreadyExists(String),
    #[error("no user registered with this email")]
    UnknownEmail,
    #[error("reset token is missing or invalid")]
    InvalidResetToken,
    #[error("DotEnvy error: {0}")]
    DotEnvyError(#[from] dotenvy::Error),
    #[error("password_hash error: {0}")]
    PasswordHashError(argon2::password_hash::Error),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("std::io::Error: {0}")]
    StdIoError(#[from] std::io::Error),
    #[error("std::num::ParseBoolError: {0}")]
    StdParseBoolError(#[from] std::str::ParseBoolError),
    #[error("std::num::ParseIntError: {0}")]
    StdNumParseIntError(#[from] std::num::ParseIntError),
    #[error("tokio::sync::mpsc::error::SendError: {0}")]
    TokioSyncMpscSendError(String),
    #[error("tokio::task::JoinError: {0}")]
    TokioJoinError(#[from] tokio::task::JoinError),
    #[error("tokio::sync::oneshot::error::RecvError: {0}")]
    TokioSyncOneshotReceiveError(#[from] tokio::sync::oneshot::error::RecvError),
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::PasswordHashError(err)
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::TokioSyncMpscSendError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
