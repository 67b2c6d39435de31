//! 애플리케이션 계층 에러 타입.

use thiserror::Error;

pub use crate::domain::binder::BindError;

/// 설정/사용 오류. 호출한 지점에서 즉시 `Err`로 반환된다.
#[derive(Debug, Error)]
pub enum VorpalError {
    #[error(
        "Duplicate alias \"{alias}\" for command \"{command}\" detected. Was first reserved by command \"{owner}\"."
    )]
    DuplicateAlias {
        alias: String,
        command: String,
        owner: String,
    },
    #[error("Cannot call init from a non-mode action: {0}")]
    InitOnNonMode(String),
    #[error("command `{0}` is not registered")]
    UnknownCommand(String),
    #[error("a session id is required")]
    MissingSessionId,
    #[error("no session found for id `{0}`")]
    SessionNotFound(String),
    #[error("local_storage() requires a unique key to be passed in")]
    MissingStorageId,
    #[error("local storage id has not been set; call local_storage(id) first")]
    StorageNotInitialized,
    #[error("a command is already executing; exec_sync cannot interleave")]
    QueueBusy,
    #[error("local storage failure: {0:#}")]
    Storage(anyhow::Error),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// 명령 실행 결과로 전달되는 사용자 수준 에러.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Validation(String),
    #[error("{0:#}")]
    Action(anyhow::Error),
    #[error("{0}")]
    Remote(String),
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Action(err)
    }
}
