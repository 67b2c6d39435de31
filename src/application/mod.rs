//! Application layer
//! 명령 등록/실행 흐름을 정의하고 포트(추상 인터페이스)를 통해 인프라를 사용한다.

pub mod builtins;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod ports;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod shell;
pub mod vorpal;

pub use command::{ActionHandle, Cancellable, Command, CommandHooks};
pub use error::{BindError, CommandError, VorpalError};
pub use events::{Keypress, VorpalEvent};
pub use instance::CommandInstance;
pub use registry::{CommandHandle, CommandRegistry};
pub use session::{CommandOutcome, KeypressResult, PendingCommand, Session};
pub use vorpal::{CommandOptions, ExecOptions, Vorpal, VorpalBuilder};
