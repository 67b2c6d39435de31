//! vorpal library root.
//! 대화형 명령 셸 프레임워크의 계층을 외부에 노출한다.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;

pub use application::config::ShellConfig;
pub use application::ports::ShellPorts;
pub use application::{
    CommandError, CommandHandle, CommandInstance, CommandOutcome, ExecOptions, Vorpal,
    VorpalBuilder, VorpalError, VorpalEvent,
};
pub use domain::value::{ArgOverrides, ArgValue, CommandArgs};
