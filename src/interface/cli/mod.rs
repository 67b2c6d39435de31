//! CLI 인터페이스 모듈 묶음.
//! 인자 파싱, REPL 루프, 예제 명령을 한 네임스페이스로 관리한다.

pub mod command;
pub mod demo;
pub mod repl;

pub use command::{Cli, CliAction};
pub use repl::{run_batch, run_repl};
