//! 애플리케이션 포트를 실제 인프라 구현체로 연결하는 어댑터 계층.

mod autocomplete;
mod history;
mod local_storage;
mod output;
mod scripted_terminal;
mod terminal;

pub use autocomplete::PrefixAutocompleter;
pub use history::MemoryHistory;
pub use local_storage::{FileLocalStorage, FileStorageProvider};
pub use output::{BufferedOutput, ConsoleOutput};
pub use scripted_terminal::ScriptedTerminal;
pub use terminal::{ConsoleTerminal, KeyHandler, LineRead, format_columns, read_line};
