//! 애플리케이션 조립(composition root) 모듈.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::application::config::ShellConfig;
use crate::application::ports::ShellPorts;
use crate::application::vorpal::Vorpal;
use crate::infrastructure::adapters::{
    BufferedOutput, ConsoleOutput, ConsoleTerminal, FileStorageProvider, MemoryHistory,
    PrefixAutocompleter, ScriptedTerminal,
};

/// 콘솔에 연결된 셸. REPL은 터미널의 줄 편집기를 직접 쓴다.
pub struct ConsoleShell {
    pub vorpal: Vorpal,
    pub terminal: Arc<ConsoleTerminal>,
}

/// 입출력이 메모리에 묶인 셸.
pub struct HeadlessShell {
    pub vorpal: Vorpal,
    pub output: Arc<BufferedOutput>,
    pub terminal: Arc<ScriptedTerminal>,
    pub history: Arc<MemoryHistory>,
}

/// stdout/crossterm/임시 디렉터리 저장소로 셸을 조립한다.
pub fn console_shell(config: ShellConfig) -> Result<ConsoleShell> {
    let terminal = Arc::new(ConsoleTerminal::new());
    let ports = ShellPorts {
        terminal: Arc::clone(&terminal) as _,
        history: Arc::new(MemoryHistory::new()),
        autocompleter: Arc::new(PrefixAutocompleter::new()),
        output: Arc::new(ConsoleOutput),
        storage: Arc::new(FileStorageProvider::default()),
    };
    let vorpal = Vorpal::builder(ports).config(config).build()?;
    Ok(ConsoleShell { vorpal, terminal })
}

/// 출력은 버퍼로, 프롬프트는 준비된 답으로 처리하는 셸을 조립한다.
pub fn headless_shell(config: ShellConfig, storage_dir: &Path) -> Result<HeadlessShell> {
    let output = Arc::new(BufferedOutput::new());
    let terminal = Arc::new(ScriptedTerminal::new());
    let history = Arc::new(MemoryHistory::new());
    let ports = ShellPorts {
        terminal: Arc::clone(&terminal) as _,
        history: Arc::clone(&history) as _,
        autocompleter: Arc::new(PrefixAutocompleter::new()),
        output: Arc::clone(&output) as _,
        storage: Arc::new(FileStorageProvider::new(storage_dir)),
    };
    let vorpal = Vorpal::builder(ports).config(config).build()?;
    Ok(HeadlessShell {
        vorpal,
        output,
        terminal,
        history,
    })
}
