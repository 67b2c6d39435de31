//! 셸 이벤트. 구독자는 `Vorpal::subscribe`로 받는다.

/// 세션 엔진이 처리하는 키 입력.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypress {
    Up,
    Down,
    Tab,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VorpalEvent {
    CommandRegistered { name: String },
    ClientCommandExecuted { command: String },
    ClientCommandError { command: String, error: String },
    ClientCommandCancelled { command: String },
    /// 모드 종료 후 이력의 마지막 항목.
    ModeExit { last: Option<String> },
    ClientPromptSubmit { text: String },
    Keypress { key: Keypress, value: String },
    Exit,
}
