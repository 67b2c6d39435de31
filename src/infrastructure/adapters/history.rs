//! 메모리 기반 명령 이력 어댑터.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::application::ports::CommandHistory;

const MAX_ENTRIES: usize = 500;

#[derive(Debug, Default)]
struct Scope {
    entries: Vec<String>,
    /// `entries.len()`이면 가장 최근 항목 다음(빈 입력) 위치.
    cursor: usize,
}

#[derive(Debug)]
struct HistoryState {
    id: Option<String>,
    scopes: Vec<Scope>,
}

/// 커서가 있는 이력. 모드에 들어가면 독립된 구간을 쌓고 나올 때 버린다.
#[derive(Debug)]
pub struct MemoryHistory {
    state: Mutex<HistoryState>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self {
            state: Mutex::new(HistoryState {
                id: None,
                scopes: vec![Scope::default()],
            }),
        }
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<String> {
        self.lock().id.clone()
    }

    /// 현재 구간의 항목들(오래된 순).
    pub fn entries(&self) -> Vec<String> {
        let mut state = self.lock();
        current(&mut state).entries.clone()
    }

    /// 열려 있는 모드 구간 수.
    pub fn depth(&self) -> usize {
        self.lock().scopes.len() - 1
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn current(state: &mut HistoryState) -> &mut Scope {
    if state.scopes.is_empty() {
        state.scopes.push(Scope::default());
    }
    let last = state.scopes.len() - 1;
    &mut state.scopes[last]
}

impl CommandHistory for MemoryHistory {
    fn push_command(&self, text: &str) {
        let text = text.trim();
        let mut state = self.lock();
        let scope = current(&mut state);
        if !text.is_empty() && scope.entries.last().map(String::as_str) != Some(text) {
            scope.entries.push(text.to_string());
            if scope.entries.len() > MAX_ENTRIES {
                scope.entries.remove(0);
            }
        }
        scope.cursor = scope.entries.len();
    }

    fn previous(&self) -> Option<String> {
        let mut state = self.lock();
        let scope = current(&mut state);
        if scope.entries.is_empty() {
            return None;
        }
        scope.cursor = scope.cursor.saturating_sub(1);
        scope.entries.get(scope.cursor).cloned()
    }

    /// 가장 최근 항목을 지나면 빈 문자열을 돌려준다.
    fn next(&self) -> Option<String> {
        let mut state = self.lock();
        let scope = current(&mut state);
        if scope.entries.is_empty() {
            return None;
        }
        scope.cursor = (scope.cursor + 1).min(scope.entries.len());
        Some(scope.entries.get(scope.cursor).cloned().unwrap_or_default())
    }

    fn enter_mode_scope(&self) {
        let mut state = self.lock();
        state.scopes.push(Scope::default());
        trace!(depth = state.scopes.len() - 1, "history mode scope entered");
    }

    fn exit_mode_scope(&self) {
        let mut state = self.lock();
        if state.scopes.len() > 1 {
            state.scopes.pop();
        }
        trace!(depth = state.scopes.len() - 1, "history mode scope exited");
    }

    fn peek(&self) -> Option<String> {
        let mut state = self.lock();
        current(&mut state).entries.last().cloned()
    }

    /// id가 바뀌면 새 이력으로 시작한다.
    fn set_id(&self, id: &str) {
        let mut state = self.lock();
        if state.id.as_deref() == Some(id) {
            return;
        }
        state.id = Some(id.to_string());
        state.scopes = vec![Scope::default()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_back_and_forward() {
        let history = MemoryHistory::new();
        history.push_command("one");
        history.push_command("two");
        history.push_command("two");

        assert_eq!(history.previous().as_deref(), Some("two"));
        assert_eq!(history.previous().as_deref(), Some("one"));
        assert_eq!(history.previous().as_deref(), Some("one"));
        assert_eq!(history.next().as_deref(), Some("two"));
        assert_eq!(history.next().as_deref(), Some(""));
    }

    #[test]
    fn mode_scope_is_discarded_on_exit() {
        let history = MemoryHistory::new();
        history.push_command("repl");
        history.enter_mode_scope();
        history.push_command("1 + 1");
        assert_eq!(history.peek().as_deref(), Some("1 + 1"));
        assert_eq!(history.depth(), 1);

        history.exit_mode_scope();
        assert_eq!(history.depth(), 0);
        assert_eq!(history.peek().as_deref(), Some("repl"));
        assert_eq!(history.entries(), vec!["repl"]);
    }

    #[test]
    fn new_id_starts_a_fresh_log() {
        let history = MemoryHistory::new();
        history.push_command("a");
        history.set_id("project");
        assert!(history.previous().is_none());
        assert_eq!(history.id().as_deref(), Some("project"));
    }
}
