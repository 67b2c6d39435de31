//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use vorpal::ShellConfig;
use vorpal::interface::composition::{HeadlessShell, headless_shell};

/// 임시 저장소 디렉터리와 함께 헤드리스 셸을 만든다. 디렉터리는 반환값이 살아 있는 동안 유지된다.
pub fn shell() -> (HeadlessShell, TempDir) {
    shell_with(ShellConfig::default())
}

pub fn shell_with(config: ShellConfig) -> (HeadlessShell, TempDir) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let shell = headless_shell(config, dir.path()).expect("should build headless shell");
    (shell, dir)
}

/// 여러 훅에서 호출 순서를 기록하는 공유 로그.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
