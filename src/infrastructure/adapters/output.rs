//! 세션 출력 포트 구현 어댑터.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::application::ports::OutputSink;

/// stdout으로 한 줄씩 출력하는 어댑터.
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl OutputSink for ConsoleOutput {
    fn write_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// 출력된 줄을 메모리에 모아 두는 어댑터(테스트/임베딩용).
#[derive(Debug, Default)]
pub struct BufferedOutput {
    lines: Mutex<Vec<String>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 모인 줄을 비우면서 돌려준다.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }
}

impl OutputSink for BufferedOutput {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_output_collects_and_drains() {
        let output = BufferedOutput::new();
        output.write_line("one");
        output.write_line("two");
        assert_eq!(output.contents(), "one\ntwo");
        assert_eq!(output.take(), vec!["one", "two"]);
        assert!(output.lines().is_empty());
    }
}
