//! 미리 준비한 답으로 프롬프트에 응답하는 터미널 어댑터.
//! 헤드리스 실행과 테스트에서 콘솔 대신 쓴다.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tracing::trace;

use crate::application::ports::{PromptQuestion, Terminal};
use crate::domain::help::ScreenSize;

#[derive(Debug, Default)]
struct ScriptState {
    answers: VecDeque<String>,
    asked: Vec<PromptQuestion>,
    delimiter: String,
    cancelled_prompts: usize,
}

#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    state: Mutex<ScriptState>,
    screen: ScreenSize,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screen(screen: ScreenSize) -> Self {
        Self {
            state: Mutex::default(),
            screen,
        }
    }

    /// 다음 프롬프트에 돌려줄 답을 추가한다.
    pub fn push_answer(&self, answer: &str) {
        self.lock().answers.push_back(answer.to_string());
    }

    /// 지금까지 받은 질문들.
    pub fn asked(&self) -> Vec<PromptQuestion> {
        self.lock().asked.clone()
    }

    /// 마지막으로 갱신된 전체 구분자.
    pub fn delimiter(&self) -> String {
        self.lock().delimiter.clone()
    }

    pub fn cancelled_prompts(&self) -> usize {
        self.lock().cancelled_prompts
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    async fn prompt(&self, question: &PromptQuestion) -> Result<String> {
        let mut state = self.lock();
        state.asked.push(question.clone());
        match state.answers.pop_front() {
            Some(answer) if answer.is_empty() => Ok(question.default.clone().unwrap_or_default()),
            Some(answer) => Ok(answer),
            None => match &question.default {
                Some(default) => Ok(default.clone()),
                None => bail!("no scripted answer for `{}`", question.name),
            },
        }
    }

    fn refresh_delimiter(&self, delimiter: &str) {
        trace!(delimiter, "delimiter refreshed");
        self.lock().delimiter = delimiter.to_string();
    }

    fn is_mid_prompt(&self) -> bool {
        false
    }

    fn cancel_active_prompt(&self) {
        self.lock().cancelled_prompts += 1;
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_in_order_then_falls_back_to_default() {
        let terminal = ScriptedTerminal::new();
        terminal.push_answer("blue");
        terminal.push_answer("");

        let mut question = PromptQuestion::new("color", "Favorite color?");
        question.default = Some("red".into());

        assert_eq!(terminal.prompt(&question).await.unwrap(), "blue");
        assert_eq!(terminal.prompt(&question).await.unwrap(), "red");
        assert_eq!(terminal.prompt(&question).await.unwrap(), "red");

        let bare = PromptQuestion::new("name", "Name?");
        assert!(terminal.prompt(&bare).await.is_err());
        assert_eq!(terminal.asked().len(), 4);
    }
}
