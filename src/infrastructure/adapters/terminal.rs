//! crossterm 기반 콘솔 터미널 어댑터.
//! 한 줄 편집기와 프롬프트 질문, 구분자 갱신, 진행 중 입력 취소를 제공한다.

use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, ClearType};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::application::events::Keypress;
use crate::application::ports::{PromptQuestion, Terminal};
use crate::application::session::KeypressResult;
use crate::domain::help::ScreenSize;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_DELIMITER: &str = "vorpal~$ ";

/// 한 줄 읽기의 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    Submitted(String),
    /// Ctrl+C.
    Interrupted,
    /// Ctrl+D 또는 입력 종료.
    Eof,
    /// `cancel_active_prompt`로 중단됨.
    Cancelled,
}

/// 편집 중 특수 키를 세션 엔진에 넘기는 콜백.
pub type KeyHandler<'a> = &'a mut dyn FnMut(Keypress, &str) -> Option<KeypressResult>;

#[derive(Debug)]
pub struct ConsoleTerminal {
    delimiter: Mutex<String>,
    mid_prompt: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl Default for ConsoleTerminal {
    fn default() -> Self {
        Self {
            delimiter: Mutex::new(DEFAULT_DELIMITER.to_string()),
            mid_prompt: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(&self) -> String {
        self.delimiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 현재 구분자로 명령 한 줄을 읽는다. 블로킹 호출이다.
    pub fn read_command(&self, on_key: KeyHandler<'_>) -> Result<LineRead> {
        self.cancel.store(false, Ordering::SeqCst);
        let delimiter = self.delimiter();
        read_line(&delimiter, &self.cancel, on_key)
    }
}

#[async_trait]
impl Terminal for ConsoleTerminal {
    async fn prompt(&self, question: &PromptQuestion) -> Result<String> {
        let mut message = question.message.clone();
        if let Some(default) = &question.default {
            message.push_str(&format!(" ({default})"));
        }
        if !message.ends_with(' ') {
            message.push(' ');
        }

        self.cancel.store(false, Ordering::SeqCst);
        self.mid_prompt.store(true, Ordering::SeqCst);
        let cancel = Arc::clone(&self.cancel);
        let read = tokio::task::spawn_blocking(move || {
            read_line(&message, &cancel, &mut |_: Keypress, _: &str| None)
        })
        .await
        .context("prompt reader task failed");
        self.mid_prompt.store(false, Ordering::SeqCst);

        match read?? {
            LineRead::Submitted(answer) if answer.is_empty() => {
                Ok(question.default.clone().unwrap_or_default())
            }
            LineRead::Submitted(answer) => Ok(answer),
            LineRead::Eof => match &question.default {
                Some(default) => Ok(default.clone()),
                None => bail!("input closed while answering `{}`", question.name),
            },
            LineRead::Interrupted | LineRead::Cancelled => {
                bail!("prompt `{}` was cancelled", question.name)
            }
        }
    }

    fn refresh_delimiter(&self, delimiter: &str) {
        *self.delimiter.lock().unwrap_or_else(PoisonError::into_inner) = delimiter.to_string();
    }

    fn is_mid_prompt(&self) -> bool {
        self.mid_prompt.load(Ordering::SeqCst)
    }

    fn cancel_active_prompt(&self) {
        debug!("cancelling active prompt");
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn screen_size(&self) -> ScreenSize {
        match terminal::size() {
            Ok((columns, rows)) if columns > 0 => ScreenSize { columns, rows },
            _ => ScreenSize::default(),
        }
    }
}

/// TTY면 raw 모드 편집기로, 아니면 일반 라인 입력으로 읽는다.
pub fn read_line(prompt: &str, cancel: &AtomicBool, on_key: KeyHandler<'_>) -> Result<LineRead> {
    if !supports_interactive_input() {
        return read_line_fallback(prompt);
    }
    read_line_interactive(prompt, cancel, on_key)
}

fn supports_interactive_input() -> bool {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return false;
    }

    if let Ok(term) = env::var("TERM")
        && term.eq_ignore_ascii_case("dumb")
    {
        return false;
    }

    true
}

fn read_line_fallback(prompt: &str) -> Result<LineRead> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(LineRead::Eof);
    }
    Ok(LineRead::Submitted(trim_newline(line)))
}

fn read_line_interactive(
    prompt: &str,
    cancel: &AtomicBool,
    on_key: KeyHandler<'_>,
) -> Result<LineRead> {
    let mut stdout = io::stdout();
    let _guard = InputGuard::enter(&mut stdout)?;

    let mut input = String::new();
    let mut cursor_chars = 0usize;
    render_line(&mut stdout, prompt, &input, cursor_chars)?;

    loop {
        if cancel.load(Ordering::SeqCst) {
            finish_line(&mut stdout)?;
            return Ok(LineRead::Cancelled);
        }
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        match event::read()? {
            Event::Paste(text) => {
                for ch in text.chars().filter(|c| *c != '\n' && *c != '\r') {
                    insert_char_at(&mut input, cursor_chars, ch);
                    cursor_chars += 1;
                }
            }
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

                match key.code {
                    KeyCode::Enter => {
                        finish_line(&mut stdout)?;
                        return Ok(LineRead::Submitted(input));
                    }
                    KeyCode::Char('c') if ctrl => {
                        finish_line(&mut stdout)?;
                        return Ok(LineRead::Interrupted);
                    }
                    KeyCode::Char('d') if ctrl && input.is_empty() => {
                        finish_line(&mut stdout)?;
                        return Ok(LineRead::Eof);
                    }
                    KeyCode::Up | KeyCode::Down => {
                        let key = if key.code == KeyCode::Up {
                            Keypress::Up
                        } else {
                            Keypress::Down
                        };
                        if let Some(KeypressResult::Replace(line)) = on_key(key, &input) {
                            input = line;
                            cursor_chars = input.chars().count();
                        }
                    }
                    KeyCode::Tab => match on_key(Keypress::Tab, &input) {
                        Some(KeypressResult::Replace(line)) => {
                            input = line;
                            cursor_chars = input.chars().count();
                        }
                        Some(KeypressResult::Suggestions(items)) => {
                            let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
                            finish_line(&mut stdout)?;
                            for row in format_columns(&items, width) {
                                write!(stdout, "{row}\r\n")?;
                            }
                        }
                        None => {}
                    },
                    KeyCode::Backspace => {
                        if cursor_chars > 0 {
                            remove_char_at(&mut input, cursor_chars - 1);
                            cursor_chars -= 1;
                        }
                        on_key(Keypress::Other, &input);
                    }
                    KeyCode::Delete => {
                        if cursor_chars < input.chars().count() {
                            remove_char_at(&mut input, cursor_chars);
                        }
                        on_key(Keypress::Other, &input);
                    }
                    KeyCode::Left => cursor_chars = cursor_chars.saturating_sub(1),
                    KeyCode::Right => {
                        cursor_chars = (cursor_chars + 1).min(input.chars().count());
                    }
                    KeyCode::Home => cursor_chars = 0,
                    KeyCode::End => cursor_chars = input.chars().count(),
                    KeyCode::Char(ch) => {
                        if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) {
                            insert_char_at(&mut input, cursor_chars, ch);
                            cursor_chars += 1;
                            on_key(Keypress::Other, &input);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        render_line(&mut stdout, prompt, &input, cursor_chars)?;
    }
}

fn render_line(stdout: &mut io::Stdout, prompt: &str, input: &str, cursor_chars: usize) -> Result<()> {
    let before_cursor: String = input.chars().take(cursor_chars).collect();
    let col = display_width(prompt) + display_width(&before_cursor);
    write!(stdout, "\r")?;
    execute!(stdout, terminal::Clear(ClearType::CurrentLine))?;
    write!(stdout, "{prompt}{input}")?;
    execute!(stdout, cursor::MoveToColumn(col.min(u16::MAX as usize) as u16))?;
    stdout.flush()?;
    Ok(())
}

fn finish_line(stdout: &mut io::Stdout) -> Result<()> {
    write!(stdout, "\r\n")?;
    stdout.flush()?;
    Ok(())
}

/// 후보 목록을 화면 폭에 맞춘 열로 배치한다.
pub fn format_columns(items: &[String], width: usize) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    let longest = items.iter().map(|i| display_width(i)).max().unwrap_or(0);
    let column = longest + 2;
    let per_row = (width / column).max(1);

    items
        .chunks(per_row)
        .map(|row| {
            let mut line = String::new();
            for item in row {
                line.push_str(item);
                line.push_str(&" ".repeat(column - display_width(item)));
            }
            line.trim_end().to_string()
        })
        .collect()
}

fn trim_newline(mut s: String) -> String {
    while matches!(s.chars().last(), Some('\n' | '\r')) {
        s.pop();
    }
    s
}

fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

fn insert_char_at(input: &mut String, char_idx: usize, ch: char) {
    let byte_idx = byte_index_at_char(input, char_idx);
    input.insert(byte_idx, ch);
}

fn remove_char_at(input: &mut String, char_idx: usize) {
    let start = byte_index_at_char(input, char_idx);
    let end = byte_index_at_char(input, char_idx + 1);
    if start < end && end <= input.len() {
        input.replace_range(start..end, "");
    }
}

fn byte_index_at_char(input: &str, char_idx: usize) -> usize {
    input
        .char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(input.len())
}

struct InputGuard;

impl InputGuard {
    fn enter(stdout: &mut io::Stdout) -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout, cursor::Show)?;
        Ok(Self)
    }
}

impl Drop for InputGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = terminal::disable_raw_mode();
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_wrap_to_width() {
        let items: Vec<String> = ["alpha", "beta", "gamma", "delta"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = format_columns(&items, 16);
        assert_eq!(rows, vec!["alpha  beta", "gamma  delta"]);
    }

    #[test]
    fn edits_multibyte_input_by_char() {
        let mut input = String::from("한글");
        insert_char_at(&mut input, 1, 'x');
        assert_eq!(input, "한x글");
        remove_char_at(&mut input, 0);
        assert_eq!(input, "x글");
    }

    #[test]
    fn refresh_and_cancel_flags() {
        let terminal = ConsoleTerminal::new();
        terminal.refresh_delimiter("app:repl~$ ");
        assert_eq!(terminal.delimiter(), "app:repl~$ ");
        assert!(!terminal.is_mid_prompt());
        terminal.cancel_active_prompt();
        assert!(terminal.cancel.load(Ordering::SeqCst));
    }
}
