//! 대화형 셸(REPL) 루프.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::application::{Keypress, Vorpal, VorpalError};
use crate::infrastructure::adapters::LineRead;
use crate::interface::composition::ConsoleShell;

/// 한 줄씩 읽어 실행한다. `exit` 또는 입력 종료 시 끝난다.
pub async fn run_repl(shell: &ConsoleShell) -> Result<()> {
    print_welcome(&shell.vorpal);
    let mut interrupted_once = false;

    while !shell.vorpal.exit_requested() {
        let terminal = Arc::clone(&shell.terminal);
        let vorpal = shell.vorpal.clone();
        let read = tokio::task::spawn_blocking(move || {
            terminal.read_command(&mut |key: Keypress, value: &str| vorpal.on_keypress(key, value))
        })
        .await
        .context("input reader task failed")??;

        match read {
            LineRead::Submitted(line) => {
                interrupted_once = false;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                shell.vorpal.notify_prompt_submit(line);
                run_line(&shell.vorpal, line).await?;
            }
            LineRead::Interrupted if interrupted_once => break,
            LineRead::Interrupted => {
                interrupted_once = true;
                shell.vorpal.log("(^C again to quit)");
            }
            LineRead::Cancelled => continue,
            LineRead::Eof => break,
        }
    }

    Ok(())
}

/// 명령을 순서대로 실행한다. `exit`가 실행되면 남은 명령은 건너뛴다.
pub async fn run_batch(vorpal: &Vorpal, commands: &[String]) -> Result<()> {
    for command in commands {
        if vorpal.exit_requested() {
            break;
        }
        run_line(vorpal, command).await?;
    }
    Ok(())
}

/// 실행 중 Ctrl+C는 명령 집합 취소로 전달한다.
async fn run_line(vorpal: &Vorpal, line: &str) -> Result<()> {
    let exec = vorpal.exec(line);
    tokio::pin!(exec);

    let outcome = loop {
        tokio::select! {
            outcome = &mut exec => break outcome,
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                if !vorpal.cancel() {
                    debug!("Ctrl+C with nothing to cancel");
                }
            }
        }
    };

    match outcome {
        Ok(_) => Ok(()),
        // 세션이 이미 출력했다.
        Err(VorpalError::Command(err)) => {
            debug!(error = %err, command = line, "command failed");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn print_welcome(vorpal: &Vorpal) {
    let interactive = io::stdout().is_terminal();
    let title = paint("vorpal interactive shell", "1;36", interactive);
    let hint = paint("type `help` for commands, `exit` to leave", "2;37", interactive);
    vorpal.log(title);
    vorpal.log(hint);
    vorpal.log("");
}

fn paint(text: &str, ansi: &str, interactive: bool) -> String {
    if interactive {
        format!("\x1b[{ansi}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}
