//! Integration tests for the FIFO execution queue.

mod common;

use std::time::Duration;

use serde_json::{Value, json};

use vorpal::{ExecOptions, Vorpal, VorpalError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn register_record(vorpal: &Vorpal, trace: &common::Trace) {
    let t = trace.clone();
    vorpal.command("record <name> <ms>").action(move |_, args| {
        let trace = t.clone();
        async move {
            let name = args.text("name").unwrap_or_default().to_string();
            let ms: u64 = args.text("ms").unwrap_or("0").parse()?;
            trace.push(format!("start {name}"));
            tokio::time::sleep(Duration::from_millis(ms)).await;
            trace.push(format!("end {name}"));
            Ok::<_, anyhow::Error>(name)
        }
    });
}

fn register_ping(vorpal: &Vorpal) {
    vorpal
        .command("ping")
        .action(|_, _| async { Ok::<_, anyhow::Error>("pong") });
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_commands_run_one_at_a_time_in_submission_order() {
    let (shell, _dir) = common::shell();
    let trace = common::Trace::default();
    register_record(&shell.vorpal, &trace);

    let vorpal = &shell.vorpal;
    let (slow, fast, mid) = tokio::join!(
        vorpal.exec("record slow 30"),
        vorpal.exec("record fast 0"),
        vorpal.exec("record mid 10"),
    );

    assert_eq!(slow.unwrap(), json!("slow"));
    assert_eq!(fast.unwrap(), json!("fast"));
    assert_eq!(mid.unwrap(), json!("mid"));
    assert_eq!(
        trace.entries(),
        vec![
            "start slow",
            "end slow",
            "start fast",
            "end fast",
            "start mid",
            "end mid"
        ]
    );
    assert_eq!(vorpal.queue_len(), 0);
    assert!(!vorpal.currently_executing());
}

#[tokio::test]
async fn test_active_command_reports_the_running_item() {
    let (shell, _dir) = common::shell();
    shell
        .vorpal
        .command("hang")
        .action(|_, _| std::future::pending::<anyhow::Result<()>>());
    register_ping(&shell.vorpal);

    let vorpal = shell.vorpal.clone();
    let running = tokio::spawn(async move { vorpal.exec("hang").await });
    while !shell.vorpal.currently_executing() {
        tokio::task::yield_now().await;
    }
    assert_eq!(shell.vorpal.active_command().as_deref(), Some("hang"));

    let vorpal = shell.vorpal.clone();
    let queued = tokio::spawn(async move { vorpal.exec("ping").await });
    while shell.vorpal.queue_len() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(shell.vorpal.cancel());
    running.await.unwrap().unwrap();
    assert_eq!(queued.await.unwrap().unwrap(), json!("pong"));
    assert_eq!(shell.vorpal.active_command(), None);
}

// ---------------------------------------------------------------------------
// exec_sync / exec_callback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_exec_sync_refuses_to_interleave() {
    let (shell, _dir) = common::shell();
    shell
        .vorpal
        .command("hang")
        .action(|_, _| std::future::pending::<anyhow::Result<()>>());
    register_ping(&shell.vorpal);

    let vorpal = shell.vorpal.clone();
    let running = tokio::spawn(async move { vorpal.exec("hang").await });
    while !shell.vorpal.currently_executing() {
        tokio::task::yield_now().await;
    }

    let err = shell
        .vorpal
        .exec_sync("ping", ExecOptions::default())
        .expect_err("queue is busy");
    assert!(matches!(err, VorpalError::QueueBusy));

    while !shell.vorpal.cancel() {
        tokio::task::yield_now().await;
    }
    running.await.unwrap().unwrap();
    assert_eq!(
        shell.vorpal.exec_sync("ping", ExecOptions::default()).unwrap(),
        json!("pong")
    );
}

#[test]
fn test_exec_sync_ignores_pipes() {
    let (shell, _dir) = common::shell();
    let trace = common::Trace::default();
    shell.vorpal.command("emit").action(|ctx, _| async move {
        ctx.log("emitted");
        Ok::<_, anyhow::Error>(())
    });
    let t = trace.clone();
    shell.vorpal.command("sink").action(move |_, _| {
        let trace = t.clone();
        async move {
            trace.push("sink ran");
            Ok::<_, anyhow::Error>(())
        }
    });

    shell
        .vorpal
        .exec_sync("emit | sink", ExecOptions::default())
        .unwrap();
    assert!(trace.entries().is_empty());
    assert_eq!(shell.output.lines(), vec!["emitted"]);
}

#[tokio::test]
async fn test_exec_callback_delivers_the_outcome() {
    let (shell, _dir) = common::shell();
    register_ping(&shell.vorpal);

    let (tx, rx) = tokio::sync::oneshot::channel();
    shell.vorpal.exec_callback("ping", move |outcome| {
        let _ = tx.send(outcome);
    });

    let outcome = rx.await.unwrap();
    assert_eq!(outcome.unwrap(), json!("pong"));
}

#[test]
fn test_exec_callback_without_runtime_reports_an_error() {
    let (shell, _dir) = common::shell();
    register_ping(&shell.vorpal);

    let (tx, rx) = std::sync::mpsc::channel();
    shell.vorpal.exec_callback("ping", move |outcome| {
        let _ = tx.send(outcome.map_err(|err| err.to_string()));
    });

    let outcome = rx.recv().unwrap();
    let message = outcome.expect_err("no runtime to run on");
    assert!(message.contains("no async runtime"));
    assert!(!shell.vorpal.currently_executing());
}

#[test]
fn test_exec_sync_returns_the_action_value() {
    let (shell, _dir) = common::shell();
    register_ping(&shell.vorpal);
    assert_eq!(
        shell.vorpal.exec_sync("ping", ExecOptions::default()).unwrap(),
        json!("pong")
    );
    assert_eq!(
        shell.vorpal.exec_sync("help", ExecOptions::default()).unwrap(),
        Value::Null
    );
}
