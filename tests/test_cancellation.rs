//! Integration tests for cancelling a running command set.

mod common;

use serde_json::{Value, json};

use vorpal::application::VorpalEvent;
use vorpal::{CommandInstance, Vorpal};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn register_hang(vorpal: &Vorpal, trace: &common::Trace) {
    let canceller_trace = trace.clone();
    vorpal.command("hang").cancellable_action(move |_, _| {
        let trace = canceller_trace.clone();
        (
            std::future::pending::<anyhow::Result<()>>(),
            move |_: &CommandInstance| trace.push("canceller"),
        )
    });
    let t = trace.clone();
    vorpal.find("hang").unwrap().cancel(move |_| t.push("hang"));

    let t = trace.clone();
    vorpal
        .command("tail")
        .action(|_, _| async { Ok::<_, anyhow::Error>(()) })
        .cancel(move |_| t.push("tail"));

    vorpal
        .command("ping")
        .action(|_, _| async { Ok::<_, anyhow::Error>("pong") });
}

async fn cancel_when_running(vorpal: &Vorpal) {
    while !vorpal.cancel() {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cancel_walks_the_chain_then_runs_the_canceller() {
    let (shell, _dir) = common::shell();
    let trace = common::Trace::default();
    register_hang(&shell.vorpal, &trace);
    let mut events = shell.vorpal.subscribe();

    let vorpal = shell.vorpal.clone();
    let running = tokio::spawn(async move { vorpal.exec("hang | tail").await });
    cancel_when_running(&shell.vorpal).await;

    let result = running.await.unwrap().unwrap();
    assert_eq!(result, Value::Null);
    assert_eq!(trace.entries(), vec!["hang", "tail", "canceller"]);

    let mut cancelled = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let VorpalEvent::ClientCommandCancelled { command } = event {
            cancelled.push(command);
        }
    }
    assert_eq!(cancelled, vec!["hang"]);
}

#[tokio::test]
async fn test_queue_continues_after_cancel() {
    let (shell, _dir) = common::shell();
    let trace = common::Trace::default();
    register_hang(&shell.vorpal, &trace);

    let vorpal = shell.vorpal.clone();
    let running = tokio::spawn(async move { vorpal.exec("hang").await });
    cancel_when_running(&shell.vorpal).await;
    running.await.unwrap().unwrap();

    assert!(!shell.vorpal.cancel());
    assert_eq!(shell.vorpal.session().command_counts(), (0, 0));
    assert_eq!(shell.vorpal.exec("ping").await.unwrap(), json!("pong"));
}

#[tokio::test]
async fn test_action_can_cancel_its_own_set() {
    let (shell, _dir) = common::shell();
    let trace = common::Trace::default();

    let t = trace.clone();
    shell
        .vorpal
        .command("quitter")
        .action(|ctx, _| async move {
            ctx.cancel();
            std::future::pending::<()>().await;
            Ok::<_, anyhow::Error>(())
        })
        .cancel(move |instance| t.push(instance.command()));

    let result = shell.vorpal.exec("quitter").await.unwrap();
    assert_eq!(result, Value::Null);
    assert_eq!(trace.entries(), vec!["quitter"]);
}

#[tokio::test]
async fn test_cancel_with_nothing_running_is_a_no_op() {
    let (shell, _dir) = common::shell();
    assert!(!shell.vorpal.cancel());
    assert!(!shell.vorpal.session().cancel_commands());
}
