//! Integration tests for matching, binding, validation and error delivery.

mod common;

use anyhow::{anyhow, bail};
use serde_json::{Value, json};

use vorpal::application::{CommandError, VorpalEvent};
use vorpal::{ArgOverrides, ExecOptions, Vorpal, VorpalError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn register_foo(vorpal: &Vorpal) {
    vorpal
        .command("foo [args...]")
        .option("-b, --bool", "a boolean flag")
        .option("-r, --required <str>", "needs a value")
        .option("-o, --optional [str]", "may take a value")
        .action(|_, args| async move { Ok::<_, anyhow::Error>(args) });
}

fn echo_args(vorpal: &Vorpal, registration: &str) {
    vorpal
        .command(registration)
        .action(|_, args| async move { Ok::<_, anyhow::Error>(args) });
}

fn sync(vorpal: &Vorpal, command: &str) -> Value {
    vorpal
        .exec_sync(command, ExecOptions::default())
        .expect("non-fatal exec_sync should not fail")
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

#[test]
fn test_boolean_flag_and_variadic_args() {
    let (shell, _dir) = common::shell();
    register_foo(&shell.vorpal);

    let result = sync(&shell.vorpal, "foo -b bar smith");
    assert_eq!(result["options"], json!({"bool": true}));
    assert_eq!(result["args"], json!(["bar", "smith"]));
    assert_eq!(result["rawCommand"], json!("foo -b bar smith"));
}

#[test]
fn test_required_option_without_value_is_reported_as_data() {
    let (shell, _dir) = common::shell();
    register_foo(&shell.vorpal);

    let result = sync(&shell.vorpal, "foo -r");
    let message = "\n  Missing required value for option --required. Showing Help:";
    assert_eq!(result, json!(message));

    let lines = shell.output.lines();
    assert_eq!(lines[0], message);
    assert!(lines[1].contains("Usage: foo [options] [args...]"));
}

#[test]
fn test_missing_required_argument() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "required <str>");

    let result = sync(&shell.vorpal, "required");
    assert_eq!(result, json!("\n  Missing required argument. Showing Help:"));

    let result = sync(&shell.vorpal, "required hello");
    assert_eq!(result["str"], json!("hello"));
}

#[test]
fn test_required_optional_and_variadic_binding() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "multiple <req> [opt] [variadic...]");

    let result = sync(&shell.vorpal, "multiple foo bar joe smith");
    assert_eq!(result["req"], json!("foo"));
    assert_eq!(result["opt"], json!("bar"));
    assert_eq!(result["variadic"], json!(["joe", "smith"]));
    assert_eq!(result["options"], json!({}));
}

#[test]
fn test_registration_order_binds_identically() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "ordered <req> [opt] [variadic...]");
    echo_args(&shell.vorpal, "shuffled [opt] <req> [variadic...]");

    let a = sync(&shell.vorpal, "ordered foo bar joe smith");
    let b = sync(&shell.vorpal, "shuffled foo bar joe smith");
    for key in ["req", "opt", "variadic", "options"] {
        assert_eq!(a[key], b[key], "field `{key}` differs");
    }
}

#[test]
fn test_unknown_option_is_rejected_with_help() {
    let (shell, _dir) = common::shell();
    register_foo(&shell.vorpal);

    let result = sync(&shell.vorpal, "foo --nope");
    assert_eq!(result, json!("\n  Invalid option: 'nope'. Showing Help:"));
}

#[test]
fn test_quoted_pipe_stays_in_one_argument() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "say <text>");

    for quoted in [r#"say "(vorpal|vorpal)""#, "say '(vorpal|vorpal)'", "say `(vorpal|vorpal)`"] {
        let result = sync(&shell.vorpal, quoted);
        assert_eq!(result["text"], json!("(vorpal|vorpal)"), "input: {quoted}");
    }
}

#[tokio::test]
async fn test_programmatic_overrides_win() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "required <str>");

    let options = ExecOptions {
        args: ArgOverrides::default().value("str", "given").option("force", true),
        ..ExecOptions::default()
    };
    let result = shell
        .vorpal
        .exec_with("required typed", options)
        .await
        .expect("should run");
    assert_eq!(result["str"], json!("given"));
    assert_eq!(result["options"]["force"], json!(true));
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[test]
fn test_longest_registered_name_wins() {
    let (shell, _dir) = common::shell();
    shell
        .vorpal
        .command("do")
        .action(|_, _| async { Ok::<_, anyhow::Error>("do") });
    shell
        .vorpal
        .command("do things [rest...]")
        .action(|_, _| async { Ok::<_, anyhow::Error>("do things") });

    assert_eq!(sync(&shell.vorpal, "do things now"), json!("do things"));
    assert_eq!(sync(&shell.vorpal, "do"), json!("do"));
}

#[test]
fn test_unknown_command_reports_invalid_command() {
    let (shell, _dir) = common::shell();
    let result = sync(&shell.vorpal, "nope");
    assert_eq!(result, json!("Invalid command."));
    assert!(shell.output.contents().contains("help"));
}

#[test]
fn test_catch_all_is_suppressed_for_command_groups() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "do things");
    echo_args(&shell.vorpal, "do things well");
    shell
        .vorpal
        .catch_all("[words...]")
        .action(|_, args| async move { Ok::<_, anyhow::Error>(args) });

    assert_eq!(sync(&shell.vorpal, "do"), json!("Invalid command."));

    let result = sync(&shell.vorpal, "dance now");
    assert_eq!(result["words"], json!(["dance", "now"]));
}

#[test]
fn test_aliases_resolve_and_collide() {
    let (shell, _dir) = common::shell();
    shell
        .vorpal
        .command("list all")
        .action(|_, _| async { Ok::<_, anyhow::Error>("listed") })
        .alias(&["ls"])
        .expect("alias should be free");

    assert_eq!(sync(&shell.vorpal, "ls"), json!("listed"));

    let err = shell
        .vorpal
        .command("lsx")
        .alias(&["ls"])
        .err()
        .expect("duplicate alias must fail");
    assert_eq!(
        err.to_string(),
        r#"Duplicate alias "ls" for command "lsx" detected. Was first reserved by command "list all"."#
    );
}

#[test]
fn test_parse_hook_rewrites_the_command() {
    let (shell, _dir) = common::shell();
    echo_args(&shell.vorpal, "say <text>");
    shell
        .vorpal
        .command("shout [text...]")
        .parse(|_, args| format!("say {}", args.to_uppercase()));

    let result = sync(&shell.vorpal, "shout hello");
    assert_eq!(result["text"], json!("HELLO"));
    assert_eq!(result["rawCommand"], json!("say HELLO"));
}

#[test]
fn test_init_on_plain_command_is_a_usage_error() {
    let (shell, _dir) = common::shell();
    let err = shell
        .vorpal
        .command("plain")
        .init(|_, _| async { Ok::<_, anyhow::Error>(()) })
        .err()
        .expect("init outside a mode must fail");
    assert!(matches!(err, VorpalError::InitOnNonMode(name) if name == "plain"));
}

// ---------------------------------------------------------------------------
// Help
// ---------------------------------------------------------------------------

#[test]
fn test_help_flag_prints_command_help() {
    let (shell, _dir) = common::shell();
    register_foo(&shell.vorpal);

    assert_eq!(sync(&shell.vorpal, "foo --help"), Value::Null);
    let contents = shell.output.contents();
    assert!(contents.contains("Usage: foo [options] [args...]"));
    assert!(contents.contains("--required <str>"));
}

#[test]
fn test_custom_help_hook_replaces_default_help() {
    let (shell, _dir) = common::shell();
    shell
        .vorpal
        .command("bar")
        .help(|name| format!("custom help for {name}"));

    sync(&shell.vorpal, "bar /?");
    sync(&shell.vorpal, "help bar");
    assert_eq!(
        shell.output.lines(),
        vec!["custom help for bar", "custom help for bar"]
    );
}

// ---------------------------------------------------------------------------
// Validation and action errors
// ---------------------------------------------------------------------------

fn register_check(vorpal: &Vorpal) {
    vorpal
        .command("check <value>")
        .validate(|_, args| {
            let value = args.text("value").unwrap_or_default();
            if value != "ok" {
                bail!("bad input: {value}");
            }
            Ok(())
        })
        .action(|_, _| async { Ok::<_, anyhow::Error>("checked") });
}

#[test]
fn test_validation_error_is_returned_as_data_unless_fatal() {
    let (shell, _dir) = common::shell();
    register_check(&shell.vorpal);

    assert_eq!(sync(&shell.vorpal, "check ok"), json!("checked"));
    assert_eq!(sync(&shell.vorpal, "check no"), json!("bad input: no"));
    assert!(shell.output.lines().contains(&"bad input: no".to_string()));

    let fatal = ExecOptions {
        fatal: true,
        ..ExecOptions::default()
    };
    let err = shell
        .vorpal
        .exec_sync("check no", fatal)
        .expect_err("fatal exec_sync should fail");
    assert!(matches!(
        err,
        VorpalError::Command(CommandError::Validation(ref msg)) if msg == "bad input: no"
    ));

    shell.vorpal.fatal(true);
    assert!(shell.vorpal.exec_sync("check no", ExecOptions::default()).is_err());
}

#[tokio::test]
async fn test_action_error_is_logged_and_returned() {
    let (shell, _dir) = common::shell();
    let mut events = shell.vorpal.subscribe();
    shell
        .vorpal
        .command("boom")
        .action(|_, _| async { Err::<(), _>(anyhow!("kaboom")) });

    let err = shell.vorpal.exec("boom").await.expect_err("action failed");
    assert_eq!(err.to_string(), "kaboom");
    assert!(shell.output.lines().contains(&"kaboom".to_string()));

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if let VorpalEvent::ClientCommandError { command, error } = event {
            assert_eq!(command, "boom");
            assert_eq!(error, "kaboom");
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn test_command_without_action_completes_empty() {
    let (shell, _dir) = common::shell();
    shell.vorpal.command("noop");
    assert_eq!(shell.vorpal.exec("noop").await.unwrap(), Value::Null);
}
