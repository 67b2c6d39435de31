//! 바이너리에 기본으로 실리는 예제 명령들.
//! 파이프, 취소, 모드, 캐치올을 손으로 확인해 볼 수 있다.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;
use tracing::debug;

use crate::application::{CommandInstance, Vorpal};
use crate::domain::value::CommandArgs;

const COLORS: &[&str] = &["red", "green", "blue", "yellow"];

/// 예제 명령을 셸에 등록한다.
pub fn register(vorpal: &Vorpal) -> Result<()> {
    vorpal
        .command("say <words...>")
        .description("Prints the given words.")
        .option_with_autocomplete("-c, --color <name>", "Tag the line with a color.", COLORS)
        .autocomplete(&["hello", "world"])
        .action(|ctx, args| async move {
            let mut line = args.list("words").unwrap_or_default().join(" ");
            if let Some(color) = args.option("color").and_then(|v| v.as_str()) {
                line = format!("[{color}] {line}");
            }
            ctx.log(&line);
            Ok::<_, anyhow::Error>(line)
        });

    vorpal
        .command("reverse [text...]")
        .description("Reverses text or piped input.")
        .action(|ctx, args| async move {
            let reversed: String = input_text(&args).chars().rev().collect();
            ctx.log(&reversed);
            Ok::<_, anyhow::Error>(reversed)
        });

    vorpal
        .command("upper [text...]")
        .description("Uppercases text or piped input.")
        .action(|ctx, args| async move {
            let upper = input_text(&args).to_uppercase();
            ctx.log(&upper);
            Ok::<_, anyhow::Error>(upper)
        });

    vorpal
        .command("sleep <ms>")
        .description("Waits for the given milliseconds. Ctrl+C cancels.")
        .validate(|_, args| {
            parse_millis(args)?;
            Ok(())
        })
        .cancellable_action(|ctx: Arc<CommandInstance>, args: CommandArgs| {
            let wake = Arc::new(Notify::new());
            let waiter = Arc::clone(&wake);
            let future = async move {
                let ms = parse_millis(&args)?;
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(ms)) => {
                        ctx.log(format!("slept {ms}ms"));
                    }
                    _ = waiter.notified() => debug!(ms, "sleep interrupted"),
                }
                Ok::<_, anyhow::Error>(ms)
            };
            let canceller = move |_: &CommandInstance| wake.notify_one();
            (future, canceller)
        })
        .cancel(|ctx| ctx.log("sleep cancelled"));

    vorpal
        .mode("calc")
        .description("Adds up whitespace separated numbers until `exit`.")
        .delimiter("calc:")
        .init(|ctx, _args| async move {
            ctx.log("Entering calc mode. Type `exit` to leave.");
            Ok::<_, anyhow::Error>(())
        })?
        .action(|ctx, args| async move {
            let line = args.mode_input.clone().unwrap_or_default();
            let mut total = 0i64;
            for word in line.split_whitespace() {
                total += word
                    .parse::<i64>()
                    .with_context(|| format!("`{word}` is not a number"))?;
            }
            ctx.log(total.to_string());
            Ok::<_, anyhow::Error>(total)
        });

    vorpal
        .catch_all("[words...]")
        .action(|ctx, args| async move {
            let words = args.list("words").unwrap_or_default().join(" ");
            ctx.log(format!("`{words}` is not a command. Type `help` to list commands."));
            Ok::<_, anyhow::Error>(())
        });

    Ok(())
}

/// 파이프 입력이 있으면 그것을, 없으면 인자를 쓴다.
fn input_text(args: &CommandArgs) -> String {
    match &args.stdin {
        Some(lines) => lines.join(" "),
        None => args.list("text").unwrap_or_default().join(" "),
    }
}

fn parse_millis(args: &CommandArgs) -> Result<u64> {
    let raw = args.text("ms").unwrap_or_default();
    raw.parse()
        .with_context(|| format!("`{raw}` is not a number of milliseconds"))
}
