//! 모든 셸에 기본으로 등록되는 `help`, `exit` 명령.

use super::error::VorpalError;
use super::events::VorpalEvent;
use super::vorpal::Vorpal;
use crate::domain::help::help_information;

pub(crate) fn register(vorpal: &Vorpal) -> Result<(), VorpalError> {
    vorpal
        .command("help [command...]")
        .description("Provides help for a given command.")
        .action(|ctx, args| async move {
            let session = ctx.session();
            let Some(words) = args.list("command") else {
                session.help("");
                return Ok(());
            };

            let name = words.join(" ");
            let found = session.shell().registry.find(name.trim());
            match found {
                Some(command) if !command.spec.hidden => match &command.hooks.help {
                    Some(help) => ctx.log(help(&name)),
                    None => ctx.log(help_information(&command.spec)),
                },
                _ => session.help(&name),
            }
            Ok::<_, anyhow::Error>(())
        });

    vorpal
        .command("exit")
        .description("Exits application.")
        .action(|ctx, _args| async move {
            let session = ctx.session();
            session.request_exit();
            session.shell().emit(VorpalEvent::Exit);
            Ok::<_, anyhow::Error>(())
        })
        .alias(&["quit"])?;

    Ok(())
}
