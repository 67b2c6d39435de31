//! 명령 원문을 (루트 구간, 매칭된 명령, 파이프 구간들)로 해석한다.

use std::sync::Arc;

use super::command::Command;
use crate::domain::parser::{match_command, split_pipes};
use crate::domain::spec::CommandSpec;

#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    /// 루트 구간 원문. parse 훅이 다시 쓴 경우 그 결과.
    pub command: String,
    pub matched: Option<Arc<Command>>,
    /// 명령 이름 뒤에 남은 인자 문자열.
    pub match_args: String,
    pub pipes: Vec<String>,
}

/// 파이프를 나누고 루트 구간을 매칭한다. 매칭된 명령에 parse 훅이 있으면
/// 다시 쓴 원문으로 한 번만 더 나누고 매칭한다.
pub(crate) fn resolve_command(line: &str, commands: &[Arc<Command>]) -> Resolved {
    let mut pipes = Vec::new();
    let command = take_root(line, &mut pipes);
    let (matched, match_args) = lookup(&command, commands);

    let Some(parse) = matched.as_ref().and_then(|c| c.hooks.parse.clone()) else {
        return Resolved {
            command,
            matched,
            match_args,
            pipes,
        };
    };

    let rewritten = parse(&command, &match_args);
    let command = take_root(&rewritten, &mut pipes);
    let (matched, match_args) = lookup(&command, commands);
    Resolved {
        command,
        matched,
        match_args,
        pipes,
    }
}

fn take_root(line: &str, pipes: &mut Vec<String>) -> String {
    let mut segments = split_pipes(line).into_iter();
    let root = segments.next().unwrap_or_default();
    pipes.extend(segments);
    root
}

fn lookup(command: &str, commands: &[Arc<Command>]) -> (Option<Arc<Command>>, String) {
    let specs: Vec<&CommandSpec> = commands.iter().map(|c| &c.spec).collect();
    match match_command(command, specs) {
        Some(found) => (commands.get(found.index).cloned(), found.args),
        None => (None, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(names: &[&str]) -> Vec<Arc<Command>> {
        names
            .iter()
            .map(|n| Arc::new(Command::new(CommandSpec::parse(n))))
            .collect()
    }

    #[test]
    fn splits_root_from_pipes() {
        let cmds = commands(&["say <words...>", "reverse"]);
        let resolved = resolve_command("say cheese | reverse", &cmds);
        assert_eq!(resolved.command, "say cheese");
        assert_eq!(resolved.matched.unwrap().name(), "say");
        assert_eq!(resolved.match_args, "cheese");
        assert_eq!(resolved.pipes, vec!["reverse"]);
    }

    #[test]
    fn parse_hook_rewrites_once() {
        let mut cmds = commands(&["alpha", "beta [x]"]);
        let mut alpha = Command::new(CommandSpec::parse("alpha"));
        alpha.hooks.parse = Some(Arc::new(|_: &str, args: &str| format!("beta {args} | alpha")));
        cmds[0] = Arc::new(alpha);

        let resolved = resolve_command("alpha one | gamma", &cmds);
        assert_eq!(resolved.command, "beta one");
        assert_eq!(resolved.matched.unwrap().name(), "beta");
        assert_eq!(resolved.pipes, vec!["gamma", "alpha"]);
    }

    #[test]
    fn unmatched_root_has_no_command() {
        let resolved = resolve_command("nothing here", &commands(&["a"]));
        assert!(resolved.matched.is_none());
        assert_eq!(resolved.command, "nothing here");
    }
}
