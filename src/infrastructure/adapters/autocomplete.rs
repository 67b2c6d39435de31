//! 접두어 기반 탭 자동완성 어댑터.
//!
//! 입력의 마지막 파이프 구간만 본다. 명령 이름을 먼저 완성하고, 명령이
//! 확정되면 옵션 이름, 옵션 값, 명령 인자 후보 순으로 완성한다.
//! 커서는 항상 줄 끝에 있다고 가정한다.

use crate::application::ports::{Autocompleter, Completion};
use crate::domain::spec::CommandSpec;

#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixAutocompleter;

impl PrefixAutocompleter {
    pub fn new() -> Self {
        Self
    }
}

impl Autocompleter for PrefixAutocompleter {
    fn complete(&self, line: &str, commands: &[&CommandSpec]) -> Option<Completion> {
        let mut input = LineInput::parse(line);
        let names = command_names(commands);

        if let Some(found) = match_context(&input.context, &names, true) {
            return Some(input.assemble(found));
        }

        let Some(spec) = input.attach_command(&names, commands) else {
            return Some(Completion::Candidates(filter_data(&input.context, &names)));
        };

        input.split_last_word();
        let data = match_data(&input, spec);
        match match_context(&input.context, &data, false) {
            Some(found) => Some(input.assemble(found)),
            None => Some(Completion::Candidates(filter_data(&input.context, &data))),
        }
    }

    fn match_candidates(&self, partial: &str, candidates: &[String]) -> Option<Completion> {
        match_word(partial, candidates, false)
    }
}

/// 완성 대상 구간과 그 앞부분.
#[derive(Debug, Default)]
struct LineInput {
    prefix: String,
    context: String,
    /// 직전 단어가 옵션 플래그이면 그 플래그.
    option: Option<String>,
}

impl LineInput {
    fn parse(line: &str) -> Self {
        let sections: Vec<&str> = line.split('|').collect();
        let last = sections.len() - 1;
        let mut prefix = sections[..last].join("|");
        if last > 0 {
            prefix.push('|');
        }
        Self {
            prefix,
            context: sections[last].to_string(),
            option: None,
        }
    }

    fn assemble(&self, found: Completion) -> Completion {
        match found {
            Completion::Line(context) => Completion::Line(format!("{}{context}", self.prefix)),
            candidates => candidates,
        }
    }

    /// 구간 앞부분의 명령 이름(또는 별칭, 캐치올)을 찾아 prefix로 옮긴다.
    fn attach_command<'a>(
        &mut self,
        names: &[String],
        commands: &[&'a CommandSpec],
    ) -> Option<&'a CommandSpec> {
        let trimmed = self.context.trim_start();
        let indent = " ".repeat(self.context.len() - trimmed.len());

        let matched = names
            .iter()
            .filter(|name| {
                !name.trim().is_empty()
                    && trimmed.starts_with(name.as_str())
                    && trimmed[name.len()..].starts_with(' ')
            })
            .max_by_key(|name| name.len());

        if let Some(name) = matched {
            let name = name.trim();
            let spec = commands
                .iter()
                .find(|c| c.name == name)
                .or_else(|| commands.iter().find(|c| c.has_alias(name)))
                .copied();
            if let Some(spec) = spec {
                let rest = trimmed[name.len()..].to_string();
                self.prefix.push_str(&indent);
                self.prefix.push_str(name);
                self.context = rest;
                return Some(spec);
            }
        }

        let catch_all = commands.iter().find(|c| c.is_catch_all()).copied()?;
        Some(catch_all)
    }

    /// 마지막 단어만 완성 대상으로 남긴다.
    fn split_last_word(&mut self) {
        let mut parts: Vec<&str> = self.context.split(' ').collect();
        let last = parts.pop().unwrap_or_default().to_string();
        let before = parts.last().map(|p| p.trim()).unwrap_or_default();
        if before.starts_with('-') {
            self.option = Some(before.to_string());
        }
        self.prefix.push_str(&parts.join(" "));
        self.prefix.push(' ');
        self.context = last;
    }
}

/// 보이는 명령의 이름과 별칭(정렬됨). 캐치올은 이름이 없으므로 뺀다.
fn command_names(commands: &[&CommandSpec]) -> Vec<String> {
    let mut names: Vec<String> = commands
        .iter()
        .filter(|c| !c.hidden && !c.is_catch_all())
        .flat_map(|c| std::iter::once(c.name.clone()).chain(c.aliases.iter().cloned()))
        .collect();
    names.sort();
    names
}

/// 매칭된 명령에서 완성 후보 목록을 고른다.
fn match_data(input: &LineInput, spec: &CommandSpec) -> Vec<String> {
    let mid_option = input.context.trim().starts_with('-');
    if mid_option && !spec.allow_unknown_options {
        return spec
            .options
            .iter()
            .filter_map(|o| o.long.clone().or_else(|| o.short.clone()))
            .collect();
    }

    if let Some(flag) = &input.option {
        let option = spec
            .options
            .iter()
            .find(|o| o.long.as_deref() == Some(flag))
            .or_else(|| spec.options.iter().find(|o| o.short.as_deref() == Some(flag)));
        if let Some(option) = option {
            return option.autocomplete.clone();
        }
    }

    spec.autocomplete.clone()
}

/// 앞 공백을 뺀 뒤 완성하고, 한 줄로 완성되면 공백을 되돌린다.
fn match_context(context: &str, data: &[String], ignore_slashes: bool) -> Option<Completion> {
    let trimmed = context.trim_start();
    let indent = &context[..context.len() - trimmed.len()];
    match match_word(trimmed, data, ignore_slashes)? {
        Completion::Line(word) => Some(Completion::Line(format!("{indent}{word}"))),
        candidates => Some(candidates),
    }
}

/// 후보 목록에서 `text`로 시작하는 항목을 찾는다.
/// 하나면 공백을 붙여 완성하고, 여럿이면 공통 접두어까지 늘리거나 목록을 돌려준다.
fn match_word(text: &str, candidates: &[String], ignore_slashes: bool) -> Option<Completion> {
    let mut sorted = candidates.to_vec();
    sorted.sort();

    let (prefix, word) = if ignore_slashes {
        (String::new(), text)
    } else {
        match text.rsplit_once('/') {
            Some((dir, word)) => (format!("{dir}/"), word),
            None => (String::new(), text),
        }
    };

    let matches: Vec<String> = sorted.into_iter().filter(|c| c.starts_with(word)).collect();
    match matches.as_slice() {
        [] => None,
        [only] => {
            let space = if only.ends_with('/') { "" } else { " " };
            Some(Completion::Line(format!("{prefix}{only}{space}")))
        }
        _ if word.is_empty() => Some(Completion::Candidates(matches)),
        [first, rest @ ..] => {
            let common = rest
                .iter()
                .fold(first.len(), |len, item| common_prefix_len(&first[..len], item));
            if common == word.len() {
                Some(Completion::Candidates(matches))
            } else {
                Some(Completion::Line(format!("{prefix}{}", &first[..common])))
            }
        }
    }
}

/// 두 문자열의 공통 접두어 바이트 길이(문자 경계 기준).
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// 후보 중 `context`로 시작하는 것만 남기고, 여러 단어 후보는 이미 입력한 단어를 뺀다.
fn filter_data(context: &str, data: &[String]) -> Vec<String> {
    let ctx = context.trim();
    let ctx = ctx.rsplit('/').next().unwrap_or(ctx);
    let typed_words = ctx.trim().split(' ').count();

    data.iter()
        .filter(|item| item.starts_with(ctx))
        .map(|item| {
            let parts: Vec<&str> = item.trim().split(' ').collect();
            if parts.len() > 1 {
                parts.iter().skip(typed_words).copied().collect::<Vec<_>>().join(" ")
            } else {
                item.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::option::CommandOption;

    fn specs() -> Vec<CommandSpec> {
        let mut say = CommandSpec::parse("say <words...>");
        say.autocomplete = vec!["hello".into(), "help".into(), "world".into()];
        let mut opt = CommandOption::new("-c, --color <name>", "text color");
        opt.autocomplete = vec!["red".into(), "green".into()];
        say.options.push(opt);
        say.options.push(CommandOption::new("-l, --loud", "shout"));

        vec![
            say,
            CommandSpec::parse("sleep <ms>"),
            CommandSpec::parse("status"),
            CommandSpec::parse("do things"),
            CommandSpec::parse("do stuff"),
        ]
    }

    fn complete(line: &str) -> Option<Completion> {
        let owned = specs();
        let refs: Vec<&CommandSpec> = owned.iter().collect();
        PrefixAutocompleter.complete(line, &refs)
    }

    fn line(text: &str) -> Option<Completion> {
        Some(Completion::Line(text.to_string()))
    }

    fn candidates(items: &[&str]) -> Option<Completion> {
        Some(Completion::Candidates(items.iter().map(|s| s.to_string()).collect()))
    }

    #[test]
    fn completes_a_unique_command_name() {
        assert_eq!(complete("sa"), line("say "));
        assert_eq!(complete("st"), line("status "));
    }

    #[test]
    fn extends_to_the_common_prefix_or_lists() {
        assert_eq!(complete("s"), candidates(&["say", "sleep", "status"]));
        assert_eq!(complete("sl"), line("sleep "));
        assert_eq!(complete("do"), line("do "));
    }

    #[test]
    fn lists_commands_when_empty() {
        assert_eq!(
            complete(""),
            candidates(&["do stuff", "do things", "say", "sleep", "status"])
        );
    }

    #[test]
    fn completes_command_arguments() {
        assert_eq!(complete("say wo"), line("say world "));
        assert_eq!(complete("say hel"), candidates(&["hello", "help"]));
    }

    #[test]
    fn lists_options_after_a_dash() {
        assert_eq!(complete("say -"), line("say --"));
        assert_eq!(complete("say --"), candidates(&["--color", "--loud"]));
        assert_eq!(complete("say --lo"), line("say --loud "));
    }

    #[test]
    fn completes_option_values() {
        assert_eq!(complete("say --color gr"), line("say --color green "));
    }

    #[test]
    fn only_the_last_pipe_section_is_completed() {
        assert_eq!(complete("say hi | sl"), line("say hi | sleep "));
    }

    #[test]
    fn match_candidates_handles_paths() {
        let files = vec!["src/".to_string(), "Cargo.toml".to_string()];
        assert_eq!(
            PrefixAutocompleter.match_candidates("./sr", &files),
            Some(Completion::Line("./src/".into()))
        );
    }
}
