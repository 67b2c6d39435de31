//! 입력 줄을 파이프 구간으로 나누고 등록된 명령 이름과 매칭한다.

use super::spec::CommandSpec;

const PIPE_QUOTES: [char; 3] = ['"', '\'', '`'];

/// 따옴표 안의 `|`는 구분자로 보지 않고 줄을 파이프 구간으로 나눈다.
/// 닫히지 않은 따옴표는 남은 줄 전체를 마지막 구간으로 흡수한다.
pub fn split_pipes(line: &str) -> Vec<String> {
    let naive: Vec<&str> = line.trim().split('|').collect();
    let mut open = [false; 3];
    let mut segments = Vec::new();
    let mut current = String::new();

    for (idx, piece) in naive.iter().enumerate() {
        current.push_str(piece);
        for ch in piece.chars() {
            if let Some(slot) = PIPE_QUOTES.iter().position(|q| *q == ch) {
                open[slot] = !open[slot];
            }
        }

        let in_quote = open.iter().any(|o| *o);
        if !in_quote || idx == naive.len() - 1 {
            segments.push(current.trim().to_string());
            current.clear();
        } else {
            current.push('|');
        }
    }

    segments
}

/// 매칭 결과. `index`는 넘겨받은 명세 목록에서의 위치다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    pub index: usize,
    /// 명령 이름 뒤에 남은 인자 문자열.
    pub args: String,
}

/// 단어 단위 최장 일치로 명령을 찾는다. 같은 길이에서는 이름이 별칭보다 우선한다.
/// 일치하는 명령이 없으면 캐치올을 쓰되, 입력이 어떤 여러 단어 명령 이름의
/// 진짜 접두어(단어 단위)라면 매칭하지 않는다.
pub fn match_command<'a, I>(input: &str, specs: I) -> Option<CommandMatch>
where
    I: IntoIterator<Item = &'a CommandSpec>,
{
    let specs: Vec<&CommandSpec> = specs.into_iter().collect();
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split(' ').collect();

    for take in (1..=parts.len()).rev() {
        let candidate = parts[..take].join(" ");
        let candidate = candidate.trim();

        let by_name = specs.iter().position(|spec| spec.name == candidate);
        let by_alias = || specs.iter().rposition(|spec| spec.has_alias(candidate));
        if let Some(index) = by_name.or_else(by_alias) {
            return Some(CommandMatch {
                index,
                args: parts[take..].join(" "),
            });
        }
    }

    let catch_all = specs.iter().position(|spec| spec.is_catch_all())?;
    if is_group_prefix(&parts, &specs) {
        return None;
    }

    Some(CommandMatch {
        index: catch_all,
        args: input.to_string(),
    })
}

/// 입력 단어들이 어떤 명령 이름의 앞부분 단어들과 모두 같고, 그 이름이 더 긴지 확인한다.
fn is_group_prefix(words: &[&str], specs: &[&CommandSpec]) -> bool {
    if words.iter().all(|w| w.is_empty()) {
        return false;
    }
    specs.iter().any(|spec| {
        let name_words: Vec<&str> = spec.name.trim().split(' ').collect();
        name_words.len() > words.len() && name_words[..words.len()] == *words
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec::CommandKind;

    fn specs(names: &[&str]) -> Vec<CommandSpec> {
        names.iter().map(|name| CommandSpec::parse(name)).collect()
    }

    #[test]
    fn quoted_pipes_are_not_separators() {
        assert_eq!(split_pipes(r#"say "(vorpal|vorpal)""#), vec![r#"say "(vorpal|vorpal)""#]);
        assert_eq!(split_pipes("say '(vorpal|vorpal)'"), vec!["say '(vorpal|vorpal)'"]);
        assert_eq!(split_pipes("say `(vorpal|vorpal)`"), vec!["say `(vorpal|vorpal)`"]);
    }

    #[test]
    fn splits_real_pipes_and_trims() {
        assert_eq!(
            split_pipes("say cheese | reverse |upper"),
            vec!["say cheese", "reverse", "upper"]
        );
    }

    #[test]
    fn unbalanced_quote_absorbs_the_rest() {
        assert_eq!(split_pipes(r#"say "a|b | c"#), vec![r#"say "a|b | c"#]);
    }

    #[test]
    fn prefers_the_longest_registered_name() {
        let registered = specs(&["do", "do things", "do things well"]);
        let found = match_command("do things well now", &registered).unwrap();
        assert_eq!(registered[found.index].name, "do things well");
        assert_eq!(found.args, "now");

        let found = match_command("do things quickly", &registered).unwrap();
        assert_eq!(registered[found.index].name, "do things");
        assert_eq!(found.args, "quickly");
    }

    #[test]
    fn longest_match_does_not_depend_on_registration_order() {
        let registered = specs(&["foo bar", "foo"]);
        let found = match_command("foo bar baz", &registered).unwrap();
        assert_eq!(found.index, 0);
        let registered = specs(&["foo", "foo bar"]);
        let found = match_command("foo bar baz", &registered).unwrap();
        assert_eq!(found.index, 1);
    }

    #[test]
    fn matches_aliases() {
        let mut registered = specs(&["list all"]);
        registered[0].aliases.push("ls".into());
        let found = match_command("ls -a", &registered).unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.args, "-a");
    }

    #[test]
    fn catch_all_is_suppressed_for_group_prefixes() {
        let mut registered = specs(&["do things", "do things well", "anything"]);
        registered[2].kind = CommandKind::CatchAll;

        assert_eq!(match_command("do", &registered), None);

        let found = match_command("dance now", &registered).unwrap();
        assert_eq!(found.index, 2);
        assert_eq!(found.args, "dance now");
    }

    #[test]
    fn no_match_without_catch_all() {
        let registered = specs(&["foo"]);
        assert_eq!(match_command("bar", &registered), None);
    }
}
