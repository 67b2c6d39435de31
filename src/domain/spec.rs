//! 등록된 명령의 정적 명세. 실행 훅은 application 계층의 `Command`가 갖는다.

use serde::Serialize;

use super::arg::{ArgSpec, append_expected_args, split_registration};
use super::option::CommandOption;
use super::tokenizer::FlagTypes;

/// 명령 종류. 모드와 캐치올은 매칭/실행 경로가 다르다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[default]
    Plain,
    Mode,
    CatchAll,
}

/// 이름, 인자, 옵션과 표시 관련 플래그를 모은 명령 명세.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// 공백으로 구분된 전체 이름(`"do things well"`).
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub args: Vec<ArgSpec>,
    pub options: Vec<CommandOption>,
    pub kind: CommandKind,
    pub hidden: bool,
    pub no_help: bool,
    pub allow_unknown_options: bool,
    pub relay: bool,
    /// 모드 진입 후 표시할 프롬프트.
    pub mode_delimiter: Option<String>,
    /// 도움말 usage 줄을 대신할 문자열.
    pub usage_override: Option<String>,
    /// 명령 인자 자동완성 후보.
    pub autocomplete: Vec<String>,
    #[serde(skip)]
    pub types: FlagTypes,
}

impl CommandSpec {
    /// `"name <req> [opt...]"` 형태의 등록 문자열로 명세를 만든다.
    pub fn parse(registration: &str) -> Self {
        let (name, tokens) = split_registration(registration);
        let mut spec = Self {
            name,
            ..Self::default()
        };
        append_expected_args(&mut spec.args, tokens.iter().map(String::as_str));
        spec
    }

    /// 공백으로 구분된 인자 토큰을 추가한다. 정렬 규칙은 매번 다시 적용된다.
    pub fn add_arguments(&mut self, desc: &str) {
        append_expected_args(&mut self.args, desc.split(' ').filter(|t| !t.is_empty()));
    }

    pub fn is_mode(&self) -> bool {
        self.kind == CommandKind::Mode
    }

    pub fn is_catch_all(&self) -> bool {
        self.kind == CommandKind::CatchAll
    }

    /// 이 명령이 이름 또는 별칭으로 `candidate`와 정확히 일치하는지 확인한다.
    pub fn answers_to(&self, candidate: &str) -> bool {
        self.name == candidate || self.aliases.iter().any(|alias| alias == candidate)
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }

    pub fn word_count(&self) -> usize {
        self.name.trim().split(' ').count()
    }

    /// 도움말 usage 줄의 인자 부분.
    pub fn usage(&self) -> String {
        if let Some(usage) = &self.usage_override {
            return usage.clone();
        }
        let mut usage = String::from("[options]");
        for arg in &self.args {
            usage.push(' ');
            usage.push_str(&arg.human_readable());
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_registration_string() {
        let spec = CommandSpec::parse("wrong-sequence [opt] <req> [variadic...]");
        assert_eq!(spec.name, "wrong-sequence");
        let names: Vec<_> = spec.args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["req", "opt", "variadic"]);
        assert_eq!(spec.usage(), "[options] <req> [opt] [variadic...]");
    }

    #[test]
    fn added_arguments_keep_ordering() {
        let mut spec = CommandSpec::parse("cmd [opt]");
        spec.add_arguments("<req>  [more...]");
        let names: Vec<_> = spec.args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["req", "opt", "more"]);
    }

    #[test]
    fn answers_to_name_and_aliases() {
        let mut spec = CommandSpec::parse("do things");
        spec.aliases.push("dt".into());
        assert!(spec.answers_to("do things"));
        assert!(spec.answers_to("dt"));
        assert!(!spec.answers_to("do"));
        assert_eq!(spec.word_count(), 2);
    }
}
