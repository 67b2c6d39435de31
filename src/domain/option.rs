//! 명령 옵션 플래그 명세.

use serde::Serialize;

/// `-r, --required <str>` 같은 플래그 문자열에서 만든 옵션 명세.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOption {
    /// 등록 당시의 원문 플래그 문자열.
    pub flags: String,
    pub description: String,
    pub short: Option<String>,
    pub long: Option<String>,
    /// `<value>`를 가진 옵션.
    pub required: bool,
    /// `[value]`를 가진 옵션.
    pub optional: bool,
    /// `--no-*` 형태가 아니면 true.
    pub bool: bool,
    /// 탭 자동완성 후보.
    pub autocomplete: Vec<String>,
}

impl CommandOption {
    pub fn new(flags: &str, description: &str) -> Self {
        let mut option = Self {
            flags: flags.to_string(),
            description: description.to_string(),
            short: None,
            long: None,
            required: flags.contains('<'),
            optional: flags.contains('['),
            bool: !flags.contains("-no-"),
            autocomplete: Vec::new(),
        };

        let parts: Vec<&str> = flags
            .split([' ', ',', '|'])
            .filter(|part| !part.is_empty())
            .collect();

        let mut iter = parts.iter();
        if parts.len() > 1
            && !parts[1].starts_with('[')
            && !parts[1].starts_with('<')
            && let Some(first) = iter.next()
        {
            option.assign_flag(first);
        }
        if let Some(next) = iter.next() {
            option.assign_flag(next);
        }

        option
    }

    fn assign_flag(&mut self, flag: &str) {
        if flag.starts_with("--") {
            self.long = Some(flag.to_string());
        } else {
            self.short = Some(flag.to_string());
        }
    }

    /// 값 없이 존재 여부만 나타내는 플래그인지 여부.
    pub fn is_boolean(&self) -> bool {
        !self.required && !self.optional
    }

    /// 옵션 표시 이름(`--no-` 및 대시 제거).
    pub fn name(&self) -> String {
        match (&self.long, &self.short) {
            (Some(long), _) => long.replacen("--", "", 1).replacen("no-", "", 1),
            (None, Some(short)) => short.replacen('-', "", 1),
            (None, None) => String::new(),
        }
    }

    /// 파싱된 플래그 맵에서 찾을 짧은 키(`-b` -> `b`).
    pub fn short_key(&self) -> String {
        self.short.as_deref().unwrap_or_default().replace('-', "")
    }

    /// 파싱된 플래그 맵에서 찾을 긴 키(`--no-color` -> `color`).
    pub fn long_key(&self) -> String {
        self.long
            .as_deref()
            .unwrap_or_default()
            .replace("--no-", "")
            .trim_start_matches('-')
            .to_string()
    }

    /// 바인딩 결과에 저장할 정규 이름. 긴 이름을 우선한다.
    pub fn canonical_key(&self) -> String {
        let long = self.long_key();
        if long.is_empty() {
            self.short_key()
        } else {
            long
        }
    }

    /// 파서가 만든 플래그 키가 이 옵션을 가리키는지 확인한다.
    pub fn matches_key(&self, key: &str) -> bool {
        let long = self.long.as_deref();
        long == Some(format!("--{key}").as_str())
            || long == Some(format!("--no-{key}").as_str())
            || self.short.as_deref() == Some(format!("-{key}").as_str())
    }

    /// 에러 메시지에 쓸 대표 플래그.
    pub fn display_flag(&self) -> &str {
        self.long
            .as_deref()
            .or(self.short.as_deref())
            .unwrap_or(self.flags.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_flags() {
        let opt = CommandOption::new("-r, --required <str>", "needs a value");
        assert_eq!(opt.short.as_deref(), Some("-r"));
        assert_eq!(opt.long.as_deref(), Some("--required"));
        assert!(opt.required);
        assert!(!opt.optional);
        assert!(opt.bool);
        assert_eq!(opt.canonical_key(), "required");
        assert_eq!(opt.display_flag(), "--required");
    }

    #[test]
    fn long_only_flag_with_value_marker() {
        let opt = CommandOption::new("--optional [str]", "");
        assert_eq!(opt.short, None);
        assert_eq!(opt.long.as_deref(), Some("--optional"));
        assert!(opt.optional);
        assert!(!opt.is_boolean());
    }

    #[test]
    fn negated_flag_is_not_bool() {
        let opt = CommandOption::new("--no-color", "");
        assert!(!opt.bool);
        assert!(opt.is_boolean());
        assert_eq!(opt.name(), "color");
        assert_eq!(opt.long_key(), "color");
        assert!(opt.matches_key("color"));
    }

    #[test]
    fn short_only_flag() {
        let opt = CommandOption::new("-b", "");
        assert_eq!(opt.short.as_deref(), Some("-b"));
        assert_eq!(opt.canonical_key(), "b");
        assert!(opt.matches_key("b"));
        assert!(!opt.matches_key("bool"));
    }
}
