//! 바인딩된 인자/옵션 값 타입.

use std::collections::BTreeMap;

use serde::Serialize;

/// 인자 또는 옵션 하나에 바인딩된 값.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    List(Vec<String>),
    Flag(bool),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ArgValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    /// 값이 없는 존재 표시(true/false)인지 여부.
    pub fn is_flag(&self) -> bool {
        matches!(self, ArgValue::Flag(_))
    }

    /// 참으로 취급되는 값인지 확인한다. 빈 문자열과 false만 거짓이다.
    pub fn is_truthy(&self) -> bool {
        match self {
            ArgValue::Flag(value) => *value,
            ArgValue::Text(value) => !value.is_empty(),
            ArgValue::List(_) => true,
        }
    }

    /// 같은 키가 반복될 때 값을 목록으로 누적한다.
    pub(crate) fn accumulate(self, next: ArgValue) -> ArgValue {
        let mut items = self.into_strings();
        items.extend(next.into_strings());
        ArgValue::List(items)
    }

    fn into_strings(self) -> Vec<String> {
        match self {
            ArgValue::Text(value) => vec![value],
            ArgValue::List(values) => values,
            ArgValue::Flag(value) => vec![value.to_string()],
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Flag(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(values: Vec<String>) -> Self {
        ArgValue::List(values)
    }
}

/// 옵션 정규 이름 -> 값. 이름 순으로 정렬된다.
pub type OptionMap = BTreeMap<String, ArgValue>;

/// 한 번의 실행에 바인딩된 인자 묶음.
/// 명령 정의 자체는 건드리지 않고 호출마다 새로 만든다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandArgs {
    pub options: OptionMap,
    #[serde(flatten)]
    pub values: BTreeMap<String, ArgValue>,
    /// 파이프 상류 명령이 출력한 줄들.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin: Option<Vec<String>>,
    /// 실행된 원문 명령줄.
    #[serde(rename = "rawCommand", skip_serializing_if = "Option::is_none")]
    pub raw_command: Option<String>,
    /// 모드 안에서 입력된 원문 한 줄.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_input: Option<String>,
}

impl CommandArgs {
    /// 모드 핸들러에 그대로 넘길 원문 입력을 담는다.
    pub fn from_mode_input(raw: impl Into<String>) -> Self {
        Self {
            mode_input: Some(raw.into()),
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ArgValue::as_str)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).and_then(ArgValue::as_list)
    }

    pub fn option(&self, name: &str) -> Option<&ArgValue> {
        self.options.get(name)
    }

    /// 옵션이 참 값으로 주어졌는지 확인한다.
    pub fn flag(&self, name: &str) -> bool {
        self.options.get(name).is_some_and(ArgValue::is_truthy)
    }

    /// `--help` 또는 `/?`로 도움말이 요청되었는지 여부.
    pub fn wants_help(&self) -> bool {
        self.flag("help")
    }

    /// 파이프로 들어온 입력을 한 문자열로 합친다.
    pub fn stdin_text(&self) -> String {
        self.stdin.as_deref().unwrap_or_default().join(" ")
    }
}

/// 프로그램 방식 실행 시 호출자가 넘기는 값. 같은 이름의 바인딩 값을 덮어쓴다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgOverrides {
    pub values: BTreeMap<String, ArgValue>,
    pub options: OptionMap,
}

impl ArgOverrides {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.options.is_empty()
    }

    pub fn value(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn option(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    /// 얕은 덮어쓰기로 바인딩 결과에 병합한다.
    pub fn apply_to(&self, args: &mut CommandArgs) {
        for (key, value) in &self.values {
            args.values.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.options {
            args.options.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_flat_like_a_plain_object() {
        let mut args = CommandArgs::default();
        args.values.insert("req".into(), "foo".into());
        args.values
            .insert("variadic".into(), vec!["joe".to_string(), "smith".to_string()].into());
        args.options.insert("bool".into(), true.into());

        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(
            value,
            json!({"options": {"bool": true}, "req": "foo", "variadic": ["joe", "smith"]})
        );
    }

    #[test]
    fn accumulates_repeated_values() {
        let value = ArgValue::from("a").accumulate("b".into()).accumulate("c".into());
        assert_eq!(
            value,
            ArgValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn overrides_win_over_bound_values() {
        let mut args = CommandArgs::default();
        args.values.insert("str".into(), "typed".into());
        let overrides = ArgOverrides::default()
            .value("str", "given")
            .option("force", true);
        overrides.apply_to(&mut args);
        assert_eq!(args.text("str"), Some("given"));
        assert!(args.flag("force"));
    }
}
