//! 명령 인자 명세(`<req>`, `[opt]`, `[rest...]`) 파싱과 정렬 규칙.

use serde::Serialize;

/// 등록 문자열에서 추출한 위치 인자 하나의 명세.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgSpec {
    pub name: String,
    pub required: bool,
    pub variadic: bool,
}

impl ArgSpec {
    /// 도움말에 표시할 `<name...>` / `[name]` 형태를 만든다.
    pub fn human_readable(&self) -> String {
        let name = if self.variadic {
            format!("{}...", self.name)
        } else {
            self.name.clone()
        };
        if self.required {
            format!("<{name}>")
        } else {
            format!("[{name}]")
        }
    }
}

/// 괄호 토큰 하나를 인자 명세로 변환한다. 괄호가 아니면 무시한다.
pub fn parse_arg_token(token: &str) -> Option<ArgSpec> {
    let required = match token.chars().next()? {
        '<' => true,
        '[' => false,
        _ => return None,
    };

    // 닫는 괄호 한 글자를 잘라낸다.
    let inner: String = {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < 2 {
            String::new()
        } else {
            chars[1..chars.len() - 1].iter().collect()
        }
    };

    let mut name = inner;
    let mut variadic = false;
    if name.len() > 3 && name.ends_with("...") {
        variadic = true;
        name.truncate(name.len() - 3);
    }

    if name.is_empty() {
        return None;
    }

    Some(ArgSpec {
        name,
        required,
        variadic,
    })
}

/// 공백으로 구분된 인자 토큰을 기존 명세 뒤에 추가하고 순서를 다시 맞춘다.
pub fn append_expected_args<'a, I>(args: &mut Vec<ArgSpec>, tokens: I)
where
    I: IntoIterator<Item = &'a str>,
{
    args.extend(tokens.into_iter().filter_map(parse_arg_token));
    sort_args(args);
}

/// 필수 인자를 선택 인자보다 앞에, 가변 인자를 맨 뒤에 둔다.
/// 안정 정렬이므로 같은 등급 안의 상대 순서는 유지된다.
pub fn sort_args(args: &mut [ArgSpec]) {
    args.sort_by_key(|arg| (!arg.required, arg.variadic));
}

/// 등록 문자열을 명령 이름과 괄호 토큰 목록으로 분리한다.
/// 예: `"multiple <req> [opt]"` -> (`"multiple"`, [`"<req>"`, `"[opt]"`])
pub fn split_registration(raw: &str) -> (String, Vec<String>) {
    let name_end = raw.find(['[', '<']).unwrap_or(raw.len());
    let name = raw[..name_end].trim().to_string();

    let mut tokens = Vec::new();
    let mut rest = &raw[name_end..];
    while let Some(start) = rest.find(['[', '<']) {
        let open = rest[start..].chars().next().unwrap_or('[');
        let close = if open == '<' { '>' } else { ']' };
        match rest[start + 1..].find(close) {
            Some(offset) => {
                let end = start + 1 + offset + close.len_utf8();
                tokens.push(rest[start..end].to_string());
                rest = &rest[end..];
            }
            None => break,
        }
    }

    (name, tokens)
}
