//! 인자 문자열 토큰화와 플래그/위치 인자 분리.

use super::value::ArgValue;

/// 명령별로 강제하는 플래그 타입.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTypes {
    /// 값이 없을 때 true 대신 빈 문자열을 받는 플래그.
    pub strings: Vec<String>,
    /// 다음 토큰을 값으로 소비하지 않는 플래그.
    pub booleans: Vec<String>,
}

impl FlagTypes {
    fn is_string(&self, key: &str) -> bool {
        self.strings.iter().any(|s| s == key)
    }

    fn is_boolean(&self, key: &str) -> bool {
        self.booleans.iter().any(|b| b == key)
    }

    /// 값 없이 등장한 플래그의 기본값.
    fn bare_value(&self, key: &str) -> ArgValue {
        if self.is_string(key) {
            ArgValue::Text(String::new())
        } else {
            ArgValue::Flag(true)
        }
    }
}

/// 위치 인자와 플래그로 분리된 파싱 결과. 플래그는 등장 순서를 유지한다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    flags: Vec<(String, ArgValue)>,
}

impl ParsedArgs {
    pub fn flag(&self, key: &str) -> Option<&ArgValue> {
        self.flags.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 같은 키가 다시 나오면 목록으로 누적한다. 기존 값이 true/false면 덮어쓴다.
    fn set(&mut self, key: &str, value: ArgValue) {
        match self.flags.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) if existing.is_flag() => *existing = value,
            Some((_, existing)) => {
                let previous = std::mem::replace(existing, ArgValue::Flag(false));
                *existing = previous.accumulate(value);
            }
            None => self.flags.push((key.to_string(), value)),
        }
    }
}

const QUOTES: [char; 3] = ['"', '\'', '`'];

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `key=value`, `key="a b"`, `"key=value"` 형태를 `"key='value'"` 하나의 토큰으로 바꾼다.
pub fn normalize_key_pairs(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        // `--key=value` 플래그 대입은 바인더가 처리한다.
        let mid_word = i > 0 && (chars[i - 1] == '-' || is_word(chars[i - 1]));
        match (!mid_word).then(|| match_key_pair(&chars, i)).flatten() {
            Some((end, key, value)) => {
                out.push_str(&format!("\"{key}='{value}'\""));
                i = end;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }

    out
}

/// 위치 `start`에서 key=value 쌍을 찾는다. 반환값은 (끝 위치, 키, 값).
fn match_key_pair(chars: &[char], start: usize) -> Option<(usize, String, String)> {
    let outer = chars
        .get(start)
        .copied()
        .filter(|c| *c == '"' || *c == '\'');
    let key_start = start + usize::from(outer.is_some());

    let mut key_end = key_start;
    while key_end < chars.len() && is_word(chars[key_end]) {
        key_end += 1;
    }
    if key_end == key_start || chars.get(key_end) != Some(&'=') {
        return None;
    }
    let key: String = chars[key_start..key_end].iter().collect();
    let value_start = key_end + 1;

    // 따옴표로 감싼 값: 같은 줄 안에서 같은 따옴표로 닫혀야 한다.
    if let Some(&quote) = chars.get(value_start)
        && (quote == '"' || quote == '\'')
    {
        let close = chars[value_start + 1..]
            .iter()
            .take_while(|c| **c != '\n')
            .position(|c| *c == quote)
            .map(|offset| value_start + 1 + offset);
        if let Some(close) = close {
            let after = close + 1;
            let end = match outer {
                Some(q) if chars.get(after) == Some(&q) => Some(after + 1),
                Some(_) => None,
                None => Some(after),
            };
            if let Some(end) = end {
                let value: String = chars[value_start + 1..close].iter().collect();
                return Some((end, key, value));
            }
        }
    }

    // 따옴표 없는 값: 공백 전까지, 바깥 따옴표가 있으면 그 따옴표 직전까지.
    let mut run_end = value_start;
    while run_end < chars.len() && !chars[run_end].is_whitespace() {
        run_end += 1;
    }
    if run_end == value_start {
        return None;
    }
    match outer {
        None => {
            let value: String = chars[value_start..run_end].iter().collect();
            Some((run_end, key, value))
        }
        Some(q) => {
            let close = (value_start + 1..run_end).rev().find(|idx| chars[*idx] == q)?;
            let value: String = chars[value_start..close].iter().collect();
            Some((close + 1, key, value))
        }
    }
}

/// 따옴표(", ', `)로 묶인 구간을 하나의 토큰으로 취급해 나눈다. 따옴표는 제거된다.
pub fn tokenize(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if QUOTES.contains(&c) {
            let close = chars[i + 1..]
                .iter()
                .take_while(|ch| **ch != '\n')
                .position(|ch| *ch == c)
                .map(|offset| i + 1 + offset);
            if let Some(close) = close {
                tokens.push(chars[i + 1..close].iter().collect());
                i = close + 1;
                continue;
            }
            if c == '"' {
                // 닫히지 않은 큰따옴표는 토큰에 포함되지 않고 건너뛴다.
                i += 1;
                continue;
            }
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '"' {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }

    tokens
}

/// `-x`, `--x`로 시작하는 다음 토큰은 값이 아니라 플래그로 본다.
fn looks_like_flag(token: &str) -> bool {
    let rest = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'));
    match rest {
        Some(rest) => rest.chars().next().is_some_and(|c| c != '-'),
        None => false,
    }
}

fn ends_like_number(text: &str) -> bool {
    let mut rev = text.chars().rev();
    match rev.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => rev.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn parse_bool_literal(token: &str) -> Option<bool> {
    match token {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// 토큰 목록을 위치 인자와 플래그로 나눈다.
/// `types.booleans`에 든 플래그는 다음 토큰을 값으로 가져가지 않는다.
/// 입력에 나오지 않은 플래그는 결과에 들어가지 않는다.
pub fn parse_tokens(tokens: &[String], types: &FlagTypes) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);

        if token == "--" {
            parsed
                .positional
                .extend(tokens[i + 1..].iter().cloned());
            break;
        }

        if let Some(body) = token.strip_prefix("--")
            && !body.is_empty()
        {
            if let Some((key, value)) = body.split_once('=')
                && !key.is_empty()
            {
                let value = if types.is_boolean(key) {
                    ArgValue::Flag(value != "false")
                } else {
                    ArgValue::Text(value.to_string())
                };
                parsed.set(key, value);
            } else if let Some(key) = body.strip_prefix("no-")
                && !key.is_empty()
            {
                parsed.set(key, ArgValue::Flag(false));
            } else {
                let key = body;
                match next {
                    Some(value) if !looks_like_flag(value) && !types.is_boolean(key) => {
                        parsed.set(key, ArgValue::Text(value.to_string()));
                        i += 1;
                    }
                    Some(value) if parse_bool_literal(value).is_some() => {
                        parsed.set(key, ArgValue::Flag(value == "true"));
                        i += 1;
                    }
                    _ => parsed.set(key, types.bare_value(key)),
                }
            }
            i += 1;
            continue;
        }

        if let Some(body) = token.strip_prefix('-')
            && !body.is_empty()
            && !body.starts_with('-')
        {
            i += parse_short_cluster(token, next, types, &mut parsed);
            i += 1;
            continue;
        }

        parsed.positional.push(token.to_string());
        i += 1;
    }

    parsed
}

/// `-abc` 묶음을 처리한다. 다음 토큰을 값으로 소비했으면 1을 반환한다.
fn parse_short_cluster(
    token: &str,
    next: Option<&str>,
    types: &FlagTypes,
    parsed: &mut ParsedArgs,
) -> usize {
    let chars: Vec<char> = token.chars().collect();
    let letters = &chars[1..chars.len() - 1];
    let mut broken = false;

    for (j, letter) in letters.iter().enumerate() {
        let key = letter.to_string();
        let rest: String = chars[j + 2..].iter().collect();

        if rest == "-" {
            parsed.set(&key, ArgValue::Text(rest));
            continue;
        }
        if letter.is_ascii_alphabetic() && rest.starts_with('=') {
            parsed.set(&key, ArgValue::Text(rest[1..].to_string()));
            broken = true;
            break;
        }
        if letter.is_ascii_alphabetic() && ends_like_number(&rest) {
            parsed.set(&key, ArgValue::Text(rest));
            broken = true;
            break;
        }
        if letters.get(j + 1).is_some_and(|c| !is_word(*c)) {
            parsed.set(&key, ArgValue::Text(rest));
            broken = true;
            break;
        }
        parsed.set(&key, types.bare_value(&key));
    }

    let Some(last) = chars.last() else {
        return 0;
    };
    if broken || *last == '-' {
        return 0;
    }

    let key = last.to_string();
    match next {
        Some(value) if !value.is_empty() && !looks_like_flag(value) && !types.is_boolean(&key) => {
            parsed.set(&key, ArgValue::Text(value.to_string()));
            1
        }
        Some(value) if parse_bool_literal(value).is_some() => {
            parsed.set(&key, ArgValue::Flag(value == "true"));
            1
        }
        _ => {
            parsed.set(&key, types.bare_value(&key));
            0
        }
    }
}
