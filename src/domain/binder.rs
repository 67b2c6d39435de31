//! 인자 문자열을 명령 명세에 맞춰 `CommandArgs`로 바인딩한다.

use thiserror::Error;

use super::spec::CommandSpec;
use super::tokenizer::{FlagTypes, normalize_key_pairs, parse_tokens, tokenize};
use super::value::{ArgOverrides, ArgValue, CommandArgs};

/// 위치 인자 슬롯 상한.
const MAX_ARGS: usize = 10;

/// 사용자 입력이 명세와 맞지 않을 때의 에러. 메시지는 도움말 앞에 그대로 출력된다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("\n  Missing required argument. Showing Help:")]
    MissingArgument,
    #[error("\n  Missing required value for option {0}. Showing Help:")]
    MissingOptionValue(String),
    #[error("\n  Invalid option: '{0}'. Showing Help:")]
    InvalidOption(String),
}

/// 바인딩 옵션.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindOptions<'a> {
    /// `key=value` 쌍을 하나의 토큰으로 정규화할지 여부.
    pub normalize_key_pairs: bool,
    /// 프로그램 방식 실행에서 넘어온 덮어쓰기 값.
    pub overrides: Option<&'a ArgOverrides>,
}

/// 인자 문자열을 바인딩한다. 명세는 변경하지 않는다.
pub fn bind_args(
    input: &str,
    spec: &CommandSpec,
    opts: BindOptions<'_>,
) -> Result<CommandArgs, BindError> {
    let text = if opts.normalize_key_pairs {
        normalize_key_pairs(input)
    } else {
        input.to_string()
    };

    let types = flag_types_for(&text, spec);
    let tokens = tokenize(&text);
    let parsed = parse_tokens(&tokens, &types);

    let mut args = CommandArgs::default();
    bind_positionals(&parsed.positional, spec, &mut args)?;

    for option in &spec.options {
        let long = option.long_key();
        let short = option.short_key();
        let found = Some(long.as_str())
            .filter(|key| !key.is_empty())
            .and_then(|key| parsed.flag(key))
            .or_else(|| parsed.flag(&short));
        let Some(value) = found else {
            continue;
        };
        if value.is_flag() && option.required {
            return Err(BindError::MissingOptionValue(
                option.display_flag().to_string(),
            ));
        }
        args.options.insert(option.canonical_key(), value.clone());
    }

    for (key, value) in parsed.flags() {
        if key == "help" || spec.options.iter().any(|o| o.matches_key(key)) {
            continue;
        }
        if !spec.allow_unknown_options {
            return Err(BindError::InvalidOption(key.to_string()));
        }
        args.options.insert(key.to_string(), value.clone());
    }

    if let Some(overrides) = opts.overrides {
        overrides.apply_to(&mut args);
    }

    let help_flag = parsed.flag("help").is_some_and(ArgValue::is_truthy);
    if help_flag || parsed.positional.iter().any(|p| p == "/?") {
        args.options.insert("help".into(), ArgValue::Flag(true));
    }

    Ok(args)
}

/// 값 없는 옵션 중 실제 입력에 등장한 것만 boolean으로 취급한다.
fn flag_types_for(text: &str, spec: &CommandSpec) -> FlagTypes {
    let mut types = spec.types.clone();
    let words: Vec<&str> = text.split(' ').collect();

    let spellings = spec
        .options
        .iter()
        .filter(|option| option.is_boolean())
        .flat_map(|option| [option.short.as_deref(), option.long.as_deref()])
        .flatten()
        .map(|flag| flag.trim_start_matches('-'));

    for value in spellings {
        let formats = [
            format!("-{value}"),
            format!("--{value}"),
            format!("--no-{value}"),
        ];
        let present = words.iter().any(|w| formats.iter().any(|f| f == w));
        if present && !types.booleans.iter().any(|b| b == value) {
            types.booleans.push(value.to_string());
        }
    }

    types
}

/// 위치 인자를 명세 순서대로 채운다. 가변 인자는 남은 값을 모두 가져간다.
fn bind_positionals(
    positional: &[String],
    spec: &CommandSpec,
    args: &mut CommandArgs,
) -> Result<(), BindError> {
    let mut remaining: Vec<String> = positional.to_vec();

    for slot in 0..MAX_ARGS {
        let Some(expected) = spec.args.get(slot) else {
            continue;
        };
        match positional.get(slot) {
            Some(_) if expected.variadic => {
                args.values
                    .insert(expected.name.clone(), ArgValue::List(remaining.clone()));
            }
            Some(passed) => {
                args.values
                    .insert(expected.name.clone(), ArgValue::Text(passed.clone()));
                if !remaining.is_empty() {
                    remaining.remove(0);
                }
            }
            None if expected.required => return Err(BindError::MissingArgument),
            None => {}
        }
    }

    Ok(())
}
