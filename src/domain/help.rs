//! 명령 도움말과 전체 명령 목록 렌더링 모듈.

use unicode_width::UnicodeWidthStr;

use super::spec::CommandSpec;

/// 전체 도움말 머리말에 쓰이는 셸 설명 정보.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptors {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
}

/// 도움말 줄바꿈/그룹 접기에 쓰는 화면 크기.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub columns: u16,
    pub rows: u16,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            columns: 80,
            rows: 24,
        }
    }
}

/// 단일 명령의 usage/별칭/설명/옵션 표를 만든다.
pub fn help_information(spec: &CommandSpec) -> String {
    let mut lines: Vec<String> = vec![
        String::new(),
        format!("  Usage: {} {}", spec.name, spec.usage()),
        String::new(),
    ];

    if spec.aliases.is_empty() {
        lines.push(String::new());
    } else {
        lines.push(format!("  Alias: {}\n", spec.aliases.join(" | ")));
    }

    if let Some(description) = &spec.description {
        lines.push(format!("  {description}"));
        lines.push(String::new());
    }

    lines.push("  Options:".to_string());
    lines.push(String::new());
    lines.push(indent(&option_help(spec), "    "));
    lines.push(String::new());

    lines.join("\n").replace("\n\n\n", "\n\n")
}

/// 옵션 표. `--help`가 항상 첫 줄이다.
pub fn option_help(spec: &CommandSpec) -> String {
    let width = spec
        .options
        .iter()
        .map(|option| display_width(&option.flags))
        .max()
        .unwrap_or(0);

    let mut rows = vec![format!("{}  output usage information", pad("--help", width))];
    rows.extend(
        spec.options
            .iter()
            .map(|option| format!("{}  {}", pad(&option.flags, width), option.description)),
    );
    rows.join("\n")
}

/// 전체 명령 목록을 만든다. `command`가 어떤 명령 그룹의 접두어면 그 그룹만 보여준다.
pub fn command_help(
    specs: &[&CommandSpec],
    command: Option<&str>,
    descriptors: &Descriptors,
    screen: ScreenSize,
) -> String {
    if specs.is_empty() {
        return String::new();
    }

    let command = command.map(str::trim).filter(|c| !c.is_empty());
    let listed = |spec: &CommandSpec| !spec.hidden && !spec.is_catch_all();

    let mut single_match = false;
    let mut matches: Vec<&CommandSpec> = Vec::new();
    if let Some(command) = command {
        for spec in specs {
            let parts: Vec<&str> = spec.name.split(' ').collect();
            if parts.len() == 1 && parts[0] == command && listed(spec) {
                single_match = true;
            }
            let is_prefix = (1..=parts.len()).any(|n| parts[..n].join(" ").trim() == command);
            if is_prefix && listed(spec) {
                matches.push(spec);
            }
        }
    }

    let invalid = command.is_some() && matches.is_empty() && !single_match;
    let invalid_string = if invalid {
        "\n  Invalid Command. Showing Help:\n"
    } else {
        ""
    };

    let match_depth = match command {
        Some(command) if !matches.is_empty() => command.split(' ').count() + 1,
        _ => 1,
    };
    if matches.is_empty() {
        matches = specs.to_vec();
    }

    let skip_groups = matches.len() + 6 <= usize::from(screen.rows);

    let commands: Vec<(String, String)> = matches
        .iter()
        .filter(|spec| !spec.no_help && listed(spec))
        .filter(|spec| skip_groups || spec.word_count() <= match_depth)
        .map(|spec| {
            let args: Vec<String> = spec.args.iter().map(|a| a.human_readable()).collect();
            let options = if spec.options.is_empty() {
                ""
            } else {
                " [options]"
            };
            (
                format!("{}{} {}", spec.name, options, args.join(" ")),
                spec.description.clone().unwrap_or_default(),
            )
        })
        .collect();

    let width = commands
        .iter()
        .map(|(usage, _)| display_width(usage))
        .max()
        .unwrap_or(0);

    let mut groups: Vec<(String, usize)> = Vec::new();
    if !skip_groups {
        for spec in &matches {
            if spec.word_count() <= match_depth {
                continue;
            }
            let group = spec
                .name
                .split(' ')
                .take(match_depth)
                .collect::<Vec<_>>()
                .join(" ");
            match groups.iter_mut().find(|(name, _)| *name == group) {
                Some((_, count)) => *count += 1,
                None => groups.push((group, 1)),
            }
        }
    }

    let mut out = header(descriptors, invalid, screen);
    out.push_str(invalid_string);

    if !commands.is_empty() {
        let description_width = usize::from(screen.columns)
            .saturating_sub(width + 4)
            .saturating_sub(8);
        out.push_str("\n  Commands:\n\n");
        let rendered: Vec<String> = commands
            .iter()
            .map(|(usage, description)| {
                let continuation = pad("", width + 6);
                let wrapped = wrap(description, description_width)
                    .lines()
                    .enumerate()
                    .map(|(i, line)| {
                        if i == 0 {
                            line.to_string()
                        } else {
                            format!("{continuation}{line}")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("    {}  {}", pad(usage, width), wrapped)
            })
            .collect();
        out.push_str(&rendered.join("\n"));
        out.push_str("\n\n");
    }

    out.push('\n');

    if !groups.is_empty() {
        out.push_str("  Command Groups:\n\n");
        let rendered: Vec<String> = groups
            .iter()
            .map(|(group, count)| {
                let plural = if *count == 1 { "" } else { "s" };
                format!(
                    "    {}  {count} sub-command{plural}.",
                    pad(&format!("{group} *"), width)
                )
            })
            .collect();
        out.push_str(&rendered.join("\n"));
        out.push('\n');
    }

    let mut out = out.replace("\n\n\n", "\n\n");
    if out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// 배너, 제목(버전 포함), 설명으로 이루어진 머리말. 잘못된 명령일 때는 제목을 숨긴다.
fn header(descriptors: &Descriptors, hide_title: bool, screen: ScreenSize) -> String {
    let mut rows: Vec<String> = Vec::new();

    if let Some(banner) = &descriptors.banner {
        rows.push(pad_row(banner));
        rows.push(String::new());
    }

    if let Some(title) = &descriptors.title
        && !hide_title
    {
        let title = match &descriptors.version {
            Some(version) => format!("{title} v{version}"),
            None => title.clone(),
        };
        rows.push(pad_row(&title));

        if let Some(description) = &descriptors.description {
            let width = usize::from(screen.columns) * 3 / 4;
            rows.push(pad_row(&wrap(description, width)));
        }
    }

    if !rows.is_empty() {
        rows.insert(0, String::new());
        rows.push(String::new());
    }

    rows.join("\n")
}

fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// 표시 폭 기준으로 오른쪽을 공백으로 채운다.
pub fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(fill))
}

fn pad_row(text: &str) -> String {
    text.split('\n')
        .map(|row| format!("  {row}  "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(text: &str, prefix: &str) -> String {
    text.split('\n')
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 단어 단위 줄바꿈. 폭이 0이면 그대로 둔다.
fn wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let needed = display_width(&current) + usize::from(!current.is_empty()) + display_width(word);
        if !current.is_empty() && needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    lines.join("\n")
}
