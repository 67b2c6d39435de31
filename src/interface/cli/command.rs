//! CLI 인자 파싱 모듈.

use std::path::PathBuf;

use clap::Parser;

use crate::application::config::ShellConfig;

#[derive(Debug, Parser)]
#[command(name = "vorpal")]
#[command(about = "Interactive command shell with pipes, modes and autocomplete")]
pub struct Cli {
    /// Prompt delimiter
    #[arg(long)]
    delimiter: Option<String>,

    /// Extra config file merged after the default search paths
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run these commands in order and exit instead of starting the shell
    #[arg(long = "exec", value_name = "COMMAND")]
    exec: Vec<String>,

    /// Keep `key=value` words as-is
    #[arg(long)]
    no_normalize: bool,

    /// Identifier that separates command history between apps
    #[arg(long)]
    history_id: Option<String>,
}

pub enum CliAction {
    Interactive,
    Exec(Vec<String>),
}

impl Cli {
    /// 실행 방식과 명령행에서 지정한 설정 레이어를 함께 돌려준다.
    pub fn action(&self) -> CliAction {
        if self.exec.is_empty() {
            CliAction::Interactive
        } else {
            CliAction::Exec(self.exec.clone())
        }
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    /// 명령행 값은 설정 파일보다 우선한다.
    pub fn overrides(&self) -> ShellConfig {
        ShellConfig {
            delimiter: self.delimiter.clone(),
            normalize_key_pairs: self.no_normalize.then_some(false),
            history_id: self.history_id.clone(),
            ..ShellConfig::default()
        }
    }
}
