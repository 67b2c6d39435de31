//! 애플리케이션 계층이 의존하는 포트(추상 인터페이스) 모음.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::help::ScreenSize;
use crate::domain::spec::CommandSpec;
use crate::domain::value::ArgOverrides;

/// 터미널에 묻는 질문 하나.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptQuestion {
    pub name: String,
    pub message: String,
    pub default: Option<String>,
}

impl PromptQuestion {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            default: None,
        }
    }
}

/// 프롬프트 입력/구분자 갱신을 담당하는 터미널 포트.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn prompt(&self, question: &PromptQuestion) -> Result<String>;
    fn refresh_delimiter(&self, delimiter: &str);
    fn is_mid_prompt(&self) -> bool;
    fn cancel_active_prompt(&self);
    fn screen_size(&self) -> ScreenSize {
        ScreenSize::default()
    }
}

/// 커서가 있는 명령 이력 포트. 모드 진입 시 독립된 구간을 연다.
pub trait CommandHistory: Send + Sync {
    fn push_command(&self, text: &str);
    fn previous(&self) -> Option<String>;
    fn next(&self) -> Option<String>;
    fn enter_mode_scope(&self);
    fn exit_mode_scope(&self);
    /// 가장 최근 항목.
    fn peek(&self) -> Option<String>;
    fn set_id(&self, id: &str);
}

/// 탭 자동완성 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// 입력 줄 전체를 이 문자열로 바꾼다.
    Line(String),
    /// 하나로 좁혀지지 않은 후보 목록.
    Candidates(Vec<String>),
}

/// 탭 자동완성 포트. 세션은 등록된 명령 명세와 입력 문자열만 넘긴다.
pub trait Autocompleter: Send + Sync {
    fn complete(&self, line: &str, commands: &[&CommandSpec]) -> Option<Completion>;
    /// 임의의 후보 목록에서 `partial`을 완성한다. 명령 구현이 직접 쓴다.
    fn match_candidates(&self, partial: &str, candidates: &[String]) -> Option<Completion>;
}

/// id 단위로 분리된 키-값 저장소 포트.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// id로 저장소를 여는 팩토리 포트.
pub trait StorageProvider: Send + Sync {
    fn open(&self, id: &str) -> Result<Arc<dyn KeyValueStore>>;
}

/// 세션 출력 포트. 명령이 남긴 줄을 그대로 받는다.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// 셸 하나를 조립하는 데 필요한 어댑터 묶음.
#[derive(Clone)]
pub struct ShellPorts {
    pub terminal: Arc<dyn Terminal>,
    pub history: Arc<dyn CommandHistory>,
    pub autocompleter: Arc<dyn Autocompleter>,
    pub output: Arc<dyn OutputSink>,
    pub storage: Arc<dyn StorageProvider>,
}

/// 원격 세션의 명령을 상위 인스턴스로 전달하는 포트.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn execute(&self, session_id: &str, command: &str, args: &ArgOverrides)
    -> Result<Value>;
}
