//! 셸 설정 스키마(순수 데이터).
//!
//! 주의: 파일/환경변수 접근은 `infrastructure`에서만 수행한다.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DELIMITER: &str = "vorpal~$";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ShellConfig {
    /// 프롬프트 구분자
    pub delimiter: Option<String>,
    /// `key=value` 쌍 정규화 여부 (기본 true)
    pub normalize_key_pairs: Option<bool>,
    /// exec_sync 에러를 항상 `Err`로 돌려줄지 여부 (기본 false)
    pub fatal: Option<bool>,
    /// 명령 이력 구분 id
    pub history_id: Option<String>,
    /// 로컬 저장소 id
    pub storage_id: Option<String>,
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
}

impl ShellConfig {
    /// 값이 있는 필드만 덮어쓴다.
    pub fn merge_from(&mut self, other: ShellConfig) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.normalize_key_pairs.is_some() {
            self.normalize_key_pairs = other.normalize_key_pairs;
        }
        if other.fatal.is_some() {
            self.fatal = other.fatal;
        }
        if other.history_id.is_some() {
            self.history_id = other.history_id;
        }
        if other.storage_id.is_some() {
            self.storage_id = other.storage_id;
        }
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.banner.is_some() {
            self.banner = other.banner;
        }
    }

    pub fn effective_normalize_key_pairs(&self) -> bool {
        self.normalize_key_pairs.unwrap_or(true)
    }

    pub fn effective_fatal(&self) -> bool {
        self.fatal.unwrap_or(false)
    }

    pub fn effective_delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER)
    }
}
