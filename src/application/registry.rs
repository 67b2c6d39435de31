//! 명령 레지스트리와 등록된 명령을 수정하는 빌더 핸들.
//!
//! 명령은 `Arc<Command>`로 보관된다. 빌더 호출은 복사 후 교체(copy-on-write)로
//! 반영되므로 실행 중인 명령 집합은 호출 시점의 정의를 그대로 쓴다.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use super::command::{Cancellable, Command, action_fn, cancellable_action_fn};
use super::error::VorpalError;
use super::instance::CommandInstance;
use crate::domain::option::CommandOption;
use crate::domain::spec::CommandSpec;
use crate::domain::tokenizer::FlagTypes;
use crate::domain::value::CommandArgs;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 등록 순서를 유지하는 명령 목록.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Mutex<Vec<Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 같은 이름이 있으면 그 자리를 교체하고, 없으면 뒤에 추가한다.
    pub fn register(&self, command: Command) {
        let mut commands = lock(&self.commands);
        let command = Arc::new(command);
        match commands.iter_mut().find(|c| c.name() == command.name()) {
            Some(slot) => {
                debug!(name = %command.name(), "command replaced");
                *slot = command;
            }
            None => {
                debug!(name = %command.name(), "command registered");
                commands.push(command);
            }
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut commands = lock(&self.commands);
        let before = commands.len();
        commands.retain(|c| c.name() != name);
        before != commands.len()
    }

    pub fn find(&self, name: &str) -> Option<Arc<Command>> {
        lock(&self.commands)
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// 현재 등록된 명령들의 스냅샷.
    pub fn snapshot(&self) -> Vec<Arc<Command>> {
        lock(&self.commands).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.commands).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 이름으로 찾은 명령을 수정한다. 제거된 명령이면 아무것도 하지 않는다.
    fn update<R>(&self, name: &str, apply: impl FnOnce(&mut Command) -> R) -> Option<R> {
        let mut commands = lock(&self.commands);
        let Some(slot) = commands.iter_mut().find(|c| c.name() == name) else {
            warn!(name, "builder call on a command that is no longer registered");
            return None;
        };
        Some(apply(Arc::make_mut(slot)))
    }

    /// 별칭이 다른 명령의 별칭 또는 이름과 겹치는지 확인한다.
    fn alias_owner(&self, name: &str, alias: &str) -> Option<String> {
        lock(&self.commands)
            .iter()
            .find(|c| c.spec.has_alias(alias) || (c.name() == alias && c.name() != name))
            .map(|c| c.name().to_string())
    }
}

/// 등록된 명령을 체이닝 방식으로 설정하는 핸들.
#[derive(Clone)]
pub struct CommandHandle {
    registry: Arc<CommandRegistry>,
    name: String,
}

impl CommandHandle {
    pub(crate) fn new(registry: Arc<CommandRegistry>, name: String) -> Self {
        Self { registry, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 현재 명령 정의의 스냅샷.
    pub fn get(&self) -> Option<Arc<Command>> {
        self.registry.find(&self.name)
    }

    /// 명세를 복사해 돌려준다. 제거된 명령이면 빈 명세다.
    pub fn spec(&self) -> CommandSpec {
        self.get().map(|c| c.spec.clone()).unwrap_or_default()
    }

    fn edit(self, apply: impl FnOnce(&mut Command)) -> Self {
        self.registry.update(&self.name, apply);
        self
    }

    pub fn description(self, text: &str) -> Self {
        let text = text.to_string();
        self.edit(|c| c.spec.description = Some(text))
    }

    pub fn option(self, flags: &str, description: &str) -> Self {
        let option = CommandOption::new(flags, description);
        self.edit(|c| c.spec.options.push(option))
    }

    /// 값 자동완성 후보를 가진 옵션을 추가한다.
    pub fn option_with_autocomplete(
        self,
        flags: &str,
        description: &str,
        candidates: &[&str],
    ) -> Self {
        let mut option = CommandOption::new(flags, description);
        option.autocomplete = candidates.iter().map(|s| s.to_string()).collect();
        self.edit(|c| c.spec.options.push(option))
    }

    /// 별칭을 추가한다. 이미 다른 명령이 쓰는 별칭이나 이름이면 실패한다.
    pub fn alias(self, aliases: &[&str]) -> Result<Self, VorpalError> {
        for alias in aliases {
            if let Some(owner) = self.registry.alias_owner(&self.name, alias) {
                return Err(VorpalError::DuplicateAlias {
                    alias: alias.to_string(),
                    command: self.name.clone(),
                    owner,
                });
            }
            let alias = alias.to_string();
            self.registry.update(&self.name, |c| c.spec.aliases.push(alias));
        }
        Ok(self)
    }

    pub fn usage(self, text: &str) -> Self {
        let text = text.to_string();
        self.edit(|c| c.spec.usage_override = Some(text))
    }

    /// `"<a> [b...]"` 형태로 인자를 추가한다.
    pub fn arguments(self, desc: &str) -> Self {
        let desc = desc.to_string();
        self.edit(|c| c.spec.add_arguments(&desc))
    }

    pub fn hidden(self) -> Self {
        self.edit(|c| c.spec.hidden = true)
    }

    pub fn no_help(self) -> Self {
        self.edit(|c| c.spec.no_help = true)
    }

    pub fn allow_unknown_options(self, allow: bool) -> Self {
        self.edit(|c| c.spec.allow_unknown_options = allow)
    }

    pub fn types(self, types: FlagTypes) -> Self {
        self.edit(|c| c.spec.types = types)
    }

    /// 모드 진입 후 프롬프트 구분자.
    pub fn delimiter(self, text: &str) -> Self {
        let text = text.to_string();
        self.edit(|c| c.spec.mode_delimiter = Some(text))
    }

    pub fn autocomplete(self, candidates: &[&str]) -> Self {
        let list: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
        self.edit(|c| c.spec.autocomplete = list)
    }

    pub fn relay(self) -> Self {
        self.edit(|c| c.spec.relay = true)
    }

    pub fn action<F, Fut, T>(self, f: F) -> Self
    where
        F: Fn(Arc<CommandInstance>, CommandArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        let action = action_fn(f);
        self.edit(|c| c.hooks.action = Some(action))
    }

    /// 취소 수단을 함께 돌려주는 액션.
    pub fn cancellable_action<F, Fut, T, C>(self, f: F) -> Self
    where
        F: Fn(Arc<CommandInstance>, CommandArgs) -> (Fut, C) + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
        C: Cancellable + 'static,
    {
        let action = cancellable_action_fn(f);
        self.edit(|c| c.hooks.action = Some(action))
    }

    pub fn validate<F>(self, f: F) -> Self
    where
        F: Fn(&CommandInstance, &CommandArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.validate = Some(Arc::new(f)))
    }

    pub fn cancel<F>(self, f: F) -> Self
    where
        F: Fn(&CommandInstance) + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.cancel = Some(Arc::new(f)))
    }

    pub fn done<F>(self, f: F) -> Self
    where
        F: Fn(&CommandInstance) + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.done = Some(Arc::new(f)))
    }

    pub fn after<F>(self, f: F) -> Self
    where
        F: Fn(&CommandInstance) + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.after = Some(Arc::new(f)))
    }

    /// 모드 진입 액션. 모드가 아닌 명령에 호출하면 실패한다.
    pub fn init<F, Fut, T>(self, f: F) -> Result<Self, VorpalError>
    where
        F: Fn(Arc<CommandInstance>, CommandArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + 'static,
    {
        let init = action_fn(f);
        let applied = self.registry.update(&self.name, |c| {
            if !c.spec.is_mode() {
                return false;
            }
            c.hooks.init = Some(init);
            true
        });
        match applied {
            Some(false) => Err(VorpalError::InitOnNonMode(self.name.clone())),
            _ => Ok(self),
        }
    }

    /// `--help`와 `help <command>`에서 기본 도움말 대신 쓰인다.
    pub fn help<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.help = Some(Arc::new(f)))
    }

    /// 매칭 직후 명령 원문을 다시 쓰는 훅. 결과는 한 번만 다시 매칭된다.
    pub fn parse<F>(self, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.edit(|c| c.hooks.parse = Some(Arc::new(f)))
    }

    /// 여러 명령에 공통 설정을 적용할 때 쓰는 조합 함수.
    pub fn use_with<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self)
    }

    /// 레지스트리에서 이 명령을 제거한다.
    pub fn remove(self) -> Self {
        self.registry.remove(&self.name);
        self
    }
}
