//! 명령 정의(명세 + 실행 훅)와 훅 타입.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use super::instance::CommandInstance;
use crate::domain::spec::CommandSpec;
use crate::domain::value::CommandArgs;

/// 실행 중인 액션이 노출하는 취소 수단.
pub trait Cancellable: Send + Sync {
    fn cancel(&self, root: &CommandInstance);
}

impl<F> Cancellable for F
where
    F: Fn(&CommandInstance) + Send + Sync,
{
    fn cancel(&self, root: &CommandInstance) {
        self(root)
    }
}

/// 액션 호출 결과. 완료 future와 선택적 취소 수단을 함께 갖는다.
pub struct ActionHandle {
    pub(crate) future: BoxFuture<'static, anyhow::Result<Value>>,
    pub(crate) canceller: Option<Arc<dyn Cancellable>>,
}

impl ActionHandle {
    pub fn new<Fut, T>(future: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize,
    {
        let future = future.map(|result| {
            let value = result?;
            Ok(serde_json::to_value(value)?)
        });
        Self {
            future: future.boxed(),
            canceller: None,
        }
    }

    /// 즉시 완료되는 결과.
    pub fn ready(value: Value) -> Self {
        Self {
            future: futures::future::ready(Ok(value)).boxed(),
            canceller: None,
        }
    }

    pub fn with_canceller(mut self, canceller: impl Cancellable + 'static) -> Self {
        self.canceller = Some(Arc::new(canceller));
        self
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("cancellable", &self.canceller.is_some())
            .finish()
    }
}

pub type ActionFn = Arc<dyn Fn(Arc<CommandInstance>, CommandArgs) -> ActionHandle + Send + Sync>;
pub type ValidateFn =
    Arc<dyn Fn(&CommandInstance, &CommandArgs) -> anyhow::Result<()> + Send + Sync>;
pub type InstanceHook = Arc<dyn Fn(&CommandInstance) + Send + Sync>;
/// (명령 원문, 매칭 후 남은 인자) -> 다시 파싱할 명령 원문.
pub type ParseFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;
/// 명령 이름 -> 도움말 텍스트.
pub type HelpFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// 명령별 실행 훅. 모두 선택 사항이다.
#[derive(Clone, Default)]
pub struct CommandHooks {
    pub action: Option<ActionFn>,
    pub validate: Option<ValidateFn>,
    pub cancel: Option<InstanceHook>,
    pub done: Option<InstanceHook>,
    pub after: Option<InstanceHook>,
    /// 모드 진입 시 액션 대신 실행된다.
    pub init: Option<ActionFn>,
    pub help: Option<HelpFn>,
    pub parse: Option<ParseFn>,
}

impl fmt::Debug for CommandHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHooks")
            .field("action", &self.action.is_some())
            .field("validate", &self.validate.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("done", &self.done.is_some())
            .field("after", &self.after.is_some())
            .field("init", &self.init.is_some())
            .field("help", &self.help.is_some())
            .field("parse", &self.parse.is_some())
            .finish()
    }
}

/// 레지스트리에 저장되는 명령 하나.
#[derive(Debug, Clone)]
pub struct Command {
    pub spec: CommandSpec,
    pub hooks: CommandHooks,
}

impl Command {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            hooks: CommandHooks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// `Fn(ctx, args) -> Future` 클로저를 액션 함수로 감싼다.
pub(crate) fn action_fn<F, Fut, T>(f: F) -> ActionFn
where
    F: Fn(Arc<CommandInstance>, CommandArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(move |ctx, args| ActionHandle::new(f(ctx, args)))
}

/// `Fn(ctx, args) -> (Future, 취소 수단)` 클로저를 액션 함수로 감싼다.
pub(crate) fn cancellable_action_fn<F, Fut, T, C>(f: F) -> ActionFn
where
    F: Fn(Arc<CommandInstance>, CommandArgs) -> (Fut, C) + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
    C: Cancellable + 'static,
{
    Arc::new(move |ctx, args| {
        let (future, canceller) = f(ctx, args);
        ActionHandle::new(future).with_canceller(canceller)
    })
}
