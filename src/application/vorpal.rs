//! 명령 등록, 실행 큐, 모드, 세션을 소유하는 셸 오케스트레이터.
//!
//! 최상위 실행은 FIFO 큐를 거쳐 한 번에 하나씩 진행된다. 큐 항목 하나는
//! 루트 명령과 파이프 하류 전체를 묶은 명령 집합이며 결과도 하나다.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace, warn};

use super::builtins;
use super::command::{ActionFn, ActionHandle, Command, HelpFn};
use super::config::ShellConfig;
use super::error::{BindError, CommandError, VorpalError};
use super::events::{Keypress, VorpalEvent};
use super::instance::CommandInstance;
use super::ports::{
    CommandHistory, KeyValueStore, OutputSink, PromptQuestion, ShellPorts, StorageProvider,
    Upstream,
};
use super::registry::{CommandHandle, lock};
use super::resolve::resolve_command;
use super::session::{CommandOutcome, CommandSet, Invocation, KeypressResult, Session};
use super::shell::Shell;
use crate::domain::binder::{BindOptions, bind_args};
use crate::domain::help::help_information;
use crate::domain::parser::match_command;
use crate::domain::spec::{CommandKind, CommandSpec};
use crate::domain::value::{ArgOverrides, CommandArgs};

/// 명령 등록 시 부가 옵션.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub no_help: bool,
    pub kind: CommandKind,
}

/// 프로그램 방식 실행 옵션.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// 대상 세션. 없으면 로컬 세션.
    pub session_id: Option<String>,
    /// exec_sync에서 실행 에러를 `Err`로 돌려줄지 여부.
    pub fatal: bool,
    /// 바인딩 결과에 덮어쓸 값.
    pub args: ArgOverrides,
}

type ReplyCallback = Box<dyn FnOnce(CommandOutcome) + Send>;

enum Reply {
    Promise(oneshot::Sender<CommandOutcome>),
    Callback(ReplyCallback),
}

impl Reply {
    fn send(self, outcome: CommandOutcome) {
        match self {
            Reply::Promise(tx) => {
                let _ = tx.send(outcome);
            }
            Reply::Callback(callback) => callback(outcome),
        }
    }
}

struct QueuedCommand {
    command: String,
    session: Arc<Session>,
    overrides: ArgOverrides,
    reply: Reply,
}

/// 현재 실행 중인 큐 항목.
struct RunningHandle {
    command: String,
    session: Arc<Session>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueuedCommand>,
    current: Option<RunningHandle>,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    normalize_key_pairs: bool,
    fatal: bool,
}

/// 큐 항목 준비 결과.
enum Prepared {
    Run(CommandSet),
    Finished(CommandOutcome),
}

struct Inner {
    shell: Arc<Shell>,
    session: Arc<Session>,
    sessions: Mutex<Vec<Arc<Session>>>,
    queue: Mutex<QueueState>,
    settings: Mutex<Settings>,
    storage: Mutex<Option<Arc<dyn KeyValueStore>>>,
    storage_provider: Arc<dyn StorageProvider>,
    upstream: Option<Arc<dyn Upstream>>,
}

/// 셸 오케스트레이터. 복제하면 같은 셸을 가리킨다.
#[derive(Clone)]
pub struct Vorpal {
    inner: Arc<Inner>,
}

/// `Vorpal` 생성기.
pub struct VorpalBuilder {
    ports: ShellPorts,
    config: ShellConfig,
    upstream: Option<Arc<dyn Upstream>>,
}

impl VorpalBuilder {
    /// 설정 레이어를 덮어쓴다. 값이 있는 필드만 반영된다.
    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config.merge_from(config);
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// 셸을 만들고 내장 명령(help, exit)을 등록한다.
    pub fn build(self) -> Result<Vorpal, VorpalError> {
        let ShellPorts {
            terminal,
            history,
            autocompleter,
            output,
            storage,
        } = self.ports;
        let config = self.config;

        let shell = Arc::new(Shell::new(terminal, history, autocompleter));
        shell.update_descriptors(|d| {
            d.title = config.title.clone();
            d.version = config.version.clone();
            d.description = config.description.clone();
            d.banner = config.banner.clone();
        });
        let session = Arc::new(Session::new(Arc::clone(&shell), output, true));
        session.set_delimiter(config.effective_delimiter());
        if let Some(id) = &config.history_id {
            shell.history.set_id(id);
        }

        let vorpal = Vorpal {
            inner: Arc::new(Inner {
                shell,
                session,
                sessions: Mutex::new(Vec::new()),
                queue: Mutex::new(QueueState::default()),
                settings: Mutex::new(Settings {
                    normalize_key_pairs: config.effective_normalize_key_pairs(),
                    fatal: config.effective_fatal(),
                }),
                storage: Mutex::new(None),
                storage_provider: storage,
                upstream: self.upstream,
            }),
        };

        if let Some(id) = &config.storage_id {
            vorpal.local_storage(id)?;
        }
        builtins::register(&vorpal)?;
        debug!(delimiter = %config.effective_delimiter(), "shell built");
        Ok(vorpal)
    }
}

impl Vorpal {
    pub fn builder(ports: ShellPorts) -> VorpalBuilder {
        VorpalBuilder {
            ports,
            config: ShellConfig::default(),
            upstream: None,
        }
    }

    // ---- 명령 등록 ----

    /// `"name <req> [opt...]"` 형태로 명령을 등록한다. 같은 이름은 교체된다.
    pub fn command(&self, registration: &str) -> CommandHandle {
        self.command_with(registration, None, CommandOptions::default())
    }

    pub fn command_with(
        &self,
        registration: &str,
        description: Option<&str>,
        options: CommandOptions,
    ) -> CommandHandle {
        let mut spec = CommandSpec::parse(registration);
        spec.description = description.map(str::to_string);
        spec.no_help = options.no_help;
        spec.kind = options.kind;
        let name = spec.name.clone();

        let registry = &self.inner.shell.registry;
        registry.register(Command::new(spec));
        self.inner
            .shell
            .emit(VorpalEvent::CommandRegistered { name: name.clone() });
        CommandHandle::new(Arc::clone(registry), name)
    }

    /// 모드 명령을 등록한다.
    pub fn mode(&self, registration: &str) -> CommandHandle {
        let options = CommandOptions {
            kind: CommandKind::Mode,
            ..CommandOptions::default()
        };
        self.command_with(registration, None, options)
    }

    /// 다른 명령이 매칭되지 않을 때 쓰이는 캐치올 명령을 등록한다.
    pub fn catch_all(&self, registration: &str) -> CommandHandle {
        let options = CommandOptions {
            kind: CommandKind::CatchAll,
            ..CommandOptions::default()
        };
        self.command_with(registration, None, options)
    }

    pub fn default_command(&self, registration: &str) -> CommandHandle {
        self.catch_all(registration)
    }

    pub fn find(&self, name: &str) -> Option<CommandHandle> {
        let registry = &self.inner.shell.registry;
        registry
            .find(name)
            .map(|c| CommandHandle::new(Arc::clone(registry), c.name().to_string()))
    }

    /// 등록된 명령 명세 목록.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.inner
            .shell
            .registry
            .snapshot()
            .iter()
            .map(|c| c.spec.clone())
            .collect()
    }

    // ---- 표시 정보 ----

    pub fn delimiter(&self, text: &str) -> &Self {
        self.inner.session.set_delimiter(text);
        self
    }

    /// 전체 명령 목록 렌더러를 바꾼다.
    pub fn help<F>(&self, render: F) -> &Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let render: HelpFn = Arc::new(render);
        self.inner.shell.set_custom_help(render);
        self
    }

    pub fn version(&self, text: &str) -> &Self {
        let text = text.to_string();
        self.inner.shell.update_descriptors(|d| d.version = Some(text));
        self
    }

    pub fn title(&self, text: &str) -> &Self {
        let text = text.to_string();
        self.inner.shell.update_descriptors(|d| d.title = Some(text));
        self
    }

    pub fn description(&self, text: &str) -> &Self {
        let text = text.to_string();
        self.inner
            .shell
            .update_descriptors(|d| d.description = Some(text));
        self
    }

    pub fn banner(&self, text: &str) -> &Self {
        let text = text.to_string();
        self.inner.shell.update_descriptors(|d| d.banner = Some(text));
        self
    }

    /// 전체 명령 목록 도움말 텍스트.
    pub fn command_help(&self, command: &str) -> String {
        self.inner.shell.command_help(command)
    }

    pub fn normalize_key_pairs(&self, enabled: bool) -> &Self {
        lock(&self.inner.settings).normalize_key_pairs = enabled;
        self
    }

    pub fn fatal(&self, enabled: bool) -> &Self {
        lock(&self.inner.settings).fatal = enabled;
        self
    }

    // ---- 실행 ----

    /// 로컬 세션에서 명령을 실행하고 결과를 기다린다.
    pub async fn exec(&self, command: &str) -> Result<Value, VorpalError> {
        self.exec_with(command, ExecOptions::default()).await
    }

    pub async fn exec_with(&self, command: &str, options: ExecOptions) -> Result<Value, VorpalError> {
        let session = self.target_session(options.session_id.as_deref())?;
        let (tx, rx) = oneshot::channel();
        self.enqueue(QueuedCommand {
            command: command.to_string(),
            session,
            overrides: options.args,
            reply: Reply::Promise(tx),
        });
        match rx.await {
            Ok(outcome) => Ok(outcome?),
            Err(_) => Err(CommandError::Action(anyhow!(
                "command `{command}` was dropped before completion"
            ))
            .into()),
        }
    }

    /// 결과를 콜백으로 받는다. 바로 반환한다.
    pub fn exec_callback<F>(&self, command: &str, callback: F)
    where
        F: FnOnce(CommandOutcome) + Send + 'static,
    {
        self.enqueue(QueuedCommand {
            command: command.to_string(),
            session: Arc::clone(&self.inner.session),
            overrides: ArgOverrides::default(),
            reply: Reply::Callback(Box::new(callback)),
        });
    }

    /// 현재 스레드에서 명령을 끝까지 실행한다. 파이프는 무시된다.
    /// 다른 명령이 실행 중이면 `QueueBusy`를 돌려준다.
    pub fn exec_sync(&self, command: &str, options: ExecOptions) -> Result<Value, VorpalError> {
        let session = self.target_session(options.session_id.as_deref())?;
        {
            let mut queue = lock(&self.inner.queue);
            if queue.current.is_some() {
                return Err(VorpalError::QueueBusy);
            }
            queue.current = Some(RunningHandle {
                command: command.to_string(),
                session: Arc::clone(&session),
            });
        }

        let outcome =
            futures::executor::block_on(self.execute_item(command, &session, &options.args, true));
        lock(&self.inner.queue).current = None;
        self.pump();

        let fatal = options.fatal || lock(&self.inner.settings).fatal;
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if fatal => Err(err.into()),
            Err(err) => Ok(Value::String(err.to_string())),
        }
    }

    /// 실행 중인 명령 집합을 취소한다. 취소 요청이 전달되면 true.
    pub fn cancel(&self) -> bool {
        let session = lock(&self.inner.queue)
            .current
            .as_ref()
            .map(|running| Arc::clone(&running.session));
        session.is_some_and(|s| s.cancel_commands())
    }

    /// 실행 중인 최상위 명령 원문.
    pub fn active_command(&self) -> Option<String> {
        lock(&self.inner.queue)
            .current
            .as_ref()
            .map(|running| running.command.clone())
    }

    pub fn currently_executing(&self) -> bool {
        lock(&self.inner.queue).current.is_some()
    }

    /// 대기 중인 큐 항목 수.
    pub fn queue_len(&self) -> usize {
        lock(&self.inner.queue).pending.len()
    }

    fn enqueue(&self, item: QueuedCommand) {
        trace!(command = %item.command, "command queued");
        lock(&self.inner.queue).pending.push_back(item);
        self.pump();
    }

    /// 실행 중인 항목이 없으면 큐 앞의 항목을 꺼내 실행한다.
    fn pump(&self) {
        let item = {
            let mut queue = lock(&self.inner.queue);
            if queue.current.is_some() {
                return;
            }
            let Some(item) = queue.pending.pop_front() else {
                return;
            };
            queue.current = Some(RunningHandle {
                command: item.command.clone(),
                session: Arc::clone(&item.session),
            });
            item
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(command = %item.command, "no async runtime; command rejected");
                lock(&self.inner.queue).current = None;
                let command = item.command.clone();
                item.reply.send(Err(CommandError::Action(anyhow!(
                    "no async runtime available to execute `{command}`"
                ))));
                return self.pump();
            }
        };

        let this = self.clone();
        runtime.spawn(async move {
            let QueuedCommand {
                command,
                session,
                overrides,
                reply,
            } = item;
            let outcome = this.execute_item(&command, &session, &overrides, false).await;
            lock(&this.inner.queue).current = None;
            reply.send(outcome);
            this.pump();
        });
    }

    /// 큐 항목 하나를 로컬 엔진 또는 상위 인스턴스에서 실행한다.
    async fn execute_item(
        &self,
        command: &str,
        session: &Arc<Session>,
        overrides: &ArgOverrides,
        sync: bool,
    ) -> CommandOutcome {
        if !session.is_local() {
            return match &self.inner.upstream {
                Some(upstream) => upstream
                    .execute(session.id(), command, overrides)
                    .await
                    .map_err(|err| CommandError::Remote(format!("{err:#}"))),
                None => Err(CommandError::Remote(format!(
                    "no upstream configured for session {}",
                    session.id()
                ))),
            };
        }

        let terminal = &self.inner.shell.terminal;
        let prompt_cancelled = terminal.is_mid_prompt();
        if prompt_cancelled {
            terminal.cancel_active_prompt();
        }

        let outcome = match self.prepare(command, session, overrides, sync) {
            Prepared::Run(set) => session.exec_command_set(set).await,
            Prepared::Finished(outcome) => outcome,
        };

        if prompt_cancelled {
            terminal.refresh_delimiter(&session.full_delimiter());
        }
        outcome
    }

    /// 입력을 해석/바인딩하고 모드/도움말 분기를 정한다.
    fn prepare(
        &self,
        raw: &str,
        session: &Arc<Session>,
        overrides: &ArgOverrides,
        sync: bool,
    ) -> Prepared {
        let shell = &self.inner.shell;
        let mode = session.mode();
        let text = mode.clone().unwrap_or_else(|| raw.to_string());
        shell.history.push_command(raw);

        let commands = shell.registry.snapshot();
        let resolved = resolve_command(&text, &commands);
        let Some(matched) = resolved.matched else {
            session.log(shell.command_help(&resolved.command));
            return Prepared::Finished(Ok(Value::String("Invalid command.".into())));
        };

        let normalize_key_pairs = lock(&self.inner.settings).normalize_key_pairs;
        let bind = BindOptions {
            normalize_key_pairs,
            overrides: Some(overrides),
        };
        let mut args = match bind_args(&resolved.match_args, &matched.spec, bind) {
            Ok(args) => args,
            Err(err) => return Prepared::Finished(self.bind_failure(session, err, &matched.spec)),
        };

        let mut pipes = Vec::new();
        if !sync {
            for segment in &resolved.pipes {
                let Some(found) = match_command(segment, commands.iter().map(|c| &c.spec)) else {
                    session.log(shell.command_help(segment));
                    return Prepared::Finished(Ok(Value::Null));
                };
                let object = Arc::clone(&commands[found.index]);
                match bind_args(&found.args, &object.spec, BindOptions::default()) {
                    Ok(args) => pipes.push(Invocation {
                        command: segment.clone(),
                        command_object: object,
                        args,
                    }),
                    Err(err) => {
                        return Prepared::Finished(self.bind_failure(session, err, &object.spec));
                    }
                }
            }
        }

        let mut run = matched.hooks.action.clone();
        let mut validate = matched.hooks.validate.clone();

        if args.wants_help() {
            match matched.hooks.help.clone() {
                Some(help) => {
                    run = Some(help_action(help, matched.spec.name.clone()));
                    validate = None;
                }
                None => {
                    session.log(help_information(&matched.spec));
                    return Prepared::Finished(Ok(Value::Null));
                }
            }
        }

        if matched.spec.is_mode() && mode.is_none() {
            session.set_mode(Some(resolved.command.clone()));
            run = matched.hooks.init.clone();
            validate = None;
            shell.history.enter_mode_scope();
            let delimiter = matched
                .spec
                .mode_delimiter
                .clone()
                .unwrap_or_else(|| format!("{}:", resolved.command));
            session.set_mode_delimiter(Some(&delimiter));
            debug!(mode = %resolved.command, "mode entered");
        } else if mode.is_some() {
            if raw.trim() == "exit" {
                self.exit_mode(session);
                return Prepared::Finished(Ok(Value::Null));
            }
            args = CommandArgs::from_mode_input(raw);
        }

        Prepared::Run(CommandSet {
            root: Invocation {
                command: resolved.command,
                command_object: matched,
                args,
            },
            run,
            validate,
            pipes,
        })
    }

    /// 바인딩 에러 메시지와 해당 명령 도움말을 출력하고, 메시지를 결과 데이터로 돌려준다.
    fn bind_failure(
        &self,
        session: &Session,
        err: BindError,
        spec: &CommandSpec,
    ) -> CommandOutcome {
        let message = err.to_string();
        session.log(&message);
        session.log(help_information(spec));
        Ok(Value::String(message))
    }

    fn exit_mode(&self, session: &Session) {
        let history = &self.inner.shell.history;
        session.set_mode(None);
        history.exit_mode_scope();
        session.set_mode_delimiter(None);
        debug!("mode exited");
        self.inner
            .shell
            .emit(VorpalEvent::ModeExit { last: history.peek() });
    }

    // ---- 세션 ----

    /// 로컬 세션.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.inner.session)
    }

    /// 출력 대상이 따로 있는 원격 세션을 연다. 실행은 `Upstream`으로 전달된다.
    pub fn open_remote_session(&self, output: Arc<dyn OutputSink>) -> Arc<Session> {
        let session = Arc::new(Session::new(Arc::clone(&self.inner.shell), output, false));
        lock(&self.inner.sessions).push(Arc::clone(&session));
        debug!(id = %session.id(), "remote session opened");
        session
    }

    pub fn get_session_by_id(&self, id: &str) -> Result<Arc<Session>, VorpalError> {
        if id.is_empty() {
            return Err(VorpalError::MissingSessionId);
        }
        if self.inner.session.id() == id {
            return Ok(self.session());
        }
        lock(&self.inner.sessions)
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| VorpalError::SessionNotFound(id.to_string()))
    }

    fn target_session(&self, id: Option<&str>) -> Result<Arc<Session>, VorpalError> {
        match id {
            Some(id) => self.get_session_by_id(id),
            None => Ok(self.session()),
        }
    }

    /// 로컬 세션 출력으로 한 줄을 보낸다.
    pub fn log(&self, line: impl AsRef<str>) {
        self.inner.session.log(line);
    }

    /// 로컬 터미널에 질문한다.
    pub async fn prompt(&self, question: PromptQuestion) -> anyhow::Result<String> {
        self.inner.session.prompt(question).await
    }

    pub fn exit_requested(&self) -> bool {
        self.inner.session.exit_requested()
    }

    // ---- 이벤트/키 입력 ----

    pub fn subscribe(&self) -> broadcast::Receiver<VorpalEvent> {
        self.inner.shell.subscribe()
    }

    /// 프롬프트에서 한 줄이 제출되었음을 알린다.
    pub fn notify_prompt_submit(&self, text: &str) {
        self.inner.shell.emit(VorpalEvent::ClientPromptSubmit {
            text: text.to_string(),
        });
    }

    /// 로컬 키 입력을 처리한다. 명령이 실행 중이면 무시한다.
    pub fn on_keypress(&self, key: Keypress, value: &str) -> Option<KeypressResult> {
        self.inner.shell.emit(VorpalEvent::Keypress {
            key,
            value: value.to_string(),
        });
        if self.currently_executing() || !self.inner.session.is_local() {
            return None;
        }
        self.inner.session.keypress(key, value)
    }

    // ---- 이력/로컬 저장소 ----

    pub fn history(&self) -> Arc<dyn CommandHistory> {
        Arc::clone(&self.inner.shell.history)
    }

    /// 이력 구분 id를 바꾼다.
    pub fn history_id(&self, id: &str) -> &Self {
        self.inner.shell.history.set_id(id);
        self
    }

    /// id에 해당하는 로컬 저장소를 연다. 이후 get/set/remove는 이 저장소를 쓴다.
    pub fn local_storage(&self, id: &str) -> Result<&Self, VorpalError> {
        if id.trim().is_empty() {
            return Err(VorpalError::MissingStorageId);
        }
        let store = self
            .inner
            .storage_provider
            .open(id)
            .map_err(VorpalError::Storage)?;
        *lock(&self.inner.storage) = Some(store);
        Ok(self)
    }

    fn store(&self) -> Result<Arc<dyn KeyValueStore>, VorpalError> {
        lock(&self.inner.storage)
            .clone()
            .ok_or(VorpalError::StorageNotInitialized)
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, VorpalError> {
        self.store()?.get_item(key).map_err(VorpalError::Storage)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), VorpalError> {
        self.store()?.set_item(key, value).map_err(VorpalError::Storage)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), VorpalError> {
        self.store()?.remove_item(key).map_err(VorpalError::Storage)
    }
}

/// 도움말 훅을 액션처럼 실행한다.
fn help_action(help: HelpFn, name: String) -> ActionFn {
    Arc::new(move |ctx: Arc<CommandInstance>, _args: CommandArgs| {
        ctx.log(help(&name));
        ActionHandle::ready(Value::Null)
    })
}
