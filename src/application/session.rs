//! 세션과 명령 집합 실행 엔진.
//!
//! 한 세션에서 동시에 실행되는 명령 집합은 하나뿐이다. 루트 명령이 등록 수 1로
//! 시작하고, 파이프 하류가 `register_command`로 받은 약속을 끝낼 때까지 완료를 미룬다.
//! 완료 수가 등록 수를 따라잡는 첫 순간에 집합 전체가 한 번 완료된다.
//! 약속은 집합 세대에 묶이므로 앞선 집합의 늦은 완료는 다음 집합에 섞이지 않는다.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};

use super::command::{ActionFn, Cancellable, Command, ValidateFn};
use super::config::DEFAULT_DELIMITER;
use super::error::CommandError;
use super::events::{Keypress, VorpalEvent};
use super::instance::CommandInstance;
use super::ports::{Completion, OutputSink, PromptQuestion};
use super::registry::lock;
use super::shell::Shell;
use crate::domain::spec::CommandSpec;
use crate::domain::value::CommandArgs;

/// 명령 집합 하나의 결과. 데이터가 없으면 `Value::Null`.
pub type CommandOutcome = Result<Value, CommandError>;

/// 바인딩이 끝난 파이프 구간 하나.
pub(crate) struct Invocation {
    pub command: String,
    pub command_object: Arc<Command>,
    pub args: CommandArgs,
}

/// 실행 준비가 끝난 명령 집합.
pub(crate) struct CommandSet {
    pub root: Invocation,
    /// 루트에서 실제로 실행할 함수. 액션, 모드 init, 도움말 훅 중 하나.
    pub run: Option<ActionFn>,
    pub validate: Option<ValidateFn>,
    pub pipes: Vec<Invocation>,
}

/// 키 입력 처리 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypressResult {
    /// 입력 줄을 이 문자열로 바꾼다.
    Replace(String),
    /// 후보 목록을 보여준다.
    Suggestions(Vec<String>),
}

struct SessionState {
    delimiter: String,
    mode_delimiter: Option<String>,
    mode: Option<String>,
    generation: u64,
    registered: usize,
    completed: usize,
    response: Option<CommandOutcome>,
    completion_tx: Option<oneshot::Sender<CommandOutcome>>,
    cancel_tx: Option<watch::Sender<bool>>,
    tab_count: usize,
    exit_requested: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            delimiter: format!("{DEFAULT_DELIMITER} "),
            mode_delimiter: None,
            mode: None,
            generation: 0,
            registered: 0,
            completed: 0,
            response: None,
            completion_tx: None,
            cancel_tx: None,
            tab_count: 0,
            exit_requested: false,
        }
    }
}

/// `Session::register_command`가 돌려주는 완료 약속. 등록한 명령 집합에만 묶인다.
/// `complete`하거나 버리면 완료 하나로 센다. 이미 끝난 집합의 약속은 무시된다.
#[must_use = "the command set stays open until this is completed or dropped"]
pub struct PendingCommand {
    session: Arc<Session>,
    generation: u64,
}

impl PendingCommand {
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for PendingCommand {
    fn drop(&mut self) {
        self.session.complete_for(self.generation, None);
    }
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("generation", &self.generation)
            .finish()
    }
}

enum Settled {
    Done(CommandOutcome),
    Cancelled,
}

/// 로컬 터미널 또는 원격 피어 하나의 대화 컨텍스트.
pub struct Session {
    id: String,
    local: bool,
    shell: Arc<Shell>,
    output: Arc<dyn OutputSink>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(shell: Arc<Shell>, output: Arc<dyn OutputSink>, local: bool) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            local,
            shell,
            output,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub(crate) fn shell(&self) -> &Arc<Shell> {
        &self.shell
    }

    /// 세션 출력으로 한 줄을 보낸다.
    pub fn log(&self, line: impl AsRef<str>) {
        self.output.write_line(line.as_ref());
    }

    pub async fn prompt(&self, question: PromptQuestion) -> Result<String> {
        self.shell.terminal.prompt(&question).await
    }

    pub fn delimiter(&self) -> String {
        lock(&self.state).delimiter.clone()
    }

    /// 구분자 + 모드 구분자.
    pub fn full_delimiter(&self) -> String {
        let state = lock(&self.state);
        match &state.mode_delimiter {
            Some(mode) => format!("{}{mode}", state.delimiter),
            None => state.delimiter.clone(),
        }
    }

    pub fn set_delimiter(&self, text: &str) {
        lock(&self.state).delimiter = format!("{} ", text.trim());
        self.refresh();
    }

    pub fn mode_delimiter(&self) -> Option<String> {
        lock(&self.state).mode_delimiter.clone()
    }

    /// `None`이면 모드 구분자를 지운다.
    pub fn set_mode_delimiter(&self, text: Option<&str>) {
        lock(&self.state).mode_delimiter = text.map(|t| format!("{} ", t.trim()));
        self.refresh();
    }

    fn refresh(&self) {
        if self.local {
            self.shell.terminal.refresh_delimiter(&self.full_delimiter());
        }
    }

    /// 현재 모드 명령 원문. 모드 밖이면 `None`.
    pub fn mode(&self) -> Option<String> {
        lock(&self.state).mode.clone()
    }

    pub(crate) fn set_mode(&self, mode: Option<String>) {
        lock(&self.state).mode = mode;
    }

    pub fn help(&self, command: &str) {
        self.log(self.shell.command_help(command));
    }

    pub fn match_candidates(&self, partial: &str, candidates: &[String]) -> Option<Completion> {
        self.shell.autocompleter.match_candidates(partial, candidates)
    }

    pub fn exit_requested(&self) -> bool {
        lock(&self.state).exit_requested
    }

    pub(crate) fn request_exit(&self) {
        lock(&self.state).exit_requested = true;
    }

    /// 완료를 미룰 명령 하나를 실행 중인 집합에 등록한다.
    /// 실행 중인 집합이 없으면 아무것도 세지 않는 약속을 돌려준다.
    pub fn register_command(self: &Arc<Self>) -> PendingCommand {
        let mut state = lock(&self.state);
        if state.completion_tx.is_some() {
            state.registered += 1;
        }
        PendingCommand {
            session: Arc::clone(self),
            generation: state.generation,
        }
    }

    /// `generation` 집합의 완료 하나를 센다. 모두 완료되면 집합을 끝낸다.
    fn complete_for(&self, generation: u64, response: Option<CommandOutcome>) {
        let mut state = lock(&self.state);
        if state.generation != generation || state.completion_tx.is_none() {
            trace!(generation, current = state.generation, "stale completion ignored");
            return;
        }
        if response.is_some() {
            state.response = response;
        }
        state.completed += 1;
        if state.registered > state.completed {
            return;
        }
        state.registered = 0;
        state.completed = 0;
        let response = state.response.take().unwrap_or(Ok(Value::Null));
        if let Some(tx) = state.completion_tx.take() {
            let _ = tx.send(response);
        }
    }

    /// 현재 (registered, completed) 카운터.
    pub fn command_counts(&self) -> (usize, usize) {
        let state = lock(&self.state);
        (state.registered, state.completed)
    }

    /// 실행 중인 명령 집합에 취소를 요청한다. 요청이 전달되면 true.
    pub fn cancel_commands(&self) -> bool {
        let state = lock(&self.state);
        match &state.cancel_tx {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }


    /// 명령 집합을 실행하고 집계된 결과 하나를 돌려준다.
    pub(crate) async fn exec_command_set(self: &Arc<Self>, set: CommandSet) -> CommandOutcome {
        let (done_tx, mut done_rx) = oneshot::channel();
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel::<BoxFuture<'static, ()>>();
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.registered = 1;
            state.completed = 0;
            state.response = None;
            state.completion_tx = Some(done_tx);
            state.cancel_tx = Some(cancel_tx);
            state.generation
        };

        let CommandSet {
            root,
            run,
            validate,
            pipes,
        } = set;
        let command = root.command.clone();
        debug!(command = %command, pipes = pipes.len(), "command set started");

        let mut downstream = None;
        for pipe in pipes.into_iter().rev() {
            downstream = Some(Arc::new(CommandInstance::new(
                pipe.command,
                pipe.command_object,
                pipe.args,
                Arc::clone(self),
                downstream,
                Some(spawn_tx.clone()),
            )));
        }

        let mut args = root.args;
        args.raw_command = Some(root.command.clone());
        let instance = Arc::new(CommandInstance::new(
            root.command,
            root.command_object,
            args.clone(),
            Arc::clone(self),
            downstream,
            Some(spawn_tx),
        ));

        let mut tasks: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();
        let mut canceller: Option<Arc<dyn Cancellable>> = None;

        let rejected = validate.and_then(|validate| validate(&instance, &args).err());
        if let Some(err) = rejected {
            self.complete_for(
                generation,
                Some(Err(CommandError::Validation(err.to_string()))),
            );
        } else if let Some(run) = run {
            let handle = run(Arc::clone(&instance), args);
            canceller = handle.canceller;
            let session = Arc::clone(self);
            let future = handle.future;
            tasks.push(Box::pin(async move {
                let outcome = future.await.map_err(CommandError::from);
                session.complete_for(generation, Some(outcome));
            }));
        } else {
            self.complete_for(generation, Some(Ok(Value::Null)));
        }

        let mut cancel_open = true;
        let settled = loop {
            tokio::select! {
                biased;
                outcome = &mut done_rx => break Settled::Done(outcome.unwrap_or(Ok(Value::Null))),
                changed = cancel_rx.changed(), if cancel_open => match changed {
                    Ok(()) if *cancel_rx.borrow() => break Settled::Cancelled,
                    Ok(()) => {}
                    Err(_) => cancel_open = false,
                },
                Some(task) = spawn_rx.recv() => tasks.push(task),
                Some(()) = tasks.next(), if !tasks.is_empty() => {}
            }
        };

        match settled {
            Settled::Done(outcome) => {
                spawn_rx.close();
                while let Ok(task) = spawn_rx.try_recv() {
                    tasks.push(task);
                }
                if !tasks.is_empty() {
                    match tokio::runtime::Handle::try_current() {
                        Ok(runtime) => {
                            for task in tasks {
                                runtime.spawn(task);
                            }
                        }
                        Err(_) => warn!(command = %command, "detached tasks dropped without a runtime"),
                    }
                }
                self.finish(&instance, &command, &outcome);
                outcome
            }
            Settled::Cancelled => {
                self.cancel_chain(&instance, canceller.as_deref());
                {
                    let mut state = lock(&self.state);
                    state.completion_tx = None;
                    state.cancel_tx = None;
                    state.response = None;
                    state.registered = 0;
                    state.completed = 0;
                }
                debug!(command = %command, "command set cancelled");
                self.shell.emit(VorpalEvent::ClientCommandCancelled { command });
                Ok(Value::Null)
            }
        }
    }

    fn finish(&self, root: &CommandInstance, command: &str, outcome: &CommandOutcome) {
        if self.local {
            match outcome {
                Err(err) => {
                    let message = err.to_string();
                    self.log(&message);
                    self.shell.emit(VorpalEvent::ClientCommandError {
                        command: command.to_string(),
                        error: message,
                    });
                }
                Ok(_) => self.shell.emit(VorpalEvent::ClientCommandExecuted {
                    command: command.to_string(),
                }),
            }
        }

        let mut current = Some(root);
        while let Some(instance) = current {
            if let Some(done) = &instance.command_object().hooks.done {
                done(instance);
            }
            current = instance.downstream().map(Arc::as_ref);
        }
        if let Some(after) = &root.command_object().hooks.after {
            after(root);
        }

        lock(&self.state).cancel_tx = None;
        debug!(command, ok = outcome.is_ok(), "command set finished");
    }

    /// 루트부터 하류 방향으로 cancel 훅을 부르고, 액션의 취소 수단을 실행한다.
    fn cancel_chain(&self, root: &CommandInstance, canceller: Option<&dyn Cancellable>) {
        let mut current = Some(root);
        while let Some(instance) = current {
            if let Some(cancel) = &instance.command_object().hooks.cancel {
                trace!(command = %instance.command(), "cancel hook");
                cancel(instance);
            }
            current = instance.downstream().map(Arc::as_ref);
        }
        if let Some(canceller) = canceller {
            canceller.cancel(root);
        }
    }

    /// 키 입력을 이력/자동완성으로 연결한다. Tab 이외의 키는 탭 카운터를 초기화한다.
    pub fn keypress(&self, key: Keypress, value: &str) -> Option<KeypressResult> {
        if key != Keypress::Tab {
            lock(&self.state).tab_count = 0;
        }
        match key {
            Keypress::Up => self.shell.history.previous().map(KeypressResult::Replace),
            Keypress::Down => self.shell.history.next().map(KeypressResult::Replace),
            Keypress::Tab => {
                let commands = self.shell.registry.snapshot();
                let specs: Vec<&CommandSpec> = commands.iter().map(|c| &c.spec).collect();
                let completion = self.shell.autocompleter.complete(value, &specs);
                let mut state = lock(&self.state);
                match completion {
                    Some(Completion::Candidates(candidates)) => {
                        state.tab_count += 1;
                        (state.tab_count > 1 && !candidates.is_empty())
                            .then_some(KeypressResult::Suggestions(candidates))
                    }
                    Some(Completion::Line(line)) => {
                        state.tab_count = 0;
                        Some(KeypressResult::Replace(line))
                    }
                    None => {
                        state.tab_count = 0;
                        None
                    }
                }
            }
            Keypress::Other => None,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("local", &self.local)
            .finish()
    }
}
