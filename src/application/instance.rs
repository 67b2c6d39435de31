//! 명령 실행 한 번의 컨텍스트. 파이프 체인의 한 구간을 나타낸다.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::command::Command;
use super::events::VorpalEvent;
use super::ports::{Completion, PromptQuestion};
use super::registry::lock;
use super::session::Session;
use crate::domain::value::CommandArgs;

/// 실행 엔진이 함께 구동하는 작업을 넘기는 채널.
pub(crate) type Spawner = mpsc::UnboundedSender<BoxFuture<'static, ()>>;

/// 훅에 전달되는 실행 컨텍스트.
/// 출력은 다음 파이프 구간이 있으면 그 구간의 stdin으로, 없으면 세션으로 간다.
pub struct CommandInstance {
    command: String,
    command_object: Arc<Command>,
    args: Mutex<CommandArgs>,
    session: Arc<Session>,
    downstream: Option<Arc<CommandInstance>>,
    spawner: Option<Spawner>,
}

impl CommandInstance {
    pub(crate) fn new(
        command: String,
        command_object: Arc<Command>,
        args: CommandArgs,
        session: Arc<Session>,
        downstream: Option<Arc<CommandInstance>>,
        spawner: Option<Spawner>,
    ) -> Self {
        Self {
            command,
            command_object,
            args: Mutex::new(args),
            session,
            downstream,
            spawner,
        }
    }

    /// 이 구간의 명령 원문.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn command_object(&self) -> &Arc<Command> {
        &self.command_object
    }

    pub fn args(&self) -> CommandArgs {
        lock(&self.args).clone()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn downstream(&self) -> Option<&Arc<CommandInstance>> {
        self.downstream.as_ref()
    }

    /// 한 줄을 출력한다.
    pub fn log(&self, line: impl fmt::Display) {
        self.log_lines(vec![line.to_string()]);
    }

    /// 여러 값을 출력한다. 다음 구간이 있으면 그 구간의 액션을 stdin과 함께 실행한다.
    pub fn log_lines(&self, lines: Vec<String>) {
        let Some(downstream) = &self.downstream else {
            self.session.log(lines.join(" "));
            return;
        };

        let Some(action) = downstream.command_object.hooks.action.clone() else {
            trace!(command = %downstream.command, "downstream has no action; output dropped");
            return;
        };

        let pending = self.session.register_command();
        let args = {
            let mut args = lock(&downstream.args);
            args.stdin = Some(lines);
            args.clone()
        };

        if let Some(validate) = &downstream.command_object.hooks.validate
            && let Err(err) = validate(downstream, &args)
        {
            self.session.log(err.to_string());
            pending.complete();
            return;
        }

        let handle = action(Arc::clone(downstream), args);
        let session = Arc::clone(&self.session);
        let command = downstream.command.clone();
        self.spawn(async move {
            if let Err(err) = handle.future.await
                && session.is_local()
            {
                let message = format!("{err:#}");
                session.log(message.clone());
                session.shell().emit(VorpalEvent::ClientCommandError {
                    command,
                    error: message,
                });
            }
            pending.complete();
        });
    }

    /// 명령 집합과 함께 구동될 작업을 등록한다. 집합이 먼저 끝나거나 엔진 밖이면
    /// tokio 런타임에 맡긴다.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let future = future.boxed();
        let future = match &self.spawner {
            Some(spawner) => match spawner.send(future) {
                Ok(()) => return,
                Err(returned) => returned.0,
            },
            None => future,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(future);
            }
            Err(_) => warn!(command = %self.command, "no runtime available; task dropped"),
        }
    }

    /// 이 인스턴스의 세션을 대신해 터미널에 질문한다.
    pub async fn prompt(&self, question: PromptQuestion) -> Result<String> {
        self.session.prompt(question).await
    }

    /// 세션 구분자를 바꾼다.
    pub fn delimiter(&self, text: &str) {
        self.session.set_delimiter(text);
    }

    /// 전체 명령 도움말을 출력한다.
    pub fn help(&self, command: &str) {
        self.session.help(command);
    }

    /// 후보 목록에서 `partial`의 자동완성 결과를 찾는다.
    pub fn match_candidates(&self, partial: &str, candidates: &[String]) -> Option<Completion> {
        self.session.match_candidates(partial, candidates)
    }

    /// 실행 중인 명령 집합의 취소를 요청한다.
    pub fn cancel(&self) {
        self.session.cancel_commands();
    }
}

impl fmt::Debug for CommandInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInstance")
            .field("command", &self.command)
            .field("downstream", &self.downstream.as_ref().map(|d| d.command.clone()))
            .finish()
    }
}
