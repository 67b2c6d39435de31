//! 세션과 명령 인스턴스가 공유하는 기능 묶음.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::command::HelpFn;
use super::events::VorpalEvent;
use super::ports::{Autocompleter, CommandHistory, Terminal};
use super::registry::{CommandRegistry, lock};
use crate::domain::help::{Descriptors, command_help};
use crate::domain::spec::CommandSpec;

const EVENT_CAPACITY: usize = 256;

pub struct Shell {
    pub(crate) registry: Arc<CommandRegistry>,
    pub(crate) terminal: Arc<dyn Terminal>,
    pub(crate) history: Arc<dyn CommandHistory>,
    pub(crate) autocompleter: Arc<dyn Autocompleter>,
    events: broadcast::Sender<VorpalEvent>,
    descriptors: Mutex<Descriptors>,
    custom_help: Mutex<Option<HelpFn>>,
}

impl Shell {
    pub(crate) fn new(
        terminal: Arc<dyn Terminal>,
        history: Arc<dyn CommandHistory>,
        autocompleter: Arc<dyn Autocompleter>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry: Arc::new(CommandRegistry::new()),
            terminal,
            history,
            autocompleter,
            events,
            descriptors: Mutex::new(Descriptors::default()),
            custom_help: Mutex::new(None),
        }
    }

    /// 구독자가 없어도 실패로 보지 않는다.
    pub(crate) fn emit(&self, event: VorpalEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<VorpalEvent> {
        self.events.subscribe()
    }

    pub(crate) fn update_descriptors(&self, apply: impl FnOnce(&mut Descriptors)) {
        apply(&mut lock(&self.descriptors));
    }

    pub(crate) fn descriptors(&self) -> Descriptors {
        lock(&self.descriptors).clone()
    }

    pub(crate) fn set_custom_help(&self, help: HelpFn) {
        *lock(&self.custom_help) = Some(help);
    }

    /// 전체 명령 목록 도움말. 사용자 렌더러가 있으면 그것을 쓴다.
    pub(crate) fn command_help(&self, command: &str) -> String {
        let commands = self.registry.snapshot();
        if commands.is_empty() {
            return String::new();
        }
        let custom = lock(&self.custom_help).clone();
        if let Some(render) = custom {
            return render(command);
        }
        let specs: Vec<&CommandSpec> = commands.iter().map(|c| &c.spec).collect();
        command_help(
            &specs,
            Some(command),
            &self.descriptors(),
            self.terminal.screen_size(),
        )
    }
}
