//! The event/command loop.
//!
//! One consumer drains a FIFO mailbox. Each message runs a full cycle before
//! the next is dequeued:
//!
//! 1. dequeue
//! 2. `update(message, model)`
//! 3. `view(model')`
//! 4. align the fresh tree against the live tree
//! 5. diff and apply every patch (plus title and head changes)
//! 6. commit the aligned tree and the new model
//! 7. dispatch the command
//!
//! Navigation commands run inline and enqueue the url-changed message before
//! the next sub-command of a batch; effects go to the executor, whose failures
//! come back as messages.

use crate::apply::apply_patch;
use crate::command::{Command, CommandContext, CommandExecutor};
use crate::config::RuntimeConfig;
use crate::error::{CommandError, RuntimeError};
use crate::program::Program;
use crate::registry::{EventSink, HandlerRegistry};
use bus::{Mailbox, MessageSender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use surface::Surface;
use url::Url;
use vdom::{HeadContent, IdAllocator, Node, align, diff, diff_head};

struct Live<P: Program> {
    model: P::Model,
    body: Node<P::Message>,
    title: String,
    head: Vec<HeadContent>,
}

pub struct Runtime<P: Program, S, X> {
    config: RuntimeConfig,
    surface: S,
    executor: X,
    mailbox: Mailbox<P::Message>,
    registry: HandlerRegistry<P::Message>,
    ids: IdAllocator,
    live: Option<Live<P>>,
    processed: u64,
}

impl<P, S, X> Runtime<P, S, X>
where
    P: Program,
    S: Surface<P::Message>,
    X: CommandExecutor<P>,
{
    pub fn new(surface: S, executor: X, config: RuntimeConfig) -> Self {
        Self {
            config,
            surface,
            executor,
            mailbox: Mailbox::new(),
            registry: HandlerRegistry::new(),
            ids: IdAllocator::new(),
            live: None,
            processed: 0,
        }
    }

    pub fn sender(&self) -> MessageSender<P::Message> {
        self.mailbox.sender()
    }

    pub fn event_sink(&self) -> EventSink<P::Message> {
        self.registry.sink(self.mailbox.sender())
    }

    pub fn registry(&self) -> &HandlerRegistry<P::Message> {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn model(&self) -> Option<&P::Model> {
        self.live.as_ref().map(|live| &live.model)
    }

    pub fn live_tree(&self) -> Option<&Node<P::Message>> {
        self.live.as_ref().map(|live| &live.body)
    }

    /// Messages fully processed since start.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Bootstrap cycle: initialize, render onto the empty surface, dispatch
    /// the initial command.
    pub fn start(&mut self, flags: P::Flags) -> Result<(), RuntimeError> {
        if self.live.is_some() {
            return Err(RuntimeError::AlreadyStarted);
        }
        let url = self.surface.current_url().clone();
        let (model, command) = P::initialize(&url, flags);
        let document = P::view(&model);
        let body = align(None, document.body, &mut self.ids);

        let from = self.surface.version();
        let handle = self.surface.render_initial(&body)?;
        self.registry.register_subtree(&body)?;
        self.surface.set_title(&document.title);
        for patch in diff_head(&[], &document.head) {
            self.surface.apply_head(&patch)?;
        }
        self.surface.bump_version(from, from.next())?;
        log::info!(
            target: "mvu.runtime",
            "started at {url} on {handle:?} with {} handlers",
            self.registry.len()
        );

        self.live = Some(Live {
            model,
            body,
            title: document.title,
            head: document.head,
        });
        self.dispatch(command)
    }

    /// Process one queued message if there is one.
    pub fn step(&mut self) -> Result<bool, RuntimeError> {
        match self.mailbox.try_next() {
            Some(message) => {
                self.process(message)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one full cycle for `message`, bypassing the queue.
    pub fn process(&mut self, message: P::Message) -> Result<(), RuntimeError> {
        let live = self.live.as_ref().ok_or(RuntimeError::NotStarted)?;
        log::debug!(target: "mvu.runtime", "update {message:?}");
        let (model, command) = P::update(message, &live.model);
        self.render(model)?;
        self.processed += 1;
        self.dispatch(command)
    }

    /// Block until every external sender is gone and nothing is queued or in
    /// flight.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let poll = self.config.poll_interval();
        loop {
            if let Some(message) = self.mailbox.next_timeout(poll) {
                self.process(message)?;
                continue;
            }
            if self.mailbox.sender_count() == 0 && self.mailbox.in_flight().is_idle() {
                match self.mailbox.try_next() {
                    Some(message) => self.process(message)?,
                    None => return Ok(()),
                }
            }
        }
    }

    /// Drain until the queue is empty and no command is in flight. Returns the
    /// number of messages processed.
    pub fn run_until_quiescent(&mut self) -> Result<usize, RuntimeError> {
        let poll = self.config.poll_interval();
        let limit = self.config.max_messages;
        let mut processed = 0;
        while let Some(message) = self.mailbox.next_or_quiescent(poll) {
            if processed == limit {
                return Err(RuntimeError::MessageLimit { limit });
            }
            self.process(message)?;
            processed += 1;
        }
        log::debug!(target: "mvu.runtime", "quiescent after {processed} messages");
        Ok(processed)
    }

    fn render(&mut self, model: P::Model) -> Result<(), RuntimeError> {
        let live = self.live.as_mut().ok_or(RuntimeError::NotStarted)?;
        let document = P::view(&model);
        let aligned = align(Some(&live.body), document.body, &mut self.ids);
        let patches = diff(&live.body, &aligned);

        let from = self.surface.version();
        for patch in &patches {
            if self.config.trace_patches {
                log::debug!(target: "mvu.apply", "{} {patch:?}", patch.label());
            }
            apply_patch(&mut self.surface, &self.registry, patch)?;
        }
        if document.title != live.title {
            self.surface.set_title(&document.title);
        }
        for patch in diff_head(&live.head, &document.head) {
            self.surface.apply_head(&patch)?;
        }
        self.surface.bump_version(from, from.next())?;
        log::trace!(
            target: "mvu.runtime",
            "{} patches applied, surface at {}",
            patches.len(),
            self.surface.version()
        );

        live.body = aligned;
        live.model = model;
        live.title = document.title;
        live.head = document.head;
        Ok(())
    }

    fn dispatch(&mut self, command: Command<P::Effect>) -> Result<(), RuntimeError> {
        match command {
            Command::None => Ok(()),
            Command::Batch(commands) => {
                for command in commands {
                    self.dispatch(command)?;
                }
                Ok(())
            }
            Command::PushState(url) => {
                let url = self.surface.push_url(&url)?;
                self.url_changed(&url);
                Ok(())
            }
            Command::ReplaceState(url) => {
                let url = self.surface.replace_url(&url)?;
                self.url_changed(&url);
                Ok(())
            }
            Command::Load(url) => {
                self.surface.load_url(&url)?;
                Ok(())
            }
            Command::Effect(effect) => {
                self.execute(effect);
                Ok(())
            }
        }
    }

    fn url_changed(&self, url: &Url) {
        log::debug!(target: "mvu.runtime", "url changed to {url}");
        self.mailbox.post(P::on_url_changed(url));
    }

    fn execute(&mut self, effect: P::Effect) {
        let context = CommandContext::new(self.mailbox.sender(), self.mailbox.in_flight().guard());
        let executor = &mut self.executor;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(effect, context)));
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => CommandError::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };
        log::warn!(target: "mvu.runtime", "{error}");
        self.mailbox.post(P::on_command_failed(error));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
