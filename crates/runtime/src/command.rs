use crate::error::CommandError;
use crate::program::Program;
use bus::{InFlightGuard, MessageSender};

/// Side effect requested by `initialize` or `update`.
///
/// Navigation variants are handled by the runtime itself; `Effect` values are
/// opaque to it and forwarded to a [`CommandExecutor`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command<E> {
    None,
    Batch(Vec<Command<E>>),
    PushState(String),
    ReplaceState(String),
    Load(String),
    Effect(E),
}

impl<E> Default for Command<E> {
    fn default() -> Self {
        Command::None
    }
}

impl<E> Command<E> {
    pub fn none() -> Self {
        Command::None
    }

    pub fn effect(effect: E) -> Self {
        Command::Effect(effect)
    }

    pub fn push_state(url: impl Into<String>) -> Self {
        Command::PushState(url.into())
    }

    pub fn replace_state(url: impl Into<String>) -> Self {
        Command::ReplaceState(url.into())
    }

    pub fn load(url: impl Into<String>) -> Self {
        Command::Load(url.into())
    }

    /// Sequence `commands`, flattening nested batches and dropping `None`s.
    pub fn batch(commands: impl IntoIterator<Item = Command<E>>) -> Self {
        let mut flat = Vec::new();
        for command in commands {
            command.flatten_into(&mut flat);
        }
        if flat.len() > 1 {
            return Command::Batch(flat);
        }
        flat.pop().unwrap_or_default()
    }

    fn flatten_into(self, out: &mut Vec<Command<E>>) {
        match self {
            Command::None => {}
            Command::Batch(commands) => {
                for command in commands {
                    command.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }
}

/// Handed to an executor with every effect. The effect counts as in flight
/// until the context is dropped, so executors that finish asynchronously move
/// it into their worker and drop it after their last `send`.
pub struct CommandContext<M> {
    sender: MessageSender<M>,
    _in_flight: InFlightGuard,
}

impl<M> CommandContext<M> {
    pub(crate) fn new(sender: MessageSender<M>, in_flight: InFlightGuard) -> Self {
        Self {
            sender,
            _in_flight: in_flight,
        }
    }

    pub fn send(&self, message: M) -> Result<(), CommandError> {
        self.sender.send(message).map_err(|_| CommandError::Disconnected)
    }

    /// Extra producer handle that outlives the context, e.g. for a subscription.
    pub fn sender(&self) -> MessageSender<M> {
        self.sender.clone()
    }
}

/// Runs the opaque effects of a program.
///
/// Returning an error (or panicking) is caught at the dispatch boundary and
/// reported to the program through `Program::on_command_failed`.
pub trait CommandExecutor<P: Program> {
    fn execute(
        &mut self,
        effect: P::Effect,
        context: CommandContext<P::Message>,
    ) -> Result<(), CommandError>;
}

impl<P, F> CommandExecutor<P> for F
where
    P: Program,
    F: FnMut(P::Effect, CommandContext<P::Message>) -> Result<(), CommandError>,
{
    fn execute(
        &mut self,
        effect: P::Effect,
        context: CommandContext<P::Message>,
    ) -> Result<(), CommandError> {
        self(effect, context)
    }
}

/// Executor for programs whose effects are never issued.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEffects;

impl<P: Program> CommandExecutor<P> for NoEffects {
    fn execute(
        &mut self,
        _effect: P::Effect,
        _context: CommandContext<P::Message>,
    ) -> Result<(), CommandError> {
        log::warn!(target: "mvu.runtime", "effect dropped: no executor installed");
        Ok(())
    }
}
