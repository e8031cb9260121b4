use crate::command::Command;
use crate::error::CommandError;
use std::fmt::Debug;
use url::Url;
use vdom::Document;

/// An MVU application.
///
/// All functions are pure: the runtime owns the model, the live tree and the
/// surface, and threads the model through `update` and `view`.
pub trait Program: 'static {
    type Model;
    /// Messages flow through the queue and sit in the handler table, which
    /// other threads read while reporting events.
    type Message: Clone + PartialEq + Debug + Send + Sync + 'static;
    /// Opaque effects forwarded to a [`CommandExecutor`](crate::CommandExecutor).
    type Effect;
    type Flags;

    fn initialize(url: &Url, flags: Self::Flags) -> (Self::Model, Command<Self::Effect>);

    fn update(message: Self::Message, model: &Self::Model) -> (Self::Model, Command<Self::Effect>);

    fn view(model: &Self::Model) -> Document<Self::Message>;

    /// Message synthesized after a `PushState` or `ReplaceState` changed the URL.
    fn on_url_changed(url: &Url) -> Self::Message;

    /// Message synthesized when an executor reports an error or panics.
    fn on_command_failed(error: CommandError) -> Self::Message;
}
