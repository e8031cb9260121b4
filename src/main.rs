//! Headless demo host: runs a small sign-in app on the in-memory surface,
//! clicks through it and prints the resulting document.

use runtime::{
    Command, CommandContext, CommandError, DispatchOutcome, Program, Runtime, RuntimeConfig,
};
use std::env;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use surface::{DocumentHost, MemorySurface};
use url::Url;
use vdom::builder::{element, keyed_text};
use vdom::{Document, HeadContent, Node, NodeId};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone, Debug, PartialEq)]
enum Msg {
    SignIn,
    SignedIn(String),
    SignOut,
    UrlChanged(String),
    Failed(String),
}

#[derive(Debug)]
enum Effect {
    /// Pretend to call an auth backend from a worker thread.
    Authenticate,
}

#[derive(Debug, Default)]
struct Model {
    user: Option<String>,
    pending: bool,
    path: String,
    errors: Vec<String>,
}

struct Demo;

impl Program for Demo {
    type Model = Model;
    type Message = Msg;
    type Effect = Effect;
    type Flags = ();

    fn initialize(url: &Url, _flags: ()) -> (Model, Command<Effect>) {
        let model = Model {
            path: url.path().to_string(),
            ..Model::default()
        };
        (model, Command::none())
    }

    fn update(message: Msg, model: &Model) -> (Model, Command<Effect>) {
        match message {
            Msg::SignIn => (
                Model {
                    pending: true,
                    path: model.path.clone(),
                    errors: model.errors.clone(),
                    ..Model::default()
                },
                Command::effect(Effect::Authenticate),
            ),
            Msg::SignedIn(user) => {
                let target = format!("/profile/{user}");
                let next = Model {
                    user: Some(user),
                    pending: false,
                    path: model.path.clone(),
                    errors: model.errors.clone(),
                };
                (next, Command::push_state(target))
            }
            Msg::SignOut => (
                Model {
                    path: model.path.clone(),
                    errors: model.errors.clone(),
                    ..Model::default()
                },
                Command::replace_state("/"),
            ),
            Msg::UrlChanged(path) => (
                Model {
                    user: model.user.clone(),
                    pending: model.pending,
                    path,
                    errors: model.errors.clone(),
                },
                Command::none(),
            ),
            Msg::Failed(error) => {
                let mut errors = model.errors.clone();
                errors.push(error);
                (
                    Model {
                        user: model.user.clone(),
                        pending: false,
                        path: model.path.clone(),
                        errors,
                    },
                    Command::none(),
                )
            }
        }
    }

    fn view(model: &Model) -> Document<Msg> {
        let mut nav = element("ul")
            .key("nav")
            .child(nav_item("nav-home", "Home", None));
        nav = match &model.user {
            Some(user) => nav
                .child(nav_item(&format!("nav-profile-{user}"), user, None))
                .child(nav_item("nav-sign-out", "Sign out", Some(Msg::SignOut))),
            None if model.pending => nav.child(nav_item("nav-pending", "Signing in", None)),
            None => nav.child(nav_item("nav-sign-in", "Sign in", Some(Msg::SignIn))),
        };

        let body = element("div")
            .key("app")
            .child(nav)
            .child(keyed_text("path", format!("at {}", model.path)))
            .build();
        let title = match &model.user {
            Some(user) => format!("{user} | Demo"),
            None => "Demo".to_string(),
        };
        Document::new(title, body).with_head(vec![
            HeadContent::meta("description", "MVU demo"),
            HeadContent::link("canonical", model.path.clone()),
        ])
    }

    fn on_url_changed(url: &Url) -> Msg {
        Msg::UrlChanged(url.path().to_string())
    }

    fn on_command_failed(error: CommandError) -> Msg {
        Msg::Failed(error.to_string())
    }
}

fn nav_item(key: &str, label: &str, on_click: Option<Msg>) -> Node<Msg> {
    let mut item = element("li").key(key).attr("class", "nav-item");
    if let Some(message) = on_click {
        item = item.on("click", message);
    }
    item.child(keyed_text(format!("{key}-label"), label)).build()
}

fn execute(effect: Effect, context: CommandContext<Msg>) -> Result<(), CommandError> {
    match effect {
        Effect::Authenticate => {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                if let Err(error) = context.send(Msg::SignedIn("jake".to_string())) {
                    log::warn!(target: "mvu.demo", "sign-in result dropped: {error}");
                }
            });
            Ok(())
        }
    }
}

fn load_config() -> Result<RuntimeConfig, Box<dyn std::error::Error>> {
    match env::var_os("MVU_CONFIG") {
        Some(path) => Ok(RuntimeConfig::from_path(path)?),
        None => Ok(RuntimeConfig::default()),
    }
}

type Executor = fn(Effect, CommandContext<Msg>) -> Result<(), CommandError>;

fn click(runtime: &Runtime<Demo, MemorySurface, Executor>, key: &str) -> DispatchOutcome {
    match runtime.surface().listener(&NodeId::keyed(key), "click") {
        Some(id) => runtime.event_sink().dispatch(id, None),
        None => DispatchOutcome::UnknownHandler,
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let surface = MemorySurface::new(config.start_url()?);
    let mut runtime: Runtime<Demo, MemorySurface, Executor> =
        Runtime::new(surface, execute as Executor, config);
    runtime.start(())?;
    log::info!(target: "mvu.demo", "initial document:\n{}", runtime.surface().document_html()?);

    for key in ["nav-sign-in", "nav-sign-out"] {
        let outcome = click(&runtime, key);
        log::info!(target: "mvu.demo", "click {key}: {outcome:?}");
        let processed = runtime.run_until_quiescent()?;
        log::info!(
            target: "mvu.demo",
            "{processed} messages, now at {}",
            runtime.surface().current_url()
        );
        if key == "nav-sign-in" {
            println!("{}", runtime.surface().document_html()?);
        }
    }

    println!("{}", runtime.surface().document_html()?);
    for url in runtime.surface().history() {
        println!("history: {url}");
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!(target: "mvu.demo", "{error}");
            ExitCode::FAILURE
        }
    }
}
