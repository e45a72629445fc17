use super::argument_view::ArgumentView;
use super::context::CommandContext;
use super::dispatcher::{CommandDispatcher, NodeId};
use super::error::{CommandError, CommandResult, InternalError, panic_message};
use super::node::{CallTiming, CommandDescriptor, CommandTarget, DEFAULT_SUBCOMMAND};
use super::registry::best_match;
use super::splitter::Split;
use crate::platform::PlatformBackend;
use crate::sender::{CommandSender, SenderRef};
use crate::translation::keys;
use itertools::Itertools;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why a sender may not run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    PlayerOnly,
    ConsoleOnly,
    OperatorOnly,
    MissingPermission,
}

impl Denial {
    fn message_key(self) -> &'static str {
        match self {
            Denial::PlayerOnly => keys::PLAYER_ONLY,
            Denial::ConsoleOnly => keys::CONSOLE_ONLY,
            Denial::OperatorOnly => keys::OPERATOR_ONLY,
            Denial::MissingPermission => keys::NO_PERMISSION,
        }
    }
}

/// Sender type first, then the permission node if a permission system answers
/// for it, otherwise the operator fallback.
pub fn check_eligibility(
    backend: &dyn PlatformBackend,
    sender: &dyn CommandSender,
    command: &CommandDescriptor,
) -> Result<(), Denial> {
    if sender.is_player() {
        if !command.allows_players() {
            return Err(Denial::ConsoleOnly);
        }
    } else if !command.allows_console() {
        return Err(Denial::PlayerOnly);
    }

    let permission = command.permission();
    if !permission.is_empty() {
        if let Some(granted) = backend
            .check_permission(sender, permission)
            .or_else(|| sender.has_permission(permission))
        {
            return if granted {
                Ok(())
            } else {
                Err(Denial::MissingPermission)
            };
        }
    }

    if command.operator_fallback() && !sender.is_operator() {
        return Err(Denial::OperatorOnly);
    }
    Ok(())
}

pub(crate) enum Resolution {
    Found(Arc<CommandDescriptor>),
    Denied(Arc<CommandDescriptor>, Denial),
    NotFound,
}

/// Matches among eligible commands only. If nothing eligible matches, the
/// ineligible match (if any) is reported so the sender learns why.
pub(crate) fn resolve(
    commands: &[Arc<CommandDescriptor>],
    backend: &dyn PlatformBackend,
    sender: &dyn CommandSender,
    name: &str,
) -> Resolution {
    let eligible: Vec<_> = commands
        .iter()
        .filter(|command| check_eligibility(backend, sender, command).is_ok())
        .cloned()
        .collect();
    if let Some(command) = best_match(&eligible, name) {
        return Resolution::Found(command.clone());
    }
    match best_match(commands, name) {
        Some(command) => match check_eligibility(backend, sender, command) {
            Err(denial) => Resolution::Denied(command.clone(), denial),
            Ok(()) => Resolution::Found(command.clone()),
        },
        None => Resolution::NotFound,
    }
}

/// Arguments on their way to a command.
pub(crate) enum Input {
    /// The typed argument line, split by the dispatcher's splitter.
    Line(String),
    /// Whitespace separated words, joined and split again.
    Words(Vec<String>),
    /// Arguments a parent command already split. Only leading flags are read.
    Split { tokens: Vec<String>, quoted: Vec<bool> },
}

impl Input {
    fn split(&self, dispatcher: &CommandDispatcher) -> Split {
        let splitter = dispatcher.splitter();
        match self {
            Input::Line(line) => splitter.split_marked(line),
            Input::Words(words) => splitter.split_marked(&words.join(" ")),
            Input::Split { tokens, quoted } => {
                splitter.split_tokens(tokens.clone(), quoted.clone())
            }
        }
    }

    /// The tokens raw handlers see, with quoting marks if they are known.
    fn into_tokens(self) -> (Vec<String>, Option<Vec<bool>>) {
        match self {
            Input::Line(line) => (line.split_whitespace().map(str::to_string).collect(), None),
            Input::Words(words) => (words, None),
            Input::Split { tokens, quoted } => (tokens, Some(quoted)),
        }
    }
}

pub(crate) fn execute(
    dispatcher: &CommandDispatcher,
    node: NodeId,
    sender: &SenderRef,
    label: &str,
    input: Input,
) -> bool {
    let commands = dispatcher.commands_at(node);
    match resolve(&commands, &**dispatcher.backend(), &**sender, label) {
        Resolution::NotFound => {
            debug!(
                backend = dispatcher.backend().name(),
                sender = sender.name(),
                command = label,
                node = node.index(),
                "No command matched"
            );
            false
        }
        Resolution::Denied(command, denial) => {
            debug!(
                sender = sender.name(),
                command = command.name(),
                ?denial,
                "Command denied"
            );
            dispatcher.send_translated(&**sender, denial.message_key(), &[command.permission()]);
            true
        }
        Resolution::Found(command) => {
            dispatch(dispatcher, node, sender, command, label, input);
            true
        }
    }
}

fn dispatch(
    dispatcher: &CommandDispatcher,
    node: NodeId,
    sender: &SenderRef,
    command: Arc<CommandDescriptor>,
    label: &str,
    input: Input,
) {
    let view = if command.parses_arguments() {
        let view = ArgumentView::from_split(
            input.split(dispatcher),
            dispatcher.converters_for(node),
            sender.clone(),
            dispatcher.backend().clone(),
        );
        if !validate(dispatcher, &command, label, &view) {
            return;
        }
        Some(view)
    } else {
        None
    };

    let is_async = command.is_async();
    let (args, quoted) = input.into_tokens();
    let invocation = Invocation {
        context: CommandContext::new(dispatcher.clone(), node, sender.clone(), command, label),
        args,
        quoted,
        view,
    };
    let backend = dispatcher.backend();
    if is_async {
        backend.schedule_async(Box::new(move || invocation.run()));
    } else if backend.is_on_main_context() {
        invocation.run();
    } else {
        backend.schedule_sync(Box::new(move || invocation.run()));
    }
}

/// Flag set and argument count checks. On failure the sender is told why and the
/// handler is not run.
fn validate(
    dispatcher: &CommandDispatcher,
    command: &CommandDescriptor,
    label: &str,
    view: &ArgumentView,
) -> bool {
    let sender = &**view.sender();
    let supported = command.flags();
    if !supported.is_empty() {
        let invalid: String = view
            .flags()
            .chars()
            .filter(|flag| !supported.contains(*flag))
            .unique()
            .collect();
        if !invalid.is_empty() {
            dispatcher.send_translated(sender, keys::INVALID_FLAGS, &[invalid.as_str(), supported]);
            return false;
        }
    }

    let count = view.len();
    let (min, max) = (command.min_args(), command.max_args());
    let failure = if min >= 0 && count < min as usize {
        Some((keys::TOO_FEW_ARGUMENTS, min))
    } else if max >= 0 && count > max as usize {
        Some((keys::TOO_MANY_ARGUMENTS, max))
    } else {
        None
    };
    match failure {
        Some((key, bound)) => {
            dispatcher.send_translated(sender, key, &[bound.to_string().as_str()]);
            let usage = dispatcher.usage(command, label);
            dispatcher.send_translated(sender, keys::USAGE, &[usage.as_str()]);
            false
        }
        None => true,
    }
}

enum BodyOutcome {
    Completed,
    Skipped,
    Failed,
    Missing,
}

struct Invocation {
    context: CommandContext,
    args: Vec<String>,
    /// Present when `args` came already split from a parent command.
    quoted: Option<Vec<bool>>,
    view: Option<ArgumentView>,
}

impl Invocation {
    fn run(self) {
        let command = self.context.command().clone();
        let Some(child) = command.subcommands() else {
            self.call_body();
            return;
        };

        match command.timing() {
            CallTiming::Pre => match self.call_body() {
                BodyOutcome::Skipped => self.not_found(None),
                BodyOutcome::Failed => {}
                BodyOutcome::Completed | BodyOutcome::Missing => {
                    self.run_nested(child);
                }
            },
            CallTiming::Post => {
                self.run_nested(child);
                self.call_body();
            }
            CallTiming::Fallback => {
                if let Some(name) = self.try_nested(child) {
                    if matches!(self.call_body(), BodyOutcome::Skipped | BodyOutcome::Missing) {
                        self.not_found(Some(&name));
                    }
                }
            }
            CallTiming::Never => {
                self.call_body();
            }
        }
    }

    /// The sub-command name and the arguments that follow it, split once.
    fn nested_arguments(&self) -> (String, Input) {
        match &self.view {
            Some(view) => match view.raw(0) {
                Ok(name) => {
                    let (tokens, quoted) = view.skip(1).to_split_tokens();
                    (name.to_string(), Input::Split { tokens, quoted })
                }
                Err(_) => (DEFAULT_SUBCOMMAND.to_string(), Input::Words(Vec::new())),
            },
            None => match self.args.split_first() {
                Some((name, rest)) => {
                    let input = match &self.quoted {
                        Some(quoted) => Input::Split {
                            tokens: rest.to_vec(),
                            quoted: quoted.iter().skip(1).copied().collect(),
                        },
                        None => Input::Words(rest.to_vec()),
                    };
                    (name.clone(), input)
                }
                None => (DEFAULT_SUBCOMMAND.to_string(), Input::Words(Vec::new())),
            },
        }
    }

    /// Returns the attempted name if no sub-command matched.
    fn try_nested(&self, child: NodeId) -> Option<String> {
        let (name, input) = self.nested_arguments();
        if execute(self.context.dispatcher(), child, self.context.sender(), &name, input) {
            None
        } else {
            Some(name)
        }
    }

    fn run_nested(&self, child: NodeId) {
        if let Some(name) = self.try_nested(child) {
            self.not_found(Some(&name));
        }
    }

    fn not_found(&self, subcommand: Option<&str>) {
        let label = self.context.label();
        let attempted = match subcommand {
            Some(name) if !name.is_empty() => format!("{label} {name}"),
            _ => label.to_string(),
        };
        self.context
            .dispatcher()
            .send_translated(&**self.context.sender(), keys::COMMAND_NOT_FOUND, &[attempted.as_str()]);
    }

    fn call_body(&self) -> BodyOutcome {
        let command = self.context.command();
        let Some(target) = command.target() else {
            return BodyOutcome::Missing;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.invoke(target)))
            .unwrap_or_else(|payload| {
                Err(InternalError::Panicked {
                    command: command.name().to_string(),
                    message: panic_message(&*payload),
                }
                .into())
            });
        match result {
            Ok(()) => BodyOutcome::Completed,
            Err(CommandError::SkipSubcommand) => BodyOutcome::Skipped,
            Err(error) => {
                self.route_failure(error);
                BodyOutcome::Failed
            }
        }
    }

    fn invoke(&self, target: &CommandTarget) -> CommandResult<()> {
        match target {
            CommandTarget::Raw(handler) => handler(&self.context, &self.args),
            CommandTarget::Parsed(handler) => match &self.view {
                Some(view) => handler(&self.context, view),
                None => Err(InternalError::MissingArguments {
                    command: self.context.command().name().to_string(),
                }
                .into()),
            },
        }
    }

    fn route_failure(&self, failure: CommandError) {
        let dispatcher = self.context.dispatcher();
        let sender = self.context.sender();
        let command = self.context.command().name();
        let backend = dispatcher.backend().name();

        let Some(routable) = failure.as_routable() else {
            match &failure {
                CommandError::Internal(InternalError::Panicked { .. }) => {
                    error!(backend, command, sender = sender.name(), "{failure}");
                }
                _ => warn!(backend, command, sender = sender.name(), "{failure}"),
            }
            dispatcher.send_translated(&**sender, keys::CALL_FAILURE, &[self.context.label()]);
            return;
        };

        match dispatcher.find_exception_handler(self.context.node(), routable) {
            Some((handler, matched)) => {
                let handled = panic::catch_unwind(AssertUnwindSafe(|| {
                    handler.handle(matched, command, sender, self.view.as_ref())
                }));
                if let Err(payload) = handled {
                    error!(
                        backend,
                        command,
                        "Exception handler panicked: {}",
                        panic_message(&*payload)
                    );
                    dispatcher.send_translated(&**sender, keys::CALL_FAILURE, &[self.context.label()]);
                }
            }
            None => {
                error!(
                    backend,
                    command,
                    sender = sender.name(),
                    "Unhandled error while running command: {}",
                    error_chain(routable)
                );
                dispatcher.send_translated(&**sender, keys::EXCEPTION, &[self.context.label()]);
            }
        }
    }
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    std::iter::successors(Some(error), |error| (*error).source()).join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::node::CommandBuilder;
    use crate::commands::splitter::FlagSplitter;
    use crate::testing::{TestBackend, TestSender};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|token| token.to_string()).collect()
    }

    fn counting(name: &str, counter: &Arc<AtomicUsize>) -> CommandBuilder {
        let counter = counter.clone();
        CommandBuilder::new(name).executes(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    struct Fixture {
        backend: Arc<TestBackend>,
        dispatcher: CommandDispatcher,
        steve: Arc<TestSender>,
        sender: SenderRef,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Arc::new(TestBackend::new());
            let dispatcher = CommandDispatcher::builder(backend.clone())
                .splitter(FlagSplitter)
                .build();
            let steve = TestSender::player("Steve");
            Fixture {
                backend,
                dispatcher,
                sender: steve.clone(),
                steve,
            }
        }

        fn run(&self, name: &str, tokens: &[&str]) -> bool {
            self.dispatcher.execute(&self.sender, name, &args(tokens))
        }
    }

    #[test]
    fn eligibility_rules() {
        let backend = TestBackend::new();
        let player = TestSender::player("Steve");
        let console = TestSender::console();
        let players_only = CommandBuilder::new("fly").players_only().executes(|_, _| Ok(())).build(None);
        assert_eq!(check_eligibility(&backend, &*player, &players_only), Ok(()));
        assert_eq!(
            check_eligibility(&backend, &*console, &players_only),
            Err(Denial::PlayerOnly)
        );

        let op = CommandBuilder::new("stop")
            .permission("server.stop")
            .operator_only()
            .executes(|_, _| Ok(()))
            .build(None);
        assert_eq!(check_eligibility(&backend, &*player, &op), Err(Denial::OperatorOnly));
        player.set_operator(true);
        assert_eq!(check_eligibility(&backend, &*player, &op), Ok(()));
        player.set_operator(false);
        player.grant("server.stop");
        assert_eq!(check_eligibility(&backend, &*player, &op), Ok(()));

        backend.enable_permissions();
        player.deny("server.stop");
        player.set_operator(true);
        assert_eq!(
            check_eligibility(&backend, &*player, &op),
            Err(Denial::MissingPermission)
        );
    }

    #[test]
    fn exact_name_resolves_first() {
        let fixture = Fixture::new();
        let lower = Arc::new(AtomicUsize::new(0));
        let upper = Arc::new(AtomicUsize::new(0));
        fixture.dispatcher.register(counting("Ban", &upper).alias("b")).unwrap();
        fixture.dispatcher.register(counting("ban", &lower)).unwrap();
        assert!(fixture.run("ban", &[]));
        assert_eq!(lower.load(Ordering::SeqCst), 1);
        assert_eq!(upper.load(Ordering::SeqCst), 0);
        assert!(fixture.run("b", &[]));
        assert_eq!(upper.load(Ordering::SeqCst), 1);
        assert!(!fixture.run("kick", &[]));
    }

    #[test]
    fn ineligible_commands_are_skipped() {
        let fixture = Fixture::new();
        let console_hits = Arc::new(AtomicUsize::new(0));
        let player_hits = Arc::new(AtomicUsize::new(0));
        fixture
            .dispatcher
            .register(counting("save", &console_hits).console_only())
            .unwrap();
        fixture.dispatcher.register(counting("Save", &player_hits)).unwrap();
        assert!(fixture.run("save", &[]));
        assert_eq!(console_hits.load(Ordering::SeqCst), 0);
        assert_eq!(player_hits.load(Ordering::SeqCst), 1);

        fixture
            .dispatcher
            .register(counting("stop", &console_hits).console_only())
            .unwrap();
        assert!(fixture.run("stop", &[]));
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["This command can only be executed from the console"]
        );
    }

    #[test]
    fn flags_are_validated() {
        let fixture = Fixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        fixture.dispatcher.register(counting("copy", &hits).flags("ab")).unwrap();
        assert!(fixture.run("copy", &["-ac", "x"]));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["Invalid flags: c (available: ab)"]
        );
        assert!(fixture.run("copy", &["-ba", "x"]));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(fixture.steve.take_messages().is_empty());
    }

    #[test]
    fn argument_counts_are_validated() {
        let fixture = Fixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        fixture.dispatcher.register(counting("tp", &hits).args(1, 2)).unwrap();

        fixture.run("tp", &[]);
        let messages = fixture.steve.take_messages();
        assert_eq!(messages[0], "Not enough arguments. At least 1 required.");
        assert_eq!(messages[1], "Usage: /tp <1..2 args>");

        fixture.run("tp", &["a", "b", "c"]);
        assert_eq!(
            fixture.steve.take_messages()[0],
            "Too many arguments. At most 2 allowed."
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        fixture.run("tp", &["a"]);
        fixture.run("tp", &["a", "b"]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn raw_handlers_skip_validation() {
        let fixture = Fixture::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        fixture
            .dispatcher
            .register(
                CommandBuilder::new("say")
                    .flags("x")
                    .max_args(0)
                    .executes_raw(move |_, args| {
                        record.lock().unwrap().extend_from_slice(args);
                        Ok(())
                    }),
            )
            .unwrap();
        fixture.run("say", &["-q", "hello"]);
        assert_eq!(*seen.lock().unwrap(), args(&["-q", "hello"]));
    }

    #[test]
    fn sync_and_async_dispatch() {
        let fixture = Fixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        fixture.dispatcher.register(counting("sync", &hits)).unwrap();
        fixture
            .dispatcher
            .register(counting("async", &hits).asynchronous())
            .unwrap();
        fixture.backend.hold_jobs(true);

        fixture.run("sync", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.backend.sync_scheduled.load(Ordering::SeqCst), 0);

        fixture.run("async", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.backend.run_async_jobs(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        fixture.backend.set_on_main(false);
        fixture.run("sync", &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(fixture.backend.run_sync_jobs(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    fn timing_tree(fixture: &Fixture, timing: CallTiming, body: &Arc<Mutex<Vec<&'static str>>>, skip: bool) {
        let log = body.clone();
        let nested = body.clone();
        fixture
            .dispatcher
            .register(
                CommandBuilder::new("region")
                    .timing(timing)
                    .executes(move |_, _| {
                        log.lock().unwrap().push("parent");
                        if skip {
                            Err(CommandError::SkipSubcommand)
                        } else {
                            Ok(())
                        }
                    })
                    .then(CommandBuilder::new("define").executes(move |_, _| {
                        nested.lock().unwrap().push("define");
                        Ok(())
                    })),
            )
            .unwrap();
    }

    #[test]
    fn post_timing_runs_parent_after_failed_nested() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Post, &calls, false);
        assert!(fixture.run("region", &["remove"]));
        assert_eq!(*calls.lock().unwrap(), vec!["parent"]);
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["Command not found: region remove"]
        );

        calls.lock().unwrap().clear();
        fixture.run("region", &["define"]);
        assert_eq!(*calls.lock().unwrap(), vec!["define", "parent"]);
    }

    #[test]
    fn pre_timing_skip_prevents_nested() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Pre, &calls, true);
        assert!(fixture.run("region", &["define"]));
        assert_eq!(*calls.lock().unwrap(), vec!["parent"]);
        assert_eq!(fixture.steve.take_messages(), vec!["Command not found: region"]);
    }

    #[test]
    fn pre_timing_continues_into_nested() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Pre, &calls, false);
        fixture.run("region", &["define"]);
        assert_eq!(*calls.lock().unwrap(), vec!["parent", "define"]);
    }

    #[test]
    fn fallback_timing_runs_parent_only_without_match() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Fallback, &calls, false);
        fixture.run("region", &["define"]);
        assert_eq!(*calls.lock().unwrap(), vec!["define"]);
        fixture.run("region", &["list"]);
        assert_eq!(*calls.lock().unwrap(), vec!["define", "parent"]);
        assert!(fixture.steve.take_messages().is_empty());
    }

    #[test]
    fn fallback_skip_reports_not_found() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Fallback, &calls, true);
        fixture.run("region", &["list"]);
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["Command not found: region list"]
        );
    }

    #[test]
    fn never_timing_ignores_subcommands() {
        let fixture = Fixture::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        timing_tree(&fixture, CallTiming::Never, &calls, true);
        fixture.run("region", &["define"]);
        assert_eq!(*calls.lock().unwrap(), vec!["parent"]);
        assert!(fixture.steve.take_messages().is_empty());
    }

    #[test]
    fn default_subcommand_handles_empty_arguments() {
        let fixture = Fixture::new();
        let hits = Arc::new(AtomicUsize::new(0));
        fixture
            .dispatcher
            .register(
                CommandBuilder::new("warp")
                    .then(counting("list", &hits))
                    .then(CommandBuilder::default_subcommand().executes(|context, _| {
                        context.reply("Warps: spawn");
                        Ok(())
                    })),
            )
            .unwrap();
        fixture.run("warp", &[]);
        assert_eq!(fixture.steve.take_messages(), vec!["Warps: spawn"]);
        fixture.run("warp", &["list"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_reported_without_crashing() {
        let fixture = Fixture::new();
        fixture
            .dispatcher
            .register(CommandBuilder::new("boom").executes(|_, _| panic!("kaboom")))
            .unwrap();
        fixture
            .dispatcher
            .register(CommandBuilder::new("fail").executes(|_, _| Err(CommandError::message("disk full"))))
            .unwrap();
        fixture
            .dispatcher
            .register(CommandBuilder::new("number").executes(|_, args| {
                args.get::<i32>(0)?;
                Ok(())
            }))
            .unwrap();

        assert!(fixture.run("boom", &[]));
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["An internal error occurred while running /boom. See the server log for details."]
        );
        assert!(fixture.run("fail", &[]));
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["An error occurred while running /fail."]
        );
        assert!(fixture.run("number", &["abc"]));
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["An error occurred while running /number."]
        );
    }

    #[test]
    fn argument_errors_route_to_handlers() {
        let fixture = Fixture::new();
        fixture
            .dispatcher
            .register(CommandBuilder::new("number").executes(|_, args| {
                args.get::<i32>(0)?;
                Ok(())
            }))
            .unwrap();
        fixture.dispatcher.root().on_error(
            |error: &crate::commands::error::ArgumentError,
             _: &str,
             sender: &SenderRef,
             _: Option<&ArgumentView>| {
                sender.reply(&error.to_string());
            },
        );
        fixture.run("number", &["abc"]);
        assert_eq!(
            fixture.steve.take_messages(),
            vec!["'abc' is not a valid i32"]
        );
    }

    #[test]
    fn error_chain_joins_every_cause() {
        let failure = anyhow::anyhow!("disk full").context("saving plot");
        assert_eq!(error_chain(&*failure), "saving plot: disk full");
    }
}
