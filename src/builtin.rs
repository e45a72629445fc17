use itertools::Itertools;
use mccmd_core::commands::{
    ArgumentView, CommandBuilder, CommandContext, CommandDispatcher, CommandError,
    RegistrationError, check_eligibility,
};
use mccmd_core::component::{ComponentMethod, Object, TypeKey};
use mccmd_scheduler::Scheduler;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

/// Per-sender scratch notes kept by the `session` command.
#[derive(Debug, Default)]
pub struct Notes {
    lines: Mutex<Vec<String>>,
}

impl Notes {
    pub fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub fn register(
    dispatcher: &CommandDispatcher,
    scheduler: Arc<Scheduler>,
) -> Result<(), RegistrationError> {
    dispatcher.components().register(
        ComponentMethod::new("describe", TypeKey::SENDER, |call| {
            let sender = call.sender()?;
            let kind = if sender.is_player() { "player" } else { "console" };
            let operator = if sender.is_operator() { ", operator" } else { "" };
            let description = format!("{} ({}{})", sender.name(), kind, operator);
            Ok(Some(Arc::new(description) as Object))
        }),
    );

    dispatcher.register(help())?;
    dispatcher.register(echo())?;
    dispatcher.register(sum())?;
    dispatcher.register(whoami())?;
    dispatcher.register(session())?;
    dispatcher.register(tasks(scheduler))?;
    Ok(())
}

fn help() -> CommandBuilder {
    CommandBuilder::new("help")
        .alias("?")
        .description("Lists the commands you can use")
        .args(0, 1)
        .executes(|ctx, args| {
            let dispatcher = ctx.dispatcher();
            let backend = &**dispatcher.backend();
            let commands = dispatcher.root().commands();
            let visible = commands
                .iter()
                .filter(|command| check_eligibility(backend, &**ctx.sender(), command).is_ok());

            if let Some(name) = args.get::<Option<String>>(0)? {
                match visible.into_iter().find(|command| {
                    command.name().eq_ignore_ascii_case(&name) || command.has_alias(&name)
                }) {
                    Some(command) => {
                        ctx.reply(&dispatcher.usage(command, command.name()));
                        if !command.description().is_empty() {
                            ctx.reply(command.description());
                        }
                    }
                    None => ctx.reply(&format!("No help for '{}'", name)),
                }
                return Ok(());
            }

            for command in visible.sorted_by(|a, b| a.name().cmp(b.name())) {
                let aliases = command.aliases().join(", ");
                let mut line = format!("/{}", command.name());
                if !aliases.is_empty() {
                    line.push_str(&format!(" ({})", aliases));
                }
                if !command.description().is_empty() {
                    line.push_str(&format!(" - {}", command.description()));
                }
                ctx.reply(&line);
            }
            Ok(())
        })
}

fn echo() -> CommandBuilder {
    CommandBuilder::new("echo")
        .alias("say")
        .description("Repeats the message back, -u for upper case")
        .flags("u")
        .min_args(1)
        .executes(|ctx, args| {
            let message = args.joined_from(0)?;
            if args.flag_present('u') {
                ctx.reply(&message.to_uppercase());
            } else {
                ctx.reply(&message);
            }
            Ok(())
        })
}

fn sum() -> CommandBuilder {
    CommandBuilder::new("sum")
        .alias("add")
        .description("Adds numbers")
        .min_args(1)
        .executes(|ctx, args| {
            let total = args.iter::<f64>().try_fold(0.0, |total, value| {
                value.map(|value| total + value)
            })?;
            ctx.reply(&format!("Sum: {}", total));
            Ok(())
        })
}

fn whoami() -> CommandBuilder {
    CommandBuilder::new("whoami")
        .description("Describes the sender running the command")
        .max_args(0)
        .executes(|ctx, _| {
            let described = ctx
                .call_component("describe", Vec::new())
                .and_then(|outcome| outcome.wait())
                .map_err(CommandError::failed)?;
            let text = described
                .as_ref()
                .and_then(|object| object.downcast_ref::<String>())
                .cloned()
                .unwrap_or_else(|| ctx.sender().name().to_string());
            ctx.reply(&text);
            Ok(())
        })
}

fn notes(ctx: &CommandContext) -> Arc<Notes> {
    ctx.sessions()
        .get_or_create(ctx.sender().handle(), Notes::default)
}

fn session() -> CommandBuilder {
    CommandBuilder::new("session")
        .alias("notes")
        .description("Keeps notes for the current sender")
        .then(
            CommandBuilder::new("add")
                .min_args(1)
                .executes(|ctx, args| {
                    notes(ctx).push(args.joined_from(0)?);
                    ctx.reply("Noted.");
                    Ok(())
                }),
        )
        .then(CommandBuilder::new("list").max_args(0).executes(list_notes))
        .then(
            CommandBuilder::new("clear")
                .max_args(0)
                .executes(|ctx, _| {
                    let expired = ctx.sessions().expire::<Notes>(ctx.sender().handle());
                    ctx.reply(if expired { "Session cleared." } else { "No session." });
                    Ok(())
                }),
        )
        .then(CommandBuilder::default_subcommand().executes(list_notes))
}

fn list_notes(ctx: &CommandContext, _: &ArgumentView) -> Result<(), CommandError> {
    let Some(notes) = ctx.sessions().get::<Notes>(ctx.sender().handle()) else {
        ctx.reply("No session.");
        return Ok(());
    };
    let lines = notes.lines();
    if lines.is_empty() {
        ctx.reply("No notes.");
    }
    for (number, line) in lines.iter().enumerate() {
        ctx.reply(&format!("{}. {}", number + 1, line));
    }
    Ok(())
}

fn tasks(scheduler: Arc<Scheduler>) -> CommandBuilder {
    let repeating = scheduler.clone();
    let cancelling = scheduler.clone();

    CommandBuilder::new("tasks")
        .description("Inspects and schedules background tasks")
        .permission("mccmd.tasks")
        .operator_only()
        .then(list_tasks(scheduler.clone(), CommandBuilder::new("list")))
        .then(list_tasks(scheduler, CommandBuilder::default_subcommand()))
        .then(
            CommandBuilder::new("every")
                .description("Repeats a message every <ms> milliseconds")
                .min_args(2)
                .executes(move |ctx, args| {
                    let period = args.get::<u64>(0)?.max(1);
                    let message = args.joined_from(1)?;
                    let sender = ctx.sender().clone();
                    let task = repeating.run_repeating(
                        Box::new(move || -> anyhow::Result<()> {
                            sender.reply(&message);
                            Ok(())
                        }),
                        Some(true),
                        Duration::from_millis(period),
                        Duration::from_millis(period),
                    );
                    info!(task = task.id(), period, "Scheduled repeating message");
                    ctx.reply(&format!("Scheduled task #{}", task.id()));
                    Ok(())
                }),
        )
        .then(
            CommandBuilder::new("cancel")
                .args(1, 1)
                .executes(move |ctx, args| {
                    let id = args.get::<u64>(0)?;
                    let found = cancelling
                        .tasks()
                        .into_iter()
                        .find(|task| task.id() == id && task.is_repeating());
                    match found {
                        Some(task) => {
                            task.cancel();
                            ctx.reply(&format!("Cancelled task #{}", id));
                        }
                        None => ctx.reply(&format!("No repeating task #{}", id)),
                    }
                    Ok(())
                }),
        )
}

fn list_tasks(scheduler: Arc<Scheduler>, builder: CommandBuilder) -> CommandBuilder {
    builder.max_args(0).executes(move |ctx, _| {
        // One-shot tasks are command dispatches, including this one.
        let tasks: Vec<_> = scheduler
            .tasks()
            .into_iter()
            .filter(|task| task.is_repeating())
            .collect();
        if tasks.is_empty() {
            ctx.reply("No repeating tasks.");
        }
        for task in tasks {
            ctx.reply(&task.to_string());
        }
        Ok(())
    })
}
