//! The console shell: a scheduler-backed platform, its configuration and the
//! commands it ships with.

#![deny(rust_2018_idioms)]

pub mod builtin;
pub mod config;
pub mod console;

use anyhow::Context;
use config::ShellConfig;
use console::{ConsoleBackend, ConsoleSender};
use mccmd_core::commands::CommandDispatcher;
use mccmd_core::platform::PlatformBackend;
use mccmd_core::translation::TranslationManager;
use mccmd_scheduler::Scheduler;
use std::sync::Arc;

/// Everything a running shell needs.
pub struct Shell {
    pub dispatcher: CommandDispatcher,
    pub scheduler: Arc<Scheduler>,
    pub prefix: String,
}

impl Shell {
    pub fn new(config: &ShellConfig, console: ConsoleSender) -> anyhow::Result<Shell> {
        let scheduler = Arc::new(
            Scheduler::start(config.max_poll_interval())
                .context("Failed to start the scheduler thread")?,
        );
        let backend: Arc<dyn PlatformBackend> = Arc::new(ConsoleBackend::new(
            scheduler.clone(),
            console,
            config.permissions.clone(),
        ));

        let translations = Arc::new(TranslationManager::new());
        if let Some(messages) = &config.messages {
            translations.extend(messages.iter().map(|(key, template)| (key.as_str(), template.as_str())));
        }

        let dispatcher = CommandDispatcher::builder(backend)
            .splitter(config.splitter.build())
            .translations(translations)
            .build();
        builtin::register(&dispatcher, scheduler.clone())
            .context("Failed to register built-in commands")?;

        Ok(Shell {
            dispatcher,
            scheduler,
            prefix: config.command_prefix.clone(),
        })
    }

    /// Runs one typed line as the console. The prefix is optional.
    pub fn handle_line(&self, line: &str) -> bool {
        let line = line.trim();
        let line = line.strip_prefix(self.prefix.as_str()).unwrap_or(line);
        if line.is_empty() {
            return false;
        }
        let console = self.dispatcher.backend().console();
        self.dispatcher.execute_line(&console, line)
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
