use crate::sender::CommandSender;
use rustc_hash::FxHashMap;
use std::sync::{PoisonError, RwLock};

pub mod keys {
    pub const COMMAND_NOT_FOUND: &str = "command.not_found";
    pub const CALL_FAILURE: &str = "command.call_failure";
    pub const EXCEPTION: &str = "command.exception";
    pub const INVALID_FLAGS: &str = "command.invalid_flags";
    pub const TOO_FEW_ARGUMENTS: &str = "command.too_few_arguments";
    pub const TOO_MANY_ARGUMENTS: &str = "command.too_many_arguments";
    pub const USAGE: &str = "command.usage";
    pub const OPERATOR_ONLY: &str = "command.operator_only";
    pub const PLAYER_ONLY: &str = "command.player_only";
    pub const CONSOLE_ONLY: &str = "command.console_only";
    pub const NO_PERMISSION: &str = "command.no_permission";
}

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    (keys::COMMAND_NOT_FOUND, "Command not found: {0}"),
    (
        keys::CALL_FAILURE,
        "An internal error occurred while running /{0}. See the server log for details.",
    ),
    (keys::EXCEPTION, "An error occurred while running /{0}."),
    (keys::INVALID_FLAGS, "Invalid flags: {0} (available: {1})"),
    (keys::TOO_FEW_ARGUMENTS, "Not enough arguments. At least {0} required."),
    (keys::TOO_MANY_ARGUMENTS, "Too many arguments. At most {0} allowed."),
    (keys::USAGE, "Usage: {0}"),
    (keys::OPERATOR_ONLY, "Only operators can use this command."),
    (
        keys::PLAYER_ONLY,
        "This command can only be executed by players",
    ),
    (
        keys::CONSOLE_ONLY,
        "This command can only be executed from the console",
    ),
    (keys::NO_PERMISSION, "Permission denied: {0}"),
];

/// Turns message keys into user-facing text.
pub trait TranslationProvider: Send + Sync {
    /// Unknown keys translate to themselves.
    fn translate(&self, sender: &dyn CommandSender, key: &str, args: &[&str]) -> String;
}

/// Default provider: built-in English messages with runtime overrides.
pub struct TranslationManager {
    messages: RwLock<FxHashMap<String, String>>,
}

impl TranslationManager {
    pub fn new() -> Self {
        let messages = DEFAULT_MESSAGES
            .iter()
            .map(|(key, message)| (key.to_string(), message.to_string()))
            .collect();
        Self {
            messages: RwLock::new(messages),
        }
    }

    pub fn set(&self, key: impl Into<String>, template: impl Into<String>) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), template.into());
    }

    pub fn extend<I, K, V>(&self, overrides: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        for (key, template) in overrides {
            messages.insert(key.into(), template.into());
        }
    }

    pub fn template(&self, key: &str) -> Option<String> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl Default for TranslationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationProvider for TranslationManager {
    fn translate(&self, _: &dyn CommandSender, key: &str, args: &[&str]) -> String {
        match self.template(key) {
            Some(template) => format_template(&template, args),
            None => key.to_string(),
        }
    }
}

/// Replaces `{0}`, `{1}`, ... with the matching argument. Placeholders without an
/// argument are left as they are.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestSender;

    #[test]
    fn placeholders() {
        assert_eq!(format_template("{0} and {1}", &["a", "b"]), "a and b");
        assert_eq!(format_template("{1}{0}{1}", &["a", "b"]), "bab");
        assert_eq!(format_template("{2} {x} {", &["a"]), "{2} {x} {");
    }

    #[test]
    fn missing_keys_fall_back_to_the_key() {
        let translations = TranslationManager::new();
        let sender = TestSender::console();
        assert_eq!(
            translations.translate(&*sender, "no.such.key", &[]),
            "no.such.key"
        );
        assert_eq!(
            translations.translate(&*sender, keys::COMMAND_NOT_FOUND, &["warp"]),
            "Command not found: warp"
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let translations = TranslationManager::new();
        translations.extend([(keys::COMMAND_NOT_FOUND, "Unbekannter Befehl: {0}")]);
        let sender = TestSender::console();
        assert_eq!(
            translations.translate(&*sender, keys::COMMAND_NOT_FOUND, &["warp"]),
            "Unbekannter Befehl: warp"
        );
    }
}
