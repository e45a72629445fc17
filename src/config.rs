use anyhow::Context;
use indexmap::IndexMap;
use mccmd_core::commands::{ArgumentSplitter, FlagSplitter, PlainSplitter, QuotedSplitter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use toml_edit::{DocumentMut, value};

pub const DEFAULT_PATH: &str = "Config.toml";

trait ConfigSerializeDefault {
    fn fix_config(self, name: &str, doc: &mut DocumentMut);
}

macro_rules! impl_simple_default {
    ( $( $type:ty ),* ) => {
        $(
            impl ConfigSerializeDefault for $type {
                fn fix_config(self, name: &str, doc: &mut DocumentMut) {
                    doc.entry(name).or_insert_with(|| value(self));
                }
            }
        )*
    }
}

impl_simple_default!(String, i64, bool);

impl<T> ConfigSerializeDefault for Option<T> {
    fn fix_config(self, _: &str, _: &mut DocumentMut) {
        debug_assert!(self.is_none(), "`Some` as default is unimplemented");
    }
}

/// How typed lines are split into flags and arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterKind {
    Plain,
    Flags,
    Quoted,
}

impl SplitterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitterKind::Plain => "plain",
            SplitterKind::Flags => "flags",
            SplitterKind::Quoted => "quoted",
        }
    }

    pub fn build(self) -> Box<dyn ArgumentSplitter> {
        match self {
            SplitterKind::Plain => Box::new(PlainSplitter),
            SplitterKind::Flags => Box::new(FlagSplitter),
            SplitterKind::Quoted => Box::new(QuotedSplitter),
        }
    }
}

impl ConfigSerializeDefault for SplitterKind {
    fn fix_config(self, name: &str, doc: &mut DocumentMut) {
        doc.entry(name).or_insert_with(|| value(self.as_str()));
    }
}

macro_rules! gen_config {
    (
        $( $name:ident: $type:ty = $default:expr),*
    ) => {
        #[derive(Debug, Serialize, Deserialize)]
        pub struct ShellConfig {
            $(
                pub $name: $type,
            )*
        }

        impl ShellConfig {
            /// Reads `config_file`, writes back any missing keys with their defaults
            /// and deserializes the result.
            pub fn load(config_file: impl AsRef<Path>) -> anyhow::Result<ShellConfig> {
                let config_file = config_file.as_ref();
                let str = fs::read_to_string(config_file).unwrap_or_default();
                let mut doc = str
                    .parse::<DocumentMut>()
                    .with_context(|| format!("Failed to parse {}", config_file.display()))?;

                $(
                    <$type as ConfigSerializeDefault>::fix_config($default, stringify!($name), &mut doc);
                )*

                let patched = doc.to_string();
                if str != patched {
                    fs::write(config_file, &patched)
                        .with_context(|| format!("Failed to write {}", config_file.display()))?;
                }

                toml::from_str(&patched)
                    .with_context(|| format!("Invalid configuration in {}", config_file.display()))
            }
        }
    };
}

gen_config! {
    log_directory: String = "./logs".to_string(),
    splitter: SplitterKind = SplitterKind::Plain,
    max_poll_interval_ms: i64 = 50,
    command_prefix: String = "/".to_string(),
    permissions: Option<PermissionsConfig> = None,
    messages: Option<IndexMap<String, String>> = None
}

impl ShellConfig {
    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(1) as u64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub granted: Vec<String>,
}

impl PermissionsConfig {
    /// `None` when the permission system is disabled.
    pub fn check(&self, node: &str) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        Some(self.granted.iter().any(|granted| node_matches(granted, node)))
    }
}

/// `*` grants everything and `a.b.*` grants every node under `a.b`.
fn node_matches(granted: &str, node: &str) -> bool {
    if granted == "*" || granted == node {
        return true;
    }
    granted
        .strip_suffix(".*")
        .is_some_and(|prefix| node.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.')))
}
