mod common;
use common::*;

use mccmd_core::commands::{
    ArgumentError, ArgumentView, ConverterRegistry, QuotedSplitter, ArgumentSplitter, Value,
    ValueType,
};
use mccmd_core::platform::PlatformBackend;
use mccmd_core::sender::SenderRef;
use std::sync::Arc;

mccmd_core::command_enum! {
    pub enum GameMode { Survival, Creative, Adventure }
}

fn view(backend: &Arc<SchedulerBackend>, parts: &[&str]) -> ArgumentView {
    let platform: Arc<dyn PlatformBackend> = backend.clone();
    let sender: SenderRef = backend.connect("Alex");
    ArgumentView::new(
        strings(parts),
        Arc::new(ConverterRegistry::with_defaults()),
        sender,
        platform,
    )
}

#[test]
fn index_semantics() {
    let backend = SchedulerBackend::new();
    let args = view(&backend, &["", "a", "b", "c"]);

    assert_eq!(args.len(), 3);
    assert_eq!(args.get_string(2).unwrap(), "c");
    assert_eq!(
        args.get::<String>(3),
        Err(ArgumentError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(args.joined_string(0, 3).unwrap(), "a b c");
    assert_eq!(args.get_string(-1).unwrap(), "c");
    assert_eq!(args.get_string(-3).unwrap(), "a");
    assert!(args.get_string(-4).is_err());
}

#[test]
fn typed_extraction_and_defaults() {
    let backend = SchedulerBackend::new();
    let args = view(&backend, &["", "12", "x", "creative", "CONSOLE"]);

    assert_eq!(args.get::<i32>(0), Ok(12));
    assert!(matches!(args.get::<i32>(1), Err(ArgumentError::Malformed { .. })));
    assert_eq!(args.get_or::<i32>(1, 7), Ok(7));
    assert_eq!(args.get_or::<i32>(9, 7), Ok(7));
    assert_eq!(args.get::<Option<u8>>(9), Ok(None));
    assert_eq!(args.get::<GameMode>(2), Ok(GameMode::Creative));
    assert_eq!(args.get_sender(3).unwrap().name(), "CONSOLE");
}

#[test]
fn conversion_is_idempotent() {
    let backend = SchedulerBackend::new();
    let registry = ConverterRegistry::with_defaults();
    let sender = backend.console_sender();

    for ty in [ValueType::I64, ValueType::F64, ValueType::Bool, ValueType::String] {
        let token = if ty == ValueType::Bool { "yes" } else { "42" };
        let first = registry.convert(token, &ty, &*sender, &*backend).unwrap();
        let second = registry.convert(token, &ty, &*sender, &*backend).unwrap();
        assert_eq!(first.to_string(), second.to_string());
    }
    assert_eq!(
        registry
            .convert("42", &ValueType::I64, &*sender, &*backend)
            .unwrap()
            .to_string(),
        Value::I64(42).to_string()
    );
}

#[test]
fn slicing_and_iteration() {
    let backend = SchedulerBackend::new();
    let args = view(&backend, &["", "1", "2", "3", "4", "5"]);

    let evens = args.slice(Some(1), None, Some(2)).unwrap();
    assert_eq!(evens.count(), 2);
    let values: Vec<i64> = evens.iter::<i64>().map(Result::unwrap).collect();
    assert_eq!(values, vec![2, 4]);

    let tail = args.slice(Some(-2), None, None).unwrap();
    assert_eq!(tail.iter_strings().collect::<Vec<_>>(), vec!["4", "5"]);
    assert_eq!(args.slice(None, None, Some(0)).unwrap_err(), ArgumentError::InvalidSlice);

    let mut numbers = args.iter::<i64>();
    assert!(numbers.has_next());
    assert!(numbers.has_next());
    assert_eq!(numbers.next(), Some(Ok(1)));
    assert_eq!(args.iter::<i64>().count(), 5);
}

#[test]
fn quoted_splitter_feeds_the_view() {
    let backend = SchedulerBackend::new();
    let parts = QuotedSplitter.split(r#"-f "hello world" it\'s"#);
    let owned: Vec<&str> = parts.iter().map(String::as_str).collect();
    let args = view(&backend, &owned);
    assert!(args.flag_present('f'));
    assert_eq!(args.get_string(0).unwrap(), "hello world");
    assert_eq!(args.get_string(1).unwrap(), "it's");
}
