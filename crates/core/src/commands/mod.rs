mod argument_parser;
mod argument_view;
mod completion;
mod context;
mod dispatcher;
pub(crate) mod error;
mod exception;
mod executor;
mod loader;
mod node;
mod registry;
mod splitter;
pub mod usage;
mod value;

pub use argument_parser::{
    ArgumentConverter, ConverterRegistry, EnumConverter, PrimitiveConverter, SenderConverter,
    StringConverter,
};
pub use argument_view::{ArgumentView, Arguments};
pub use context::CommandContext;
pub use dispatcher::{CommandDispatcher, DispatcherBuilder, HandlerRef, NodeId};
pub use error::{ArgumentError, CommandError, CommandResult, InternalError, RegistrationError};
pub use exception::ExceptionHandler;
pub use executor::{Denial, check_eligibility};
pub use loader::{BuilderLoader, CommandLoader, CommandProvider};
pub use node::{
    ANY_COUNT, CallTiming, CommandBuilder, CommandDescriptor, CommandTarget, DEFAULT_SUBCOMMAND,
    ParsedHandler, RawHandler,
};
pub use registry::CommandRegistry;
pub use splitter::{ArgumentSplitter, FlagSplitter, PlainSplitter, QuotedSplitter, Split};
pub use value::{EnumSpec, FromValue, Value, ValueType};
