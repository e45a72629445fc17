use crate::commands::error::ArgumentError;
use crate::commands::value::{Value, ValueType};
use crate::platform::PlatformBackend;
use crate::sender::CommandSender;
use std::str::FromStr;
use std::sync::Arc;

/// Converts a single token into a typed value.
///
/// Converters must be stateless with respect to conversions: converting the same
/// token twice yields equal values.
pub trait ArgumentConverter: Send + Sync {
    fn is_type_supported(&self, ty: &ValueType) -> bool;

    fn convert(
        &self,
        token: &str,
        ty: &ValueType,
        sender: &dyn CommandSender,
        backend: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError>;
}

/// Ordered set of converters. The first converter claiming a type wins.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn ArgumentConverter>>,
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Primitives, strings, enums and senders, in that order.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(PrimitiveConverter);
        registry.register(StringConverter);
        registry.register(EnumConverter);
        registry.register(SenderConverter);
        registry
    }

    pub fn register(&mut self, converter: impl ArgumentConverter + 'static) {
        self.converters.push(Arc::new(converter));
    }

    /// Registers ahead of every existing converter.
    pub fn prepend(&mut self, converter: impl ArgumentConverter + 'static) {
        self.converters.insert(0, Arc::new(converter));
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    fn find(&self, ty: &ValueType) -> Option<&Arc<dyn ArgumentConverter>> {
        let ty = ty.canonical();
        self.converters
            .iter()
            .find(|converter| converter.is_type_supported(ty))
    }

    pub fn supports(&self, ty: &ValueType) -> bool {
        self.find(ty).is_some()
    }

    pub fn convert(
        &self,
        token: &str,
        ty: &ValueType,
        sender: &dyn CommandSender,
        backend: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError> {
        let converter = self
            .find(ty)
            .ok_or_else(|| ArgumentError::UnsupportedType(ty.clone()))?;
        converter.convert(token, ty.canonical(), sender, backend)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn parse_number<T: FromStr>(token: &str, ty: &ValueType) -> Result<T, ArgumentError> {
    token.parse::<T>().map_err(|_| ArgumentError::Malformed {
        token: token.to_string(),
        expected: ty.clone(),
    })
}

fn parse_boolean(token: &str) -> Option<bool> {
    match token.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

pub struct PrimitiveConverter;

impl ArgumentConverter for PrimitiveConverter {
    fn is_type_supported(&self, ty: &ValueType) -> bool {
        ty.is_primitive()
    }

    fn convert(
        &self,
        token: &str,
        ty: &ValueType,
        _: &dyn CommandSender,
        _: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError> {
        let malformed = || ArgumentError::Malformed {
            token: token.to_string(),
            expected: ty.clone(),
        };
        let value = match ty {
            ValueType::Bool => Value::Bool(parse_boolean(token).ok_or_else(malformed)?),
            ValueType::Char => {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(malformed()),
                }
            }
            ValueType::I8 => Value::I8(parse_number(token, ty)?),
            ValueType::I16 => Value::I16(parse_number(token, ty)?),
            ValueType::I32 => Value::I32(parse_number(token, ty)?),
            ValueType::I64 => Value::I64(parse_number(token, ty)?),
            ValueType::U8 => Value::U8(parse_number(token, ty)?),
            ValueType::U16 => Value::U16(parse_number(token, ty)?),
            ValueType::U32 => Value::U32(parse_number(token, ty)?),
            ValueType::U64 => Value::U64(parse_number(token, ty)?),
            ValueType::F32 => Value::F32(parse_number(token, ty)?),
            ValueType::F64 => Value::F64(parse_number(token, ty)?),
            _ => return Err(ArgumentError::UnsupportedType(ty.clone())),
        };
        Ok(value)
    }
}

pub struct StringConverter;

impl ArgumentConverter for StringConverter {
    fn is_type_supported(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::String)
    }

    fn convert(
        &self,
        token: &str,
        _: &ValueType,
        _: &dyn CommandSender,
        _: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError> {
        Ok(Value::String(token.to_string()))
    }
}

pub struct EnumConverter;

impl ArgumentConverter for EnumConverter {
    fn is_type_supported(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Enum(_))
    }

    fn convert(
        &self,
        token: &str,
        ty: &ValueType,
        _: &dyn CommandSender,
        _: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError> {
        let ValueType::Enum(spec) = ty else {
            return Err(ArgumentError::UnsupportedType(ty.clone()));
        };
        let index = spec.lookup(token).ok_or_else(|| ArgumentError::Malformed {
            token: token.to_string(),
            expected: ty.clone(),
        })?;
        Ok(Value::Enum { spec, index })
    }
}

/// Resolves a player by name through the backend. `console` names the console sender.
pub struct SenderConverter;

impl ArgumentConverter for SenderConverter {
    fn is_type_supported(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Sender)
    }

    fn convert(
        &self,
        token: &str,
        _: &ValueType,
        _: &dyn CommandSender,
        backend: &dyn PlatformBackend,
    ) -> Result<Value, ArgumentError> {
        if token.eq_ignore_ascii_case("console") {
            return Ok(Value::Sender(backend.console()));
        }
        backend
            .resolve_sender(token)
            .map(Value::Sender)
            .ok_or_else(|| ArgumentError::UnknownSender(token.to_string()))
    }
}
