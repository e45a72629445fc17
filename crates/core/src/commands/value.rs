use crate::commands::error::ArgumentError;
use crate::sender::SenderRef;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Static description of an enum that arguments can be converted into.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct EnumSpec {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumSpec {
    /// Exact variant name first, then a case-insensitive match.
    pub fn lookup(&self, token: &str) -> Option<usize> {
        self.variants
            .iter()
            .position(|variant| *variant == token)
            .or_else(|| {
                self.variants
                    .iter()
                    .position(|variant| variant.eq_ignore_ascii_case(token))
            })
    }
}

/// Type tag a positional argument is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Enum(&'static EnumSpec),
    Sender,
    /// Nullable form of the inner type. Stripped before converter lookup so that the
    /// converter for the inner type serves both.
    Optional(Box<ValueType>),
    /// A type served by a user converter.
    Named(&'static str),
}

impl ValueType {
    pub fn canonical(&self) -> &ValueType {
        match self {
            ValueType::Optional(inner) => inner.canonical(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ValueType::Optional(_))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueType::Bool
                | ValueType::Char
                | ValueType::I8
                | ValueType::I16
                | ValueType::I32
                | ValueType::I64
                | ValueType::U8
                | ValueType::U16
                | ValueType::U32
                | ValueType::U64
                | ValueType::F32
                | ValueType::F64
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("boolean"),
            ValueType::Char => f.write_str("character"),
            ValueType::I8 => f.write_str("i8"),
            ValueType::I16 => f.write_str("i16"),
            ValueType::I32 => f.write_str("i32"),
            ValueType::I64 => f.write_str("i64"),
            ValueType::U8 => f.write_str("u8"),
            ValueType::U16 => f.write_str("u16"),
            ValueType::U32 => f.write_str("u32"),
            ValueType::U64 => f.write_str("u64"),
            ValueType::F32 => f.write_str("f32"),
            ValueType::F64 => f.write_str("f64"),
            ValueType::String => f.write_str("string"),
            ValueType::Enum(spec) => f.write_str(spec.name),
            ValueType::Sender => f.write_str("player"),
            ValueType::Optional(inner) => write!(f, "optional {}", inner),
            ValueType::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Enum {
        spec: &'static EnumSpec,
        index: usize,
    },
    Sender(SenderRef),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    pub fn downcast<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        match self {
            Value::Custom(value) => value.downcast_ref::<T>().cloned(),
            _ => None,
        }
    }

    fn mismatch(&self, expected: ValueType) -> ArgumentError {
        // Surfaced to the caller as a malformed token so that defaults still apply.
        ArgumentError::Malformed {
            token: self.to_string(),
            expected,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Enum { spec: a, index: i },
                Value::Enum { spec: b, index: j },
            ) => a == b && i == j,
            (Value::Sender(a), Value::Sender(b)) => a.handle() == b.handle(),
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Enum { spec, index } => {
                f.write_str(spec.variants.get(*index).copied().unwrap_or("?"))
            }
            Value::Sender(sender) => f.write_str(sender.name()),
            Value::Custom(_) => f.write_str("<custom>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => write!(f, "String({:?})", v),
            Value::Enum { spec, .. } => write!(f, "Enum({}::{})", spec.name, self),
            Value::Sender(sender) => write!(f, "Sender({:?})", sender.handle()),
            other => write!(f, "Value({})", other),
        }
    }
}

/// Rust types that a positional argument can be extracted as.
pub trait FromValue: Sized {
    fn value_type() -> ValueType;

    fn from_value(value: Value) -> Result<Self, ArgumentError>;

    /// What an out-of-range index produces instead of an error, if anything.
    fn absent() -> Option<Self> {
        None
    }
}

macro_rules! impl_from_value {
    ( $( $type:ty => $variant:ident ),* ) => {
        $(
            impl FromValue for $type {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }

                fn from_value(value: Value) -> Result<Self, ArgumentError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other.mismatch(ValueType::$variant)),
                    }
                }
            }
        )*
    }
}

impl_from_value!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String
);

impl FromValue for SenderRef {
    fn value_type() -> ValueType {
        ValueType::Sender
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Sender(sender) => Ok(sender),
            other => Err(other.mismatch(ValueType::Sender)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn value_type() -> ValueType {
        ValueType::Optional(Box::new(T::value_type()))
    }

    fn from_value(value: Value) -> Result<Self, ArgumentError> {
        T::from_value(value).map(Some)
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

/// Declares an enum that can be used as a command argument.
///
/// ```
/// mccmd_core::command_enum! {
///     pub enum Mode { Creative, Survival }
/// }
/// ```
#[macro_export]
macro_rules! command_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { $( $variant:ident ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant, )+
        }

        impl $name {
            pub const SPEC: $crate::commands::EnumSpec = $crate::commands::EnumSpec {
                name: stringify!($name),
                variants: &[ $( stringify!($variant), )+ ],
            };

            const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];
        }

        impl $crate::commands::FromValue for $name {
            fn value_type() -> $crate::commands::ValueType {
                $crate::commands::ValueType::Enum(&$name::SPEC)
            }

            fn from_value(
                value: $crate::commands::Value,
            ) -> Result<Self, $crate::commands::ArgumentError> {
                match value {
                    $crate::commands::Value::Enum { spec, index } if *spec == $name::SPEC => {
                        $name::ALL.get(index).copied().ok_or_else(|| {
                            $crate::commands::ArgumentError::Malformed {
                                token: index.to_string(),
                                expected: <$name as $crate::commands::FromValue>::value_type(),
                            }
                        })
                    }
                    other => Err($crate::commands::ArgumentError::Malformed {
                        token: other.to_string(),
                        expected: <$name as $crate::commands::FromValue>::value_type(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::command_enum! {
        enum Weather { Clear, Rain, Thunder }
    }

    #[test]
    fn enum_lookup_prefers_exact_name() {
        static SPEC: EnumSpec = EnumSpec {
            name: "Case",
            variants: &["upper", "UPPER"],
        };
        assert_eq!(SPEC.lookup("UPPER"), Some(1));
        assert_eq!(SPEC.lookup("Upper"), Some(0));
        assert_eq!(SPEC.lookup("lower"), None);
    }

    #[test]
    fn optional_type_is_stripped() {
        let ty = <Option<i32>>::value_type();
        assert!(ty.is_optional());
        assert_eq!(ty.canonical(), &ValueType::I32);
        assert_eq!(<Option<i32>>::absent(), Some(None));
        assert_eq!(<i32>::absent(), None);
    }

    #[test]
    fn declared_enum_round_trips_through_value() {
        let value = Value::Enum {
            spec: &Weather::SPEC,
            index: 2,
        };
        assert_eq!(value.to_string(), "Thunder");
        assert_eq!(Weather::from_value(value), Ok(Weather::Thunder));
        assert!(Weather::from_value(Value::I32(2)).is_err());
    }
}
