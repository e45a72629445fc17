use crate::commands::argument_parser::ConverterRegistry;
use crate::commands::error::ArgumentError;
use crate::commands::splitter::Split;
use crate::commands::value::{FromValue, Value, ValueType};
use crate::platform::PlatformBackend;
use crate::sender::SenderRef;
use itertools::Itertools;
use std::marker::PhantomData;
use std::sync::Arc;

/// Window over the underlying token list: `count` elements starting at `start`,
/// `step` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: isize,
    step: isize,
    count: usize,
}

/// The parsed arguments of one command invocation.
///
/// Negative indices count from the end: `-1` is the last argument. Slices are
/// derived views sharing the same tokens.
#[derive(Clone)]
pub struct ArgumentView {
    flags: Arc<str>,
    tokens: Arc<[String]>,
    quoted: Arc<[bool]>,
    window: Window,
    converters: Arc<ConverterRegistry>,
    sender: SenderRef,
    backend: Arc<dyn PlatformBackend>,
}

impl ArgumentView {
    pub fn new(
        parts: Vec<String>,
        converters: Arc<ConverterRegistry>,
        sender: SenderRef,
        backend: Arc<dyn PlatformBackend>,
    ) -> Self {
        Self::from_split(Split::from_parts(parts), converters, sender, backend)
    }

    pub fn from_split(
        split: Split,
        converters: Arc<ConverterRegistry>,
        sender: SenderRef,
        backend: Arc<dyn PlatformBackend>,
    ) -> Self {
        let Split {
            flags,
            args,
            mut quoted,
        } = split;
        quoted.resize(args.len(), false);
        let count = args.len();
        Self {
            flags: flags.into(),
            tokens: args.into(),
            quoted: quoted.into(),
            window: Window {
                start: 0,
                step: 1,
                count,
            },
            converters,
            sender,
            backend,
        }
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn flag_present(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }

    pub fn len(&self) -> usize {
        self.window.count
    }

    /// Alias of [`ArgumentView::len`], mirroring slice terminology.
    pub fn count(&self) -> usize {
        self.window.count
    }

    pub fn is_empty(&self) -> bool {
        self.window.count == 0
    }

    pub fn sender(&self) -> &SenderRef {
        &self.sender
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Maps a user index onto a position inside this view.
    ///
    /// With `allow_length`, an index equal to the length is accepted, which is how
    /// exclusive end bounds are expressed.
    pub fn real_index(&self, index: isize, allow_length: bool) -> Result<usize, ArgumentError> {
        let len = self.len() as isize;
        let resolved = if index < 0 { len + index } else { index };
        let upper = if allow_length { len } else { len - 1 };
        if resolved < 0 || resolved > upper {
            return Err(ArgumentError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(resolved as usize)
    }

    fn underlying(&self, position: usize) -> usize {
        (self.window.start + position as isize * self.window.step) as usize
    }

    fn token_at(&self, position: usize) -> &str {
        &self.tokens[self.underlying(position)]
    }

    /// Whether the argument at `position` was written in quotes.
    pub fn is_quoted(&self, index: isize) -> Result<bool, ArgumentError> {
        let position = self.real_index(index, false)?;
        Ok(self.quoted[self.underlying(position)])
    }

    pub fn raw(&self, index: isize) -> Result<&str, ArgumentError> {
        let position = self.real_index(index, false)?;
        Ok(self.token_at(position))
    }

    pub fn raw_tokens(&self) -> Vec<String> {
        (0..self.len())
            .map(|position| self.token_at(position).to_string())
            .collect()
    }

    /// The arguments with their quoting, in the form a sub-command re-reads.
    pub(crate) fn to_split_tokens(&self) -> (Vec<String>, Vec<bool>) {
        let quoted = (0..self.len())
            .map(|position| self.quoted[self.underlying(position)])
            .collect();
        (self.raw_tokens(), quoted)
    }

    pub fn convert(&self, token: &str, ty: &ValueType) -> Result<Value, ArgumentError> {
        self.converters
            .convert(token, ty, &*self.sender, &*self.backend)
    }

    pub fn get<T: FromValue>(&self, index: isize) -> Result<T, ArgumentError> {
        let position = match self.real_index(index, false) {
            Ok(position) => position,
            Err(err) => return T::absent().ok_or(err),
        };
        let value = self.convert(self.token_at(position), &T::value_type())?;
        T::from_value(value)
    }

    /// Like [`ArgumentView::get`], but a missing index or a malformed token yields
    /// `default`. Other failures still propagate.
    pub fn get_or<T: FromValue>(&self, index: isize, default: T) -> Result<T, ArgumentError> {
        match self.get(index) {
            Ok(value) => Ok(value),
            Err(err) if err.is_recoverable() => Ok(default),
            Err(err) => Err(err),
        }
    }

    /// The argument as a string, falling back to the raw token when no string
    /// converter produces one.
    pub fn get_string(&self, index: isize) -> Result<String, ArgumentError> {
        let token = self.raw(index)?;
        match self.convert(token, &ValueType::String) {
            Ok(Value::String(converted)) => Ok(converted),
            _ => Ok(token.to_string()),
        }
    }

    pub fn get_sender(&self, index: isize) -> Result<SenderRef, ArgumentError> {
        self.get::<SenderRef>(index)
    }

    /// Joins `begin..end` with single spaces. `end` may equal the length.
    pub fn joined_string(&self, begin: isize, end: isize) -> Result<String, ArgumentError> {
        let begin = self.real_index(begin, false)?;
        let end = self.real_index(end, true)?;
        Ok((begin..end.max(begin))
            .map(|position| self.token_at(position))
            .join(" "))
    }

    /// Everything from `begin` to the end.
    pub fn joined_from(&self, begin: isize) -> Result<String, ArgumentError> {
        self.joined_string(begin, self.len() as isize)
    }

    /// Python slice semantics. `None` bounds take the defaults for the step's sign.
    pub fn slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    ) -> Result<ArgumentView, ArgumentError> {
        let window = slice_window(self.len(), start, stop, step.unwrap_or(1))?;
        // Windows with fewer than two elements carry a unit step, so the products
        // below stay within the token count.
        let composed = Window {
            start: window
                .start
                .checked_mul(self.window.step)
                .and_then(|offset| offset.checked_add(self.window.start))
                .ok_or(ArgumentError::InvalidSlice)?,
            step: self
                .window
                .step
                .checked_mul(window.step)
                .ok_or(ArgumentError::InvalidSlice)?,
            count: window.count,
        };
        Ok(ArgumentView {
            window: composed,
            ..self.clone()
        })
    }

    /// Drops the first `n` arguments.
    pub fn skip(&self, n: usize) -> ArgumentView {
        // A positive step never fails to slice.
        self.slice(Some(n as isize), None, None)
            .unwrap_or_else(|_| self.clone())
    }

    /// Lazily converts every argument. Each call starts from the beginning.
    pub fn iter<T: FromValue>(&self) -> Arguments<'_, T> {
        Arguments {
            view: self,
            position: 0,
            cached: None,
            _marker: PhantomData,
        }
    }

    pub fn iter_strings(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).map(move |position| self.token_at(position))
    }
}

impl std::fmt::Debug for ArgumentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentView")
            .field("flags", &self.flags)
            .field("args", &self.raw_tokens())
            .finish()
    }
}

fn slice_window(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
) -> Result<Window, ArgumentError> {
    if step == 0 {
        return Err(ArgumentError::InvalidSlice);
    }
    let len = len as isize;
    let clamp = |index: isize, low: isize, high: isize| {
        let index = if index < 0 { index + len } else { index };
        index.clamp(low, high)
    };

    let (start, stop) = if step > 0 {
        (
            start.map_or(0, |index| clamp(index, 0, len)),
            stop.map_or(len, |index| clamp(index, 0, len)),
        )
    } else {
        (
            start.map_or(len - 1, |index| clamp(index, -1, len - 1)),
            stop.map_or(-1, |index| clamp(index, -1, len - 1)),
        )
    };

    let count = if step > 0 && stop > start {
        (stop - start - 1) as usize / step.unsigned_abs() + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) as usize / step.unsigned_abs() + 1
    } else {
        0
    };

    Ok(match count {
        0 => Window {
            start: 0,
            step: 1,
            count: 0,
        },
        1 => Window {
            start,
            step: 1,
            count: 1,
        },
        _ => Window { start, step, count },
    })
}

/// Iterator over converted arguments with one element of lookahead.
pub struct Arguments<'a, T> {
    view: &'a ArgumentView,
    position: usize,
    cached: Option<Result<T, ArgumentError>>,
    _marker: PhantomData<T>,
}

impl<'a, T: FromValue> Arguments<'a, T> {
    fn advance(&mut self) -> Option<Result<T, ArgumentError>> {
        if self.position >= self.view.len() {
            return None;
        }
        let token = self.view.token_at(self.position);
        self.position += 1;
        Some(
            self.view
                .convert(token, &T::value_type())
                .and_then(T::from_value),
        )
    }

    pub fn has_next(&mut self) -> bool {
        if self.cached.is_none() {
            self.cached = self.advance();
        }
        self.cached.is_some()
    }
}

impl<'a, T: FromValue> Iterator for Arguments<'a, T> {
    type Item = Result<T, ArgumentError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cached.take().or_else(|| self.advance())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            self.view.len() - self.position + usize::from(self.cached.is_some());
        (remaining, Some(remaining))
    }
}
