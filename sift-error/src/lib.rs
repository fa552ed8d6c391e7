#![deny(missing_docs)]

//! Error handling for the sift crates.
//!
//! Every fallible operation returns a [`SiftResult`]. Errors created through the [`sift_err!`]
//! and [`sift_bail!`] macros capture a backtrace at the point of creation.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;
use std::{env, fmt};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("SIFT_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// Same type as `Backtrace`; the alias keeps `thiserror` from deriving the nightly-only
// `Error::provide` for fields it recognizes by the `Backtrace` name.
type CapturedBacktrace = Backtrace;

/// The top-level error type for sift.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum SiftError {
    /// A derived column prevents a filtered view from being materialized.
    #[error("{0}\nBacktrace:\n{1}")]
    UnsafeColumn(ErrString, CapturedBacktrace),
    /// A filter expression could not be evaluated into a selection mask.
    #[error("{0}\nBacktrace:\n{1}")]
    FilterEvaluation(ErrString, CapturedBacktrace),
    /// A referenced column is not visible from the view or scope it was resolved against.
    #[error("column {0} not found\nBacktrace:\n{1}")]
    ColumnNotFound(ErrString, CapturedBacktrace),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, CapturedBacktrace),
    /// Two types were expected to match.
    #[error("expected type: {0} but instead got {1}\nBacktrace:\n{2}")]
    MismatchedTypes(ErrString, ErrString, CapturedBacktrace),
    /// An error that has been observed by more than one caller.
    #[error(transparent)]
    Shared(Arc<SiftError>),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, Box<SiftError>),
    /// A wrapper for errors from the Arrow library.
    #[error("{0}\nBacktrace:\n{1}")]
    ArrowError(arrow_schema::ArrowError, CapturedBacktrace),
}

impl SiftError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        SiftError::Context(msg.into(), Box::new(self))
    }

    /// Returns the innermost error, looking through context and shared wrappers.
    pub fn root_cause(&self) -> &SiftError {
        match self {
            SiftError::Context(_, inner) => inner.root_cause(),
            SiftError::Shared(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// True if this error, or the error it wraps, is an [`SiftError::UnsafeColumn`].
    pub fn is_unsafe_column(&self) -> bool {
        matches!(self.root_cause(), SiftError::UnsafeColumn(..))
    }

    /// True if this error, or the error it wraps, is an [`SiftError::FilterEvaluation`].
    pub fn is_filter_evaluation(&self) -> bool {
        matches!(self.root_cause(), SiftError::FilterEvaluation(..))
    }
}

impl Debug for SiftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<arrow_schema::ArrowError> for SiftError {
    fn from(value: arrow_schema::ArrowError) -> Self {
        SiftError::ArrowError(value, Backtrace::capture())
    }
}

impl From<Arc<SiftError>> for SiftError {
    fn from(value: Arc<SiftError>) -> Self {
        SiftError::Shared(value)
    }
}

/// A type alias for Results that return SiftErrors as their error type.
pub type SiftResult<T> = Result<T, SiftError>;

/// A type alias for results whose error is observed by several callers at once.
pub type SharedSiftResult<T> = Result<T, Arc<SiftError>>;

/// A convenient macro for creating a SiftError.
#[macro_export]
macro_rules! sift_err {
    (MismatchedTypes: $expected:literal, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::SiftError::MismatchedTypes($expected.into(), $actual.to_string().into(), Backtrace::capture())
        )
    }};
    (MismatchedTypes: $expected:expr, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::SiftError::MismatchedTypes($expected.to_string().into(), $actual.to_string().into(), Backtrace::capture())
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::SiftError::Context($msg.into(), Box::new($err))
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::SiftError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($variant:ident: $err:expr $(,)?) => {
        $crate::__private::must_use(
            $crate::SiftError::$variant($err)
        )
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sift_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a SiftError.
#[macro_export]
macro_rules! sift_bail {
    ($($tt:tt)+) => {
        return Err($crate::sift_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a SiftError in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! sift_panic {
    (Context: $msg:literal, $err:expr) => {{
        $crate::sift_panic!($crate::sift_err!(Context: $msg, $err))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sift_panic!($crate::sift_err!($variant: $fmt, $($arg),*))
    };
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err: $crate::SiftError = $err;
        panic!("{}", err.with_context(format!($fmt, $($arg),*)))
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::sift_panic!($crate::sift_err!($fmt, $($arg),*))
    };
    ($err:expr) => {{
        let err: $crate::SiftError = $err;
        panic!("{}", err)
    }};
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn must_use(error: crate::SiftError) -> crate::SiftError {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bails(flag: bool) -> SiftResult<usize> {
        if flag {
            sift_bail!(UnsafeColumn: "column {} depends on row position", "idx");
        }
        Ok(1)
    }

    #[test]
    fn bail_builds_requested_variant() {
        let err = bails(true).unwrap_err();
        assert!(err.is_unsafe_column());
        assert!(err.to_string().starts_with("column idx depends on row position"));
        assert_eq!(bails(false).unwrap(), 1);
    }

    #[test]
    fn root_cause_looks_through_wrappers() {
        let err = Arc::new(sift_err!(FilterEvaluation: "boom"));
        let wrapped = SiftError::from(err).with_context("computing mask");
        assert!(wrapped.is_filter_evaluation());
        assert!(!wrapped.is_unsafe_column());
        assert!(wrapped.to_string().starts_with("computing mask: boom"));
    }

    #[test]
    fn default_variant_is_invalid_argument() {
        let err = sift_err!("bad input {}", 3);
        assert!(matches!(err, SiftError::InvalidArgument(..)));
    }
}
