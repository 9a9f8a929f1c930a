//! The type-erased failure payload carried by a failed [`Future`].
//!
//! [`Future`]: crate::Future
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Why a [`Future`] failed.
///
/// A [`Failure`] wraps any `std::error::Error + Send + Sync` value behind an
/// [`Arc`], so cloning it while it travels through a chain of combinators is
/// cheap and keeps the original payload intact. Use
/// [`Failure::downcast_ref`] to get the concrete error back.
///
/// ```rust
/// use skein_future::{Failure, Promise};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("disk full")]
/// struct DiskFull;
///
/// let promise = Promise::<u32>::new();
/// let future = promise.future().map(|v| v + 1);
/// promise.failure(DiskFull).unwrap();
/// assert!(future.error().unwrap().is::<DiskFull>());
/// ```
///
/// [`Future`]: crate::Future
#[derive(Clone)]
pub struct Failure {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Failure {
    /// Wrap `error` in a [`Failure`].
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Construct a [`Failure`] from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns a reference to the payload if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` if the payload is of type `E`.
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.inner.is::<E>()
    }

    /// Returns `true` if both failures carry the very same payload.
    pub fn ptr_eq(this: &Failure, other: &Failure) -> bool {
        Arc::as_ptr(&this.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }

    /// Returns the payload as a `std::error::Error`.
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
struct Message(String);

/// Failure payload recorded when user code panics inside a task or a
/// combinator.
#[derive(thiserror::Error, Debug, Clone)]
#[error("panicked: {message}")]
pub struct Panicked {
    message: String,
}

impl Panicked {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure payload recorded by [`Future::filter`] when the predicate
/// rejects the value.
///
/// [`Future::filter`]: crate::Future::filter
#[derive(thiserror::Error, Debug, Clone, Copy, Default)]
#[error("value rejected by filter")]
pub struct Rejected;

/// Failure payload seen by [`Future::recover`] and the other failure
/// handlers when the future they observe was cancelled.
///
/// [`Future::recover`]: crate::Future::recover
#[derive(thiserror::Error, Debug, Clone, Copy, Default)]
#[error("cancelled")]
pub struct Cancelled;
