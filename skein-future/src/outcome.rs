use std::fmt;

use crate::error::Error;
use crate::failure::Failure;

/// Where a [`Future`] is in its life.
///
/// `Pending` moves to exactly one of the other three states, once.
///
/// [`Future`]: crate::Future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not resolved yet.
    Pending,
    /// Resolved with a value.
    Succeeded,
    /// Resolved with a [`Failure`].
    Failed,
    /// Cancelled before producing a value.
    Cancelled,
}

impl Status {
    /// Returns `true` for every state other than [`Status::Pending`].
    pub fn is_terminal(self) -> bool {
        self != Status::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Succeeded => "succeeded",
            Status::Failed => "failed",
            Status::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The terminal result of a [`Future`].
///
/// [`Future`]: crate::Future
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The computation produced a value.
    Succeeded(T),
    /// The computation failed.
    Failed(Failure),
    /// The computation was cancelled.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns the [`Status`] this outcome corresponds to.
    pub fn status(&self) -> Status {
        match self {
            Outcome::Succeeded(_) => Status::Succeeded,
            Outcome::Failed(_) => Status::Failed,
            Outcome::Cancelled => Status::Cancelled,
        }
    }

    /// Returns the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Convert into a `Result`, mapping failure and cancellation to [`Error`].
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Outcome::Succeeded(value) => Ok(value),
            Outcome::Failed(failure) => Err(Error::failed(failure)),
            Outcome::Cancelled => Err(Error::cancelled()),
        }
    }
}

impl<T> From<Result<T, Failure>> for Outcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(value),
            Err(failure) => Outcome::Failed(failure),
        }
    }
}
