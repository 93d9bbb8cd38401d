// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of redis-log-appender.
//
// redis-log-appender is free software: you can redistribute it and/or modify it under the terms of
// the GNU General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// redis-log-appender is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// redis-log-appender.  If not, see <http://www.gnu.org/licenses/>.
//! [redis-log-appender](crate) errors

use backtrace::Backtrace;

/// [redis-log-appender](crate) error type
///
/// [redis-log-appender](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor
/// of a straightforward enumeration with a few match arms chosen on the basis of what the caller
/// will need to respond.
///
/// Some variants are never returned to a caller at all: [`Error::ClientRuntime`] and
/// [`Error::Publish`] describe failures that happen after the appender is up & running, and are
/// only ever written to the [`Diagnostics`] sink.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
/// [`Diagnostics`]: crate::diagnostics::Diagnostics
#[non_exhaustive]
pub enum Error {
    /// A JSON configuration could not be parsed
    BadConfig {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// A layout descriptor named a known layout, but its parameters were unusable
    BadLayout {
        kind: String,
        reason: String,
        back: Backtrace,
    },
    /// The client was asked to do something after `quit()`
    ClientClosed { back: Backtrace },
    /// Failed to construct a client
    ClientCreation {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The client reported an error asynchronously (a failed connect, a dropped connection)
    ClientRuntime {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A publish failed; the message is lost
    Publish {
        channel: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A layout descriptor named a layout the registry doesn't know
    UnknownLayout { kind: String, back: Backtrace },
}

impl Error {
    pub(crate) fn transport<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { source, .. } => write!(f, "Bad appender configuration: {}", source),
            Error::BadLayout { kind, reason, .. } => {
                write!(f, "Bad parameters for layout '{}': {}", kind, reason)
            }
            Error::ClientClosed { .. } => write!(f, "The Redis client has been closed"),
            Error::ClientCreation { source, .. } => {
                write!(f, "Failed to get redis client: {}", source)
            }
            Error::ClientRuntime { source, .. } => write!(f, "Redis client error: {}", source),
            Error::Publish {
                channel, source, ..
            } => write!(f, "While publishing to channel '{}', got {}", channel, source),
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            Error::UnknownLayout { kind, .. } => write!(f, "No layout of type '{}'", kind),
            _ => write!(f, "Other redis-log-appender error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadLayout { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::ClientClosed { back } => write!(f, "{}\n{:?}", self, back),
            Error::ClientCreation { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::ClientRuntime { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Publish { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::UnknownLayout { kind: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "redis-log-appender error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BadConfig { source, .. } => Some(source),
            Error::ClientCreation { source, .. }
            | Error::ClientRuntime { source, .. }
            | Error::Publish { source, .. }
            | Error::Transport { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
