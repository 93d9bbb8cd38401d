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

//! The process-level diagnostic sink.
//!
//! Once an appender is running, nothing that goes wrong on the way to the bus is allowed to reach
//! the host application as an error: publish failures & client errors are written here & then
//! dropped. This deliberately does _not_ go through [`tracing`]; the appender is, after all,
//! probably _part of_ the active subscriber.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html

use std::{fmt::Display, io::Write, sync::Arc};

/// Identifies this appender at the start of each diagnostic line
pub const PREFIX: &str = "redis-log-appender";

/// Where runtime errors get reported; standard error, by default.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

impl Diagnostics {
    /// Report to an arbitrary sink (one line per call, no trailing newline)
    pub fn new<F: Fn(&str) + Send + Sync + 'static>(sink: F) -> Diagnostics {
        Diagnostics {
            sink: Arc::new(sink),
        }
    }
    pub fn stderr() -> Diagnostics {
        Diagnostics::new(|line| {
            // If we can't write to stderr, there's nowhere left to complain to.
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        })
    }
    /// Report `err`; never fails & never panics
    pub fn report(&self, err: &dyn Display) {
        (self.sink)(&format!("{} - Error: {}", PREFIX, err))
    }
}

impl std::default::Default for Diagnostics {
    fn default() -> Self {
        Diagnostics::stderr()
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Diagnostics")
    }
}

#[cfg(test)]
pub(crate) mod testing {

    use super::*;

    use std::sync::Mutex;

    /// A [`Diagnostics`] that remembers every line written to it
    pub fn capture() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        (
            Diagnostics::new(move |line| sink.lock().unwrap().push(line.to_string())),
            lines,
        )
    }
}
