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

//! The host-neutral log event.
//!
//! Layouts render [`LoggingEvent`]s, not [`tracing`] [`Event`]s. That keeps the appender usable
//! from hosts other than [`tracing`] (and keeps it testable without one). The [`tracing`] binding
//! lives in [`LoggingEvent::from_tracing`].
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html

use chrono::prelude::*;

/// A single structured log event, as handed to a [`Layout`](crate::layout::Layout).
#[derive(Clone, Debug, PartialEq)]
pub struct LoggingEvent {
    pub timestamp: DateTime<Utc>,
    pub level: tracing::Level,
    /// The logger name; for [`tracing`] events, the target
    pub category: String,
    /// The primary message content
    pub data: Vec<String>,
    /// Every other field recorded on the event, in recording order
    pub fields: Vec<(String, String)>,
}

impl LoggingEvent {
    /// An INFO event stamped "now" in category "default"
    pub fn new<S: Into<String>>(data: Vec<S>) -> LoggingEvent {
        LoggingEvent {
            timestamp: Utc::now(),
            level: tracing::Level::INFO,
            category: "default".to_string(),
            data: data.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
        }
    }
    pub fn with_level(mut self, level: tracing::Level) -> LoggingEvent {
        self.level = level;
        self
    }
    pub fn with_category<S: Into<String>>(mut self, category: S) -> LoggingEvent {
        self.category = category.into();
        self
    }
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> LoggingEvent {
        self.timestamp = timestamp;
        self
    }
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
    /// The primary message: `data` joined by single spaces
    pub fn message(&self) -> String {
        self.data.join(" ")
    }
    /// Look up a structured field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
    /// Translate a [`tracing`] [`Event`] into a [`LoggingEvent`].
    ///
    /// The "message" field becomes the sole element of `data`; every other field is recorded in
    /// `fields`. An event with no message field has empty `data`.
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    /// [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html
    pub fn from_tracing(event: &tracing::Event<'_>, category: &str) -> LoggingEvent {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        LoggingEvent {
            timestamp: Utc::now(),
            level: *event.metadata().level(),
            category: category.to_string(),
            data: visitor.message.into_iter().collect(),
            fields: visitor.fields,
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros "pre-format" the `message` field so that `value` is really a
        // `std::fmt::Arguments`, which prints in debug format without enclosing double-quotes.
        let text = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.fields.push((field.name().to_string(), text));
        }
    }
}
