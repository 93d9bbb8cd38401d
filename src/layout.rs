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

//! Layouts: rendering [`LoggingEvent`]s to text.
//!
//! A [`Layout`] is just a function from a [`LoggingEvent`] to a [`String`]. The appender doesn't
//! render anything itself; it asks a [`LayoutRegistry`] for the [`Layout`] named by its
//! configuration (or for the pass-through layout, if none was named).
//!
//! [`Layouts`] is the stock registry. It dispatches on the layout's type tag through a map of
//! factories, so callers may [register](Layouts::register) their own types alongside the
//! built-in ones:
//!
//! | type                 | output                                                  |
//! |----------------------|---------------------------------------------------------|
//! | `messagePassThrough` | the event's message, verbatim                           |
//! | `basic`              | `[2025-06-23T16:10:55.123] [INFO] category - message`   |
//! | `pattern`            | the `pattern` parameter, with `%` specifiers expanded   |
//!
//! # Patterns
//!
//! | specifier    | expands to                                                      |
//! |--------------|-----------------------------------------------------------------|
//! | `%m`         | the message                                                     |
//! | `%p`         | the level                                                       |
//! | `%c`         | the category                                                    |
//! | `%d`         | the timestamp, RFC 3339 with milliseconds                       |
//! | `%d{fmt}`    | the timestamp, formatted with the [chrono] format string `fmt`  |
//! | `%x{name}`   | the structured field `name` (empty if absent)                   |
//! | `%n`         | a newline                                                       |
//! | `%%`         | a literal `%`                                                   |
//!
//! [chrono]: https://docs.rs/chrono/latest/chrono/format/strftime/index.html
//!
//! ```rust
//! use redis_log_appender::config::LayoutDescriptor;
//! use redis_log_appender::event::LoggingEvent;
//! use redis_log_appender::layout::{LayoutRegistry, Layouts};
//!
//! let layouts = Layouts::default();
//! let descriptor = LayoutDescriptor::new("pattern").with_param("pattern", "cheese %m");
//! let layout = layouts.layout(&descriptor.kind, &descriptor).unwrap();
//! assert_eq!(layout(&LoggingEvent::new(vec!["hello"])), "cheese hello");
//! ```

use crate::{
    config::LayoutDescriptor,
    error::{Error, Result},
    event::LoggingEvent,
};

use backtrace::Backtrace;
use chrono::format::{Item, StrftimeItems};
use chrono::SecondsFormat;

use std::{collections::HashMap, fmt::Write, sync::Arc};

/// Render a [`LoggingEvent`] to text
pub type Layout = Arc<dyn Fn(&LoggingEvent) -> String + Send + Sync>;

/// Build a [`Layout`] from a [`LayoutDescriptor`]
pub type LayoutFactory = Box<dyn Fn(&LayoutDescriptor) -> Result<Layout> + Send + Sync>;

pub const MESSAGE_PASS_THROUGH: &str = "messagePassThrough";
pub const BASIC: &str = "basic";
pub const PATTERN: &str = "pattern";

/// The pattern used when a `pattern` layout is configured without one.
pub const DEFAULT_PATTERN: &str = "%d{%H:%M:%S} %p %c - %m%n";

/// The layout-resolution service the appender is configured against.
pub trait LayoutRegistry {
    /// The layout used when none is configured: the event's message, unmodified
    fn message_pass_through_layout(&self) -> Layout;
    /// Resolve the layout of type `kind`, configured by `descriptor`
    fn layout(&self, kind: &str, descriptor: &LayoutDescriptor) -> Result<Layout>;
}

/// The stock [`LayoutRegistry`]; a map from type tag to [`LayoutFactory`].
pub struct Layouts {
    factories: HashMap<String, LayoutFactory>,
}

impl Layouts {
    /// A registry with no layout types registered at all
    pub fn empty() -> Layouts {
        Layouts {
            factories: HashMap::new(),
        }
    }
    /// Register (or replace) the factory for layout type `kind`
    pub fn register<S, F>(&mut self, kind: S, factory: F) -> &mut Layouts
    where
        S: Into<String>,
        F: Fn(&LayoutDescriptor) -> Result<Layout> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
        self
    }
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }
}

impl std::default::Default for Layouts {
    fn default() -> Self {
        let mut layouts = Layouts::empty();
        layouts
            .register(MESSAGE_PASS_THROUGH, |_| Ok(message_pass_through()))
            .register(BASIC, |_| Ok(basic()))
            .register(PATTERN, pattern_from_descriptor);
        layouts
    }
}

impl LayoutRegistry for Layouts {
    fn message_pass_through_layout(&self) -> Layout {
        message_pass_through()
    }
    fn layout(&self, kind: &str, descriptor: &LayoutDescriptor) -> Result<Layout> {
        match self.factories.get(kind) {
            Some(factory) => factory(descriptor),
            None => Err(Error::UnknownLayout {
                kind: kind.to_string(),
                back: Backtrace::new(),
            }),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        built-in layouts                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

pub fn message_pass_through() -> Layout {
    Arc::new(|event: &LoggingEvent| event.message())
}

pub fn basic() -> Layout {
    Arc::new(|event: &LoggingEvent| {
        format!(
            "[{}] [{}] {} - {}",
            event.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f"),
            event.level,
            event.category,
            event.message()
        )
    })
}

/// Compile `pattern` into a [`Layout`]; the pattern is parsed once, here, not per event.
pub fn pattern(pattern: &str) -> Result<Layout> {
    let tokens = parse_pattern(pattern).map_err(|reason| Error::BadLayout {
        kind: PATTERN.to_string(),
        reason,
        back: Backtrace::new(),
    })?;
    Ok(Arc::new(move |event: &LoggingEvent| render(&tokens, event)))
}

fn pattern_from_descriptor(descriptor: &LayoutDescriptor) -> Result<Layout> {
    match descriptor.params.get("pattern") {
        None => pattern(DEFAULT_PATTERN),
        Some(serde_json::Value::String(p)) => pattern(p),
        Some(other) => Err(Error::BadLayout {
            kind: PATTERN.to_string(),
            reason: format!("expected a string pattern, got {}", other),
            back: Backtrace::new(),
        }),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(String),
    Message,
    Level,
    Category,
    /// `None` means RFC 3339
    Date(Option<String>),
    Field(String),
}

fn parse_pattern(pattern: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        let specifier = chars
            .next()
            .ok_or_else(|| "pattern ends with a bare '%'".to_string())?;
        match specifier {
            '%' => literal.push('%'),
            'n' => literal.push('\n'),
            'm' | 'p' | 'c' | 'd' | 'x' => {
                // An optional `{...}` argument follows the specifier
                let arg = if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut arg = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => arg.push(c),
                            None => return Err(format!("unterminated '{{' after '%{}'", specifier)),
                        }
                    }
                    Some(arg)
                } else {
                    None
                };
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(match (specifier, arg) {
                    ('m', _) => Token::Message,
                    ('p', _) => Token::Level,
                    ('c', _) => Token::Category,
                    ('d', Some(fmt)) => {
                        if StrftimeItems::new(&fmt).any(|item| matches!(item, Item::Error)) {
                            return Err(format!("bad date format '{}'", fmt));
                        }
                        Token::Date(Some(fmt))
                    }
                    ('d', None) => Token::Date(None),
                    ('x', Some(name)) => Token::Field(name),
                    _ => return Err("'%x' requires a field name, as in '%x{user}'".to_string()),
                });
            }
            other => return Err(format!("unknown specifier '%{}'", other)),
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn render(tokens: &[Token], event: &LoggingEvent) -> String {
    let mut out = String::new();
    for token in tokens {
        // Writing to a `String` can't fail, and date formats were validated at compile time.
        let _ = match token {
            Token::Literal(s) => write!(out, "{}", s),
            Token::Message => write!(out, "{}", event.message()),
            Token::Level => write!(out, "{}", event.level),
            Token::Category => write!(out, "{}", event.category),
            Token::Date(None) => write!(
                out,
                "{}",
                event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            Token::Date(Some(fmt)) => write!(out, "{}", event.timestamp.format(fmt)),
            Token::Field(name) => write!(out, "{}", event.field(name).unwrap_or("")),
        };
    }
    out
}
