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
//! A [`tracing-subscriber`] [`Layer`] implementation for publishing [`tracing`] [`Event`]s to a
//! [Redis] pub/sub channel
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html
//! [Redis]: https://redis.io/docs/latest/develop/interact/pubsub/
//!
//! # Introduction
//!
//! Shipping logs over pub/sub lets any number of other processes watch an application's logs in
//! real time (`redis-cli subscribe log` will do), without the application knowing or caring who,
//! if anyone, is listening.
//!
//! The translation from a log event to a published message happens in two steps:
//!
//! 1. rendering the event to text via a [`Layout`](layout::Layout)
//! 2. publishing that text to a channel via a [`Client`](client::Client)
//!
//! An [`Appender`](appender::Appender) ties one of each together (along with the channel name),
//! and [`Layer`](layer::Layer) plugs an [`Appender`](appender::Appender) in to a [`tracing`]
//! subscriber.
//!
//! The appender never lets a failure on the bus reach the application. Once it's been configured,
//! failed publishes & client errors are written to standard error (see [`diagnostics`]) and
//! otherwise dropped; nothing is retried & nothing is buffered.
//!
//! # Usage
//!
//! ```no_run
//! use tracing::info;
//! use redis_log_appender::layer::Layer;
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! // Publish each event's message, verbatim, to channel "log" on 127.0.0.1:6379.
//! let layer = Layer::try_new("log").unwrap();
//! let appender = layer.appender().clone();
//! let subscriber = Registry::default().with(layer);
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!("Hello, world!");
//!
//! appender.shutdown(|| ());
//! ```
//!
//! Host, port, credentials & layout are all configurable:
//!
//! ```no_run
//! use redis_log_appender::{configure, config::{Config, LayoutDescriptor}, layer::Layer, layout::Layouts};
//!
//! let config = Config::builder("log")
//!     .host("some.other.host")
//!     .port(6380)
//!     .pass("sekrit")
//!     .layout(LayoutDescriptor::new("pattern").with_param("pattern", "%d %p %c - %m"))
//!     .build();
//! let layer = Layer::new(configure(config, &Layouts::default()).unwrap());
//! ```

pub mod appender;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod layer;
pub mod layout;
pub mod transport;

pub use appender::{configure, configure_with, Appender};
pub use error::{Error, Result};
