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

//! The publishing adapter, and the entry point that configures one.
//!
//! An [`Appender`] renders each [`LoggingEvent`] through its [`Layout`] & publishes the result
//! to its channel. It holds exactly one [`Client`] for its entire life, & never reconnects or
//! replaces it. Failures after construction are reported to the [`Diagnostics`] sink & otherwise
//! ignored: a log line that failed to ship must never take the host application down with it.
//!
//! ```no_run
//! use redis_log_appender::{configure, config::Config, event::LoggingEvent, layout::Layouts};
//!
//! let appender = configure(Config::builder("log").build(), &Layouts::default()).unwrap();
//! appender.append(&LoggingEvent::new(vec!["hello"]));
//! appender.shutdown(|| println!("done"));
//! ```

use crate::{
    client::{resolve, Client, ClientFactory},
    config::Config,
    diagnostics::Diagnostics,
    error::{Error, Result},
    event::LoggingEvent,
    layout::{Layout, LayoutRegistry},
    transport::RedisClientFactory,
};

use backtrace::Backtrace;
use tracing::debug;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

struct Inner {
    client: Arc<dyn Client>,
    channel: String,
    layout: Layout,
    diagnostics: Diagnostics,
    quit: AtomicBool,
}

/// A handle on a publishing adapter; clones share the same client.
#[derive(Clone)]
pub struct Appender {
    inner: Arc<Inner>,
}

impl Appender {
    /// Wrap `client`, reporting runtime errors to standard error
    pub fn new<S: Into<String>>(client: Arc<dyn Client>, channel: S, layout: Layout) -> Appender {
        Appender::with_diagnostics(client, channel, layout, Diagnostics::stderr())
    }
    /// Wrap `client`, reporting runtime errors to `diagnostics`.
    ///
    /// Registers an error observer on `client` as a side-effect.
    pub fn with_diagnostics<S: Into<String>>(
        client: Arc<dyn Client>,
        channel: S,
        layout: Layout,
        diagnostics: Diagnostics,
    ) -> Appender {
        let observer = diagnostics.clone();
        client.on_error(Box::new(move |err: &Error| observer.report(err)));
        Appender {
            inner: Arc::new(Inner {
                client,
                channel: channel.into(),
                layout,
                diagnostics,
                quit: AtomicBool::new(false),
            }),
        }
    }
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }
    /// Render `event` & publish it. Returns as soon as the publish has been issued.
    pub fn append(&self, event: &LoggingEvent) {
        let message = (self.inner.layout)(event);
        let channel = self.inner.channel.clone();
        let diagnostics = self.inner.diagnostics.clone();
        self.inner.client.publish(
            &self.inner.channel,
            message,
            Box::new(move |result: Result<()>| {
                if let Err(err) = result {
                    diagnostics.report(&Error::Publish {
                        channel,
                        source: Box::new(err),
                        back: Backtrace::new(),
                    });
                }
            }),
        );
    }
    /// Ask the client to quit, then invoke `done`.
    ///
    /// This neither waits for the client to finish closing nor for in-flight publishes to
    /// drain. Only the first call reaches the client; `done` is invoked on every call.
    pub fn shutdown<F: FnOnce()>(&self, done: F) {
        if !self.inner.quit.swap(true, Ordering::SeqCst) {
            debug!("shutting down appender for channel {}", self.inner.channel);
            self.inner.client.quit();
        }
        done()
    }
}

impl std::fmt::Debug for Appender {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Appender")
            .field("channel", &self.inner.channel)
            .field("quit", &self.inner.quit.load(Ordering::SeqCst))
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          entry points                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Stand-up an [`Appender`] publishing to Redis, reporting runtime errors on standard error.
pub fn configure<R: LayoutRegistry + ?Sized>(config: Config, layouts: &R) -> Result<Appender> {
    configure_with(config, layouts, &RedisClientFactory, Diagnostics::stderr())
}

/// Stand-up an [`Appender`] with a caller-chosen client factory & diagnostic sink.
///
/// The layout is `layouts`' pass-through layout unless `config` names one. Client-creation
/// failures come back as [`Error::ClientCreation`], unmodified.
pub fn configure_with<R, F>(
    config: Config,
    layouts: &R,
    factory: &F,
    diagnostics: Diagnostics,
) -> Result<Appender>
where
    R: LayoutRegistry + ?Sized,
    F: ClientFactory + ?Sized,
{
    let layout = match &config.layout {
        None => layouts.message_pass_through_layout(),
        Some(descriptor) => layouts.layout(&descriptor.kind, descriptor)?,
    };
    let client = resolve(&config, factory)?;
    debug!("configured appender for channel {}", config.channel);
    Ok(Appender::with_diagnostics(
        client,
        config.channel,
        layout,
        diagnostics,
    ))
}
