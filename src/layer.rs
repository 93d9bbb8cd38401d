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

//! The [`tracing-subscriber`] [`Layer`] binding.
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`Layer`] translates each [`tracing`] [`Event`] into a [`LoggingEvent`] & hands it to an
//! [`Appender`]. Events emitted by this crate itself are skipped: the appender logs its own
//! lifecycle through [`tracing`], and publishing _those_ would mean every publish begets another.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html

use crate::{
    appender::{configure, Appender},
    config::Config,
    error::Result,
    event::LoggingEvent,
    layout::Layouts,
};

use tracing::Event;
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to recover the original target of
// events that came from the `log` crate (they'd otherwise all show up with the target "log").
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .map(|rest| rest.is_empty() || rest.starts_with("::"))
        .unwrap_or(false)
}

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that publishes [`Event`]s to a
/// Redis channel.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html
pub struct Layer {
    appender: Appender,
}

impl Layer {
    pub fn new(appender: Appender) -> Layer {
        Layer { appender }
    }
    /// Attempt to construct a [`Layer`] that will publish each event's message, as-is, to
    /// `channel` on the Redis server at 127.0.0.1:6379
    pub fn try_new<S: Into<String>>(channel: S) -> Result<Layer> {
        Ok(Layer {
            appender: configure(Config::builder(channel).build(), &Layouts::default())?,
        })
    }
    /// The [`Appender`] behind this layer; hang on to a clone to shut it down later
    pub fn appender(&self) -> &Appender {
        &self.appender
    }
}

impl<S> tracing_subscriber::layer::Layer<S> for Layer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // For native tracing events, normalized_metadata() returns None and we use the event's
        // own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        if is_own_target(meta.target()) {
            return;
        }
        self.appender
            .append(&LoggingEvent::from_tracing(event, meta.target()));
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::{
        client::testing::FakeClient, diagnostics::testing::capture, layout::LayoutRegistry,
    };

    use std::sync::Arc;

    use tracing::{debug, error, info, trace, warn};
    use tracing_subscriber::{
        layer::SubscriberExt, // Needed to get `with()`
        registry::Registry,
    };

    #[test]
    fn own_targets() {
        assert!(is_own_target("redis_log_appender"));
        assert!(is_own_target("redis_log_appender::transport"));
        assert!(!is_own_target("redis_log_appender_tests"));
        assert!(!is_own_target("app"));
    }

    #[test]
    fn events_are_published() {
        let client = Arc::new(FakeClient::default());
        let (diagnostics, lines) = capture();
        let appender = Appender::with_diagnostics(
            client.clone(),
            "log",
            crate::layout::pattern("%p %c %m").unwrap(),
            diagnostics,
        );
        let layer = Layer::new(appender);
        let handle = layer.appender().clone();

        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            trace!(target: "app", "Hello, 世界!");
            debug!(target: "app", "Hello, 世界!");
            info!(target: "app", "Hello, 世界!");
            warn!(target: "app", "Hello, 世界!");
            error!(target: "app", "Hello, 世界!");
            // This crate's own chatter must not be published
            info!(target: "redis_log_appender::transport", "internal");
        });

        let messages: Vec<String> = client.published().into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            messages,
            vec![
                "TRACE app Hello, 世界!",
                "DEBUG app Hello, 世界!",
                "INFO app Hello, 世界!",
                "WARN app Hello, 世界!",
                "ERROR app Hello, 世界!",
            ]
        );
        assert!(lines.lock().unwrap().is_empty());

        let mut done = false;
        handle.shutdown(|| done = true);
        assert!(done);
        assert_eq!(client.quits(), 1);
    }

    #[test]
    fn pass_through_by_default() {
        let client = Arc::new(FakeClient::default());
        let (diagnostics, _lines) = capture();
        let appender = Appender::with_diagnostics(
            client.clone(),
            "log",
            Layouts::default().message_pass_through_layout(),
            diagnostics,
        );
        let subscriber = Registry::default().with(Layer::new(appender));
        tracing::subscriber::with_default(subscriber, || info!("hello"));
        assert_eq!(
            client.published(),
            vec![("log".to_string(), "hello".to_string())]
        );
    }
}
