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

//! End-to-end: from configuration through to published messages, against a recording client.

use redis_log_appender::{
    client::{Client, ClientFactory, ClientOptions, ErrorHandler, PublishCallback},
    config::{Config, LayoutDescriptor},
    configure_with,
    diagnostics::Diagnostics,
    event::LoggingEvent,
    layer::Layer,
    layout::{Layout, LayoutRegistry, Layouts},
    Error, Result,
};

use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    handlers: Mutex<Vec<ErrorHandler>>,
    published: Mutex<Vec<(String, String)>>,
    callbacks: Mutex<Vec<PublishCallback>>,
    quit: Mutex<bool>,
}

impl Client for Recorder {
    fn on_error(&self, handler: ErrorHandler) {
        self.handlers.lock().unwrap().push(handler);
    }
    fn publish(&self, channel: &str, message: String, callback: PublishCallback) {
        self.published
            .lock()
            .unwrap()
            .push((channel.to_string(), message));
        self.callbacks.lock().unwrap().push(callback);
    }
    fn quit(&self) {
        *self.quit.lock().unwrap() = true;
    }
}

#[derive(Default)]
struct Factory {
    client: Arc<Recorder>,
    calls: Mutex<Vec<(u16, String, ClientOptions)>>,
}

impl ClientFactory for Factory {
    type Error = std::io::Error;
    fn create_client(
        &self,
        port: u16,
        host: &str,
        options: ClientOptions,
    ) -> std::result::Result<Arc<dyn Client>, std::io::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((port, host.to_string(), options));
        Ok(self.client.clone())
    }
}

/// A registry that, like a host framework's, renders pattern layouts its own way
struct FixedPattern;

impl LayoutRegistry for FixedPattern {
    fn message_pass_through_layout(&self) -> Layout {
        Arc::new(|event: &LoggingEvent| event.data[0].clone())
    }
    fn layout(&self, kind: &str, _descriptor: &LayoutDescriptor) -> Result<Layout> {
        if kind == "pattern" {
            Ok(Arc::new(|_: &LoggingEvent| {
                "this is a pattern layout".to_string()
            }))
        } else {
            Ok(self.message_pass_through_layout())
        }
    }
}

fn capture() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    (
        Diagnostics::new(move |line| sink.lock().unwrap().push(line.to_string())),
        lines,
    )
}

#[test]
fn explicit_settings() {
    let factory = Factory::default();
    let (diagnostics, _lines) = capture();
    let config = Config::builder("log")
        .host("123.123.123.123")
        .port(1234)
        .pass("123456")
        .layout(LayoutDescriptor::new("pattern").with_param("pattern", "cheese %m"))
        .build();
    let appender = configure_with(config, &FixedPattern, &factory, diagnostics).unwrap();

    assert_eq!(
        *factory.calls.lock().unwrap(),
        vec![(
            1234,
            "123.123.123.123".to_string(),
            ClientOptions {
                auth_pass: Some("123456".to_string())
            }
        )]
    );

    appender.append(&LoggingEvent::new(vec!["Log event #1"]));
    assert_eq!(
        *factory.client.published.lock().unwrap(),
        vec![("log".to_string(), "this is a pattern layout".to_string())]
    );

    // And with the stock registry, the pattern is actually rendered
    let factory = Factory::default();
    let (diagnostics, _lines) = capture();
    let config = Config::from_json(
        r#"{"type": "redis", "channel": "log", "layout": {"type": "pattern", "pattern": "cheese %m"}}"#,
    )
    .unwrap();
    let appender = configure_with(config, &Layouts::default(), &factory, diagnostics).unwrap();
    appender.append(&LoggingEvent::new(vec!["Log event #1"]));
    assert_eq!(
        *factory.client.published.lock().unwrap(),
        vec![("log".to_string(), "cheese Log event #1".to_string())]
    );
}

#[test]
fn default_settings() {
    let factory = Factory::default();
    let (diagnostics, _lines) = capture();
    let appender = configure_with(
        Config::builder("log").build(),
        &FixedPattern,
        &factory,
        diagnostics,
    )
    .unwrap();

    assert_eq!(
        *factory.calls.lock().unwrap(),
        vec![(6379, "127.0.0.1".to_string(), ClientOptions::default())]
    );

    appender.append(&LoggingEvent::new(vec!["hello"]));
    assert_eq!(
        *factory.client.published.lock().unwrap(),
        vec![("log".to_string(), "hello".to_string())]
    );
}

#[test]
fn runtime_errors_go_to_diagnostics() {
    let factory = Factory::default();
    let (diagnostics, lines) = capture();
    let config = Config::builder("testing").build();
    let appender = configure_with(config, &Layouts::default(), &factory, diagnostics).unwrap();

    for handler in factory.client.handlers.lock().unwrap().iter() {
        handler(&Error::ClientRuntime {
            source: "oh no, error on connect".into(),
            back: backtrace::Backtrace::new(),
        });
    }
    appender.append(&LoggingEvent::new(vec!["something something"]));
    let callback = factory.client.callbacks.lock().unwrap().remove(0);
    callback(Err(Error::Transport {
        source: "oh no, error on publish".into(),
        back: backtrace::Backtrace::new(),
    }));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "redis-log-appender - Error: Redis client error: oh no, error on connect"
    );
    assert_eq!(
        lines[1],
        "redis-log-appender - Error: While publishing to channel 'testing', got Transport error: oh no, error on publish"
    );
}

#[test]
fn shutdown_via_the_layer() {
    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    let factory = Factory::default();
    let (diagnostics, lines) = capture();
    let appender = configure_with(
        Config::builder("log").build(),
        &Layouts::default(),
        &factory,
        diagnostics,
    )
    .unwrap();
    let layer = Layer::new(appender);
    let appender = layer.appender().clone();

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || tracing::info!("just testing"));
    assert_eq!(
        *factory.client.published.lock().unwrap(),
        vec![("log".to_string(), "just testing".to_string())]
    );

    let callback = factory.client.callbacks.lock().unwrap().remove(0);
    callback(Ok(()));
    assert!(lines.lock().unwrap().is_empty());

    let mut done = 0;
    appender.shutdown(|| done += 1);
    assert_eq!(done, 1);
    assert!(*factory.client.quit.lock().unwrap());
}
