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

//! The message-bus client contract, and resolving a client from a [`Config`].
//!
//! The appender depends on exactly three client operations: registering an error observer,
//! publishing a message with a completion callback, and quitting. [`Client`] captures those;
//! [`ClientFactory`] captures how one is made from a host, a port & [`ClientOptions`].
//! [`RedisClient`](crate::transport::RedisClient) & [`RedisClientFactory`](crate::transport::RedisClientFactory)
//! are the production implementations.

use crate::{
    config::Config,
    error::{Error, Result},
};

use backtrace::Backtrace;
use tracing::debug;

use std::sync::Arc;

/// Invoked with the outcome of a single publish
pub type PublishCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Invoked for each error the client reports asynchronously
pub type ErrorHandler = Box<dyn Fn(&Error) + Send + Sync + 'static>;

/// Operations the appender requires of its message-bus client.
///
/// All three are non-blocking: `publish` & `quit` merely _initiate_ their operations, and
/// whatever outcome there is arrives later, on whatever thread the implementation chooses.
pub trait Client: Send + Sync {
    /// Register `handler` to be told of asynchronous client errors (failed connects, dropped
    /// connections, and so forth)
    fn on_error(&self, handler: ErrorHandler);
    /// Publish `message` to `channel`; `callback` will be invoked exactly once with the outcome
    fn publish(&self, channel: &str, message: String, callback: PublishCallback);
    /// Close the connection. Does not wait for the close to complete.
    fn quit(&self);
}

/// Options passed to [`ClientFactory::create_client`] alongside host & port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// The credential to authenticate with; `None` means "don't authenticate at all"
    pub auth_pass: Option<String>,
}

/// Creates connected (or connecting) [`Client`]s.
pub trait ClientFactory {
    type Error: std::error::Error + Send + Sync + 'static;
    fn create_client(
        &self,
        port: u16,
        host: &str,
        options: ClientOptions,
    ) -> std::result::Result<Arc<dyn Client>, Self::Error>;
}

/// Produce the [`Client`] an appender configured by `config` should use.
///
/// A client supplied in `config` is returned as-is & `factory` is never consulted; otherwise
/// `factory` is asked for a new one. A factory failure is reported as
/// [`Error::ClientCreation`], which embeds the factory's own message.
pub fn resolve<F: ClientFactory + ?Sized>(config: &Config, factory: &F) -> Result<Arc<dyn Client>> {
    if let Some(client) = &config.client {
        debug!("using caller-supplied client for channel {}", config.channel);
        return Ok(client.clone());
    }

    let options = ClientOptions {
        auth_pass: config.pass().map(str::to_string),
    };
    debug!(
        "creating client for {}:{} (authenticated: {})",
        config.host(),
        config.port(),
        options.auth_pass.is_some()
    );
    factory
        .create_client(config.port(), config.host(), options)
        .map_err(|err| Error::ClientCreation {
            source: Box::new(err),
            back: Backtrace::new(),
        })
}


#[cfg(test)]
mod tests {

    use super::testing::{FakeClient, FakeFactory};
    use super::*;

    #[test]
    fn supplied_client_is_reused() {
        let supplied: Arc<dyn Client> = Arc::new(FakeClient::default());
        let config = Config::builder("log")
            .client(supplied.clone())
            .host("123.123.123.123")
            .build();
        let factory = FakeFactory::default();

        let client = resolve(&config, &factory).unwrap();
        assert!(Arc::ptr_eq(&client, &supplied));
        assert!(factory.calls().is_empty());
    }

    #[test]
    fn defaults_without_credentials() {
        let factory = FakeFactory::default();
        resolve(&Config::builder("log").build(), &factory).unwrap();
        assert_eq!(
            factory.calls(),
            vec![(6379, "127.0.0.1".to_string(), ClientOptions::default())]
        );
    }

    #[test]
    fn explicit_host_port_and_credentials() {
        let factory = FakeFactory::default();
        let config = Config::builder("log")
            .host("123.123.123.123")
            .port(1234)
            .pass("123456")
            .build();
        resolve(&config, &factory).unwrap();
        assert_eq!(
            factory.calls(),
            vec![(
                1234,
                "123.123.123.123".to_string(),
                ClientOptions {
                    auth_pass: Some("123456".to_string())
                }
            )]
        );
    }

    #[test]
    fn empty_settings_fall_back_to_defaults() {
        let factory = FakeFactory::default();
        let config = Config::builder("log").host("").port(0).pass("").build();
        resolve(&config, &factory).unwrap();

        let config = Config::from_json(r#"{"channel": "log", "host": "", "port": 0, "pass": ""}"#)
            .unwrap();
        resolve(&config, &factory).unwrap();

        assert_eq!(
            factory.calls(),
            vec![
                (6379, "127.0.0.1".to_string(), ClientOptions::default()),
                (6379, "127.0.0.1".to_string(), ClientOptions::default()),
            ]
        );
    }

    #[test]
    fn factory_failure_is_wrapped() {
        let factory = FakeFactory::failing("Failed in createClient");
        match resolve(&Config::builder("log").build(), &factory) {
            Err(err @ Error::ClientCreation { .. }) => {
                assert!(format!("{}", err).contains("Failed in createClient"))
            }
            Err(err) => panic!("unexpected error {:?}", err),
            Ok(_) => panic!("resolve should have failed"),
        }
    }
}
