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

//! Appender configuration.
//!
//! A [`Config`] may be assembled in code via [`Config::builder`]:
//!
//! ```rust
//! use redis_log_appender::config::{Config, LayoutDescriptor};
//!
//! let config = Config::builder("log")
//!     .host("123.123.123.123")
//!     .port(1234)
//!     .pass("123456")
//!     .layout(LayoutDescriptor::new("pattern").with_param("pattern", "cheese %m"))
//!     .build();
//! assert_eq!(config.port(), 1234);
//! ```
//!
//! or read from JSON, using the same keys:
//!
//! ```rust
//! use redis_log_appender::config::Config;
//!
//! let config = Config::from_json(r#"{"type": "redis", "channel": "log"}"#).unwrap();
//! assert_eq!(config.host(), "127.0.0.1");
//! assert_eq!(config.port(), 6379);
//! ```

use crate::{
    client::Client,
    error::{Error, Result},
};

use backtrace::Backtrace;
use serde::{Deserialize, Serialize};

use std::sync::Arc;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;

/// Names a layout type, along with any type-specific parameters.
///
/// In JSON, the type goes under the key `type` and the parameters sit alongside it:
/// `{"type": "pattern", "pattern": "cheese %m"}`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LayoutDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl LayoutDescriptor {
    pub fn new<S: Into<String>>(kind: S) -> LayoutDescriptor {
        LayoutDescriptor {
            kind: kind.into(),
            params: serde_json::Map::new(),
        }
    }
    pub fn with_param<K, V>(mut self, name: K, value: V) -> LayoutDescriptor
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Everything needed to stand-up an [`Appender`](crate::appender::Appender).
#[derive(Clone, Deserialize)]
pub struct Config {
    /// A client built (and owned) by the caller; if present, host, port & pass are ignored
    #[serde(skip)]
    pub client: Option<Arc<dyn Client>>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub pass: Option<String>,
    pub channel: String,
    pub layout: Option<LayoutDescriptor>,
}

impl Config {
    pub fn builder<S: Into<String>>(channel: S) -> ConfigBuilder {
        ConfigBuilder {
            config: Config {
                client: None,
                host: None,
                port: None,
                pass: None,
                channel: channel.into(),
                layout: None,
            },
        }
    }
    pub fn from_json(text: &str) -> Result<Config> {
        serde_json::from_str(text).map_err(|err| Error::BadConfig {
            source: err,
            back: Backtrace::new(),
        })
    }
    pub fn from_value(value: serde_json::Value) -> Result<Config> {
        serde_json::from_value(value).map_err(|err| Error::BadConfig {
            source: err,
            back: Backtrace::new(),
        })
    }
    /// The configured host, or 127.0.0.1 if none (or an empty one) was given
    pub fn host(&self) -> &str {
        self.host
            .as_deref()
            .filter(|host| !host.is_empty())
            .unwrap_or(DEFAULT_HOST)
    }
    /// The configured port, or 6379 if none (or zero) was given
    pub fn port(&self) -> u16 {
        self.port.filter(|port| *port != 0).unwrap_or(DEFAULT_PORT)
    }
    /// The configured credential; an empty one counts as no credential at all
    pub fn pass(&self) -> Option<&str> {
        self.pass.as_deref().filter(|pass| !pass.is_empty())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("channel", &self.channel)
            .field("layout", &self.layout)
            .finish()
    }
}

/// Builder for [`Config`]; only the channel is required.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.config.client = Some(client);
        self
    }
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = Some(host.into());
        self
    }
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }
    pub fn pass<S: Into<String>>(mut self, pass: S) -> Self {
        self.config.pass = Some(pass.into());
        self
    }
    pub fn layout(mut self, layout: LayoutDescriptor) -> Self {
        self.config.layout = Some(layout);
        self
    }
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn from_json() {
        let config = Config::from_json(
            r#"{
                "type": "redis",
                "host": "123.123.123.123",
                "port": 1234,
                "pass": "123456",
                "channel": "log",
                "layout": { "type": "pattern", "pattern": "cheese %m" }
            }"#,
        )
        .unwrap();
        assert!(config.client.is_none());
        assert_eq!(config.host(), "123.123.123.123");
        assert_eq!(config.port(), 1234);
        assert_eq!(config.pass.as_deref(), Some("123456"));
        assert_eq!(config.channel, "log");
        assert_eq!(
            config.layout,
            Some(LayoutDescriptor::new("pattern").with_param("pattern", "cheese %m"))
        );

        let config = Config::from_value(serde_json::json!({"channel": "log"})).unwrap();
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert!(config.pass.is_none());
        assert!(config.layout.is_none());
    }

    #[test]
    fn channel_is_required() {
        assert!(matches!(
            Config::from_json(r#"{"host": "localhost"}"#),
            Err(Error::BadConfig { .. })
        ));
        assert!(matches!(
            Config::from_json(r#"{"channel": "log", "port": "six"}"#),
            Err(Error::BadConfig { .. })
        ));
    }

    #[test]
    fn debug_hides_the_password() {
        let config = Config::builder("log").pass("hunter2").build();
        let text = format!("{:?}", config);
        assert!(!text.contains("hunter2"));
        assert!(text.contains("<redacted>"));
    }
}
