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

//! Test publishing to channel "log" on the Redis server at 127.0.0.1:6379.
//!
//! Run `redis-cli subscribe log` in another terminal first, to watch the messages arrive.

use redis_log_appender::{
    config::{Config, LayoutDescriptor},
    configure,
    layer::Layer,
    layout::Layouts,
};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let config = Config::builder("log")
        .layout(LayoutDescriptor::new("pattern").with_param("pattern", "%d %p %c - %m"))
        .build();
    let layer = Layer::new(configure(config, &Layouts::default()).unwrap());
    let appender = layer.appender().clone();

    // Setup the real subsriber...
    let subscriber = Registry::default().with(layer);
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, Redis.");
    debug!("你好, Redis.");
    info!("你好, Redis.");
    warn!("你好, Redis.");
    error!("你好, Redis.");

    // Shutdown doesn't wait for in-flight publishes, so give them a moment.
    std::thread::sleep(std::time::Duration::from_millis(500));
    appender.shutdown(|| eprintln!("appender shut down"));
}
