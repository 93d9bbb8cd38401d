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

//! The production [`Client`]: Redis pub/sub, via the [redis] crate.
//!
//! [redis]: https://docs.rs/redis
//!
//! [`RedisClient`] looks synchronous from the outside (every method returns immediately) but owns
//! a worker thread running a single-threaded [tokio] runtime. Commands reach the worker over a
//! channel & are taken in the order they were issued; outcomes come back through the callbacks &
//! error handlers, on the worker thread.
//!
//! [tokio]: https://docs.rs/tokio
//!
//! Publishes are pipelined: each one runs as its own task on the shared multiplexed connection, so
//! the worker doesn't wait for one reply before sending the next command. The runtime polls those
//! tasks in the order they were spawned, so PUBLISH commands go out in issue order; their replies
//! (and so the callbacks) may complete in any order. The only point at which commands pile up
//! behind one another is the initial connect, which is bounded by [`CONNECT_TIMEOUT`].
//!
//! The worker connects lazily, on the first publish, so that error handlers registered right after
//! construction hear about a failed connect. It connects at most once: if the connect fails, or
//! the connection later drops, the failure is reported to the error handlers & every subsequent
//! publish fails. Nothing watches an idle connection, though: a connection that drops while no
//! publish is outstanding is only noticed (and reported) when the next publish fails on it.

use crate::{
    client::{Client, ClientFactory, ClientOptions, ErrorHandler, PublishCallback},
    error::{Error, Result},
};

use backtrace::Backtrace;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, trace};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// How long the worker will wait for a TCP connection (& the Redis handshake) to complete
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

enum Command {
    Publish {
        channel: String,
        message: String,
        callback: PublishCallback,
    },
    Quit,
}

type Handlers = Arc<Mutex<Vec<ErrorHandler>>>;

fn emit(handlers: &Handlers, err: Error) {
    let handlers = handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    for handler in handlers.iter() {
        handler(&err);
    }
}

fn closed() -> Error {
    Error::ClientClosed {
        back: Backtrace::new(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       struct RedisClient                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`Client`] publishing to a Redis server.
pub struct RedisClient {
    commands: mpsc::UnboundedSender<Command>,
    handlers: Handlers,
}

impl RedisClient {
    /// Start a client for the Redis server at `host`:`port`. No connection is attempted until the
    /// first publish.
    pub fn new(port: u16, host: &str, options: ClientOptions) -> Result<RedisClient> {
        if host.is_empty() {
            return Err(Error::Transport {
                source: "no Redis host given".into(),
                back: Backtrace::new(),
            });
        }
        // The password goes in iff one was given; no password means no AUTH at all.
        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(host.to_string(), port),
            redis: redis::RedisConnectionInfo {
                password: options.auth_pass,
                ..Default::default()
            },
        };
        let client = redis::Client::open(info).map_err(Error::transport)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::transport)?;

        let (commands, rx) = mpsc::unbounded_channel();
        let handlers: Handlers = Arc::new(Mutex::new(Vec::new()));
        let worker = Worker {
            client,
            addr: format!("{}:{}", host, port),
            handlers: handlers.clone(),
        };
        std::thread::Builder::new()
            .name(format!("redis-log-appender {}", worker.addr))
            .spawn(move || runtime.block_on(worker.run(rx)))
            .map_err(Error::transport)?;

        debug!("started Redis client for {}:{}", host, port);
        Ok(RedisClient { commands, handlers })
    }
}

impl Client for RedisClient {
    fn on_error(&self, handler: ErrorHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }
    fn publish(&self, channel: &str, message: String, callback: PublishCallback) {
        let command = Command::Publish {
            channel: channel.to_string(),
            message,
            callback,
        };
        // The worker has stopped listening; this client has been quit.
        if let Err(mpsc::error::SendError(Command::Publish { callback, .. })) =
            self.commands.send(command)
        {
            callback(Err(closed()))
        }
    }
    fn quit(&self) {
        // Already quit (or the worker is gone); either way, nothing left to close.
        let _ = self.commands.send(Command::Quit);
    }
}

/// A [`ClientFactory`] handing out [`RedisClient`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedisClientFactory;

impl ClientFactory for RedisClientFactory {
    type Error = Error;
    fn create_client(
        &self,
        port: u16,
        host: &str,
        options: ClientOptions,
    ) -> Result<Arc<dyn Client>> {
        Ok(Arc::new(RedisClient::new(port, host, options)?))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         worker thread                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

enum State {
    Unconnected,
    Connected(MultiplexedConnection),
    Failed(String),
}

struct Worker {
    client: redis::Client,
    addr: String,
    handlers: Handlers,
}

impl Worker {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut state = State::Unconnected;
        // Publishes in flight on the shared connection; reaped as they complete.
        let mut in_flight = JoinSet::new();
        // Set by the first in-flight publish to find the connection gone.
        let dropped = Arc::new(AtomicBool::new(false));
        loop {
            let command = tokio::select! {
                command = commands.recv() => command,
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
            };
            match command {
                Some(Command::Publish {
                    channel,
                    message,
                    callback,
                }) => {
                    if let State::Unconnected = state {
                        state = self.connect().await;
                    }
                    if dropped.load(Ordering::SeqCst) {
                        if let State::Connected(_) = state {
                            state = State::Failed("connection dropped".to_string());
                        }
                    }
                    match &state {
                        State::Connected(conn) => {
                            let mut conn = conn.clone();
                            let handlers = self.handlers.clone();
                            let dropped = dropped.clone();
                            in_flight.spawn(async move {
                                let outcome: redis::RedisResult<i64> =
                                    conn.publish(channel.as_str(), message.as_str()).await;
                                callback(settle(outcome, &channel, &handlers, &dropped));
                            });
                        }
                        State::Failed(reason) => callback(Err(Error::Transport {
                            source: format!("no connection to {}: {}", self.addr, reason).into(),
                            back: Backtrace::new(),
                        })),
                        State::Unconnected => callback(Err(Error::Transport {
                            source: format!("not connected to {}", self.addr).into(),
                            back: Backtrace::new(),
                        })),
                    }
                }
                Some(Command::Quit) | None => {
                    trace!("quitting Redis client for {}", self.addr);
                    break;
                }
            }
        }

        // Anything queued behind the quit is refused, not dropped: every callback gets called.
        commands.close();
        while let Some(command) = commands.recv().await {
            if let Command::Publish { callback, .. } = command {
                callback(Err(closed()));
            }
        }
        // Publishes issued before the quit still run to completion (& call back) before the
        // connection goes away.
        while in_flight.join_next().await.is_some() {}
        debug!("Redis client for {} closed", self.addr);
    }

    async fn connect(&self) -> State {
        let reason = match tokio::time::timeout(
            CONNECT_TIMEOUT,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => {
                debug!("connected to Redis at {}", self.addr);
                return State::Connected(conn);
            }
            Ok(Err(err)) => {
                let reason = err.to_string();
                report(&self.handlers, Box::new(err));
                reason
            }
            Err(elapsed) => {
                let reason = elapsed.to_string();
                report(&self.handlers, Box::new(elapsed));
                reason
            }
        };
        State::Failed(reason)
    }
}

/// Turn the outcome of a single PUBLISH into the result handed to its callback. The first publish
/// to see the connection dropped reports it; the others just fail.
fn settle(
    outcome: redis::RedisResult<i64>,
    channel: &str,
    handlers: &Handlers,
    dropped: &AtomicBool,
) -> Result<()> {
    match outcome {
        Ok(receivers) => {
            trace!("published to {} ({} receivers)", channel, receivers);
            Ok(())
        }
        Err(err) => {
            if err.is_connection_dropped() && !dropped.swap(true, Ordering::SeqCst) {
                report(handlers, err.to_string().into());
            }
            Err(Error::transport(err))
        }
    }
}

fn report(handlers: &Handlers, source: Box<dyn std::error::Error + Send + Sync + 'static>) {
    emit(
        handlers,
        Error::ClientRuntime {
            source,
            back: Backtrace::new(),
        },
    )
}
