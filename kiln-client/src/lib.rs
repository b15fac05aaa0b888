// Copyright ⓒ 2024-2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Kiln Client
//!
//! A client for a single broker: one connection, one request in flight.
//!
//! [`Connection`] frames a request, stamps it with the next correlation id,
//! writes it to the stream and reads back exactly one response frame.
//! [`Client`] wraps a connection with the operations of the command line:
//! creating a topic, producing a message and looking up topic metadata.

use std::{
    fmt, io,
    sync::{Arc, LazyLock},
    time::Duration,
};

use bytes::Bytes;
use kiln_sans_io::{
    CreateTopicsRequest, CreateTopicsResponse, Exchange, MetadataRequest, MetadataResponse,
    ProduceRequest, Response,
};
use opentelemetry::{InstrumentationScope, global, metrics::Meter};
use opentelemetry_semantic_conventions::SCHEMA_URL;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::debug;
use url::Url;

mod connection;

pub use connection::Connection;

/// The dial timeout used when none is supplied.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum Error {
    ConnectTimeout,
    CorrelationMismatch { expected: i32, received: i32 },
    EmptyResponse { topic: String },
    Io(Arc<io::Error>),
    Protocol(#[from] kiln_sans_io::Error),
    Rejected {
        error: kiln_sans_io::Error,
        response: Box<Response>,
    },
    UnknownHost(Url),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(error) | Self::Rejected { error, .. } => write!(f, "{error}"),
            error => write!(f, "{error:?}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_value: tokio::time::error::Elapsed) -> Self {
        Self::ConnectTimeout
    }
}

impl Error {
    /// the broker error code that rejected a request, if any
    pub fn api_error(&self) -> Option<&kiln_sans_io::Error> {
        match self {
            Self::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) static METER: LazyLock<Meter> = LazyLock::new(|| {
    global::meter_with_scope(
        InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
});

/// A client of a single broker.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    connection: Connection<S>,
}

impl Client {
    /// build a client with a broker endpoint
    pub fn builder(broker: Url) -> Builder {
        Builder::broker(broker)
    }
}

impl<S> From<Connection<S>> for Client<S> {
    fn from(connection: Connection<S>) -> Self {
        Self { connection }
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// the underlying broker connection
    pub fn connection(&mut self) -> &mut Connection<S> {
        &mut self.connection
    }

    /// make a typed API request to the broker
    pub async fn call<Q>(&mut self, request: Q) -> Result<Q::Response>
    where
        Q: Exchange,
    {
        self.connection.call(request).await
    }

    /// create a topic, waiting for the broker's default timeout
    pub async fn create_topic(
        &mut self,
        name: &str,
        partitions: i32,
        replication_factor: i16,
    ) -> Result<CreateTopicsResponse> {
        debug!(name, partitions, replication_factor);

        self.call(
            CreateTopicsRequest::default()
                .topic(name)
                .partitions(partitions)
                .replication_factor(replication_factor),
        )
        .await
    }

    /// produce a single message to partition 0 of a topic, returning its offset
    pub async fn produce(
        &mut self,
        topic: &str,
        key: Option<Bytes>,
        value: Option<Bytes>,
    ) -> Result<i64> {
        debug!(topic, ?key, ?value);

        self.call(ProduceRequest::default().topic(topic).key(key).value(value))
            .await
            .and_then(|response| {
                response
                    .topics
                    .first()
                    .and_then(|topic| topic.partitions.first())
                    .map(|partition| partition.base_offset)
                    .ok_or(Error::EmptyResponse {
                        topic: topic.into(),
                    })
            })
            .inspect(|base_offset| debug!(base_offset))
    }

    /// topic metadata from the broker
    pub async fn metadata(
        &mut self,
        topic: &str,
        partitions: i32,
        replication_factor: i16,
    ) -> Result<MetadataResponse> {
        debug!(topic, partitions, replication_factor);

        self.call(
            MetadataRequest::default()
                .topic(topic)
                .partitions(partitions)
                .replication_factor(replication_factor),
        )
        .await
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Builder {
    broker: Url,
    client_id: Option<String>,
    connect_timeout: Duration,
}

impl Builder {
    /// broker url
    pub fn broker(broker: Url) -> Self {
        Self {
            broker,
            client_id: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// client id used when making requests to the broker
    pub fn client_id(self, client_id: Option<String>) -> Self {
        Self { client_id, ..self }
    }

    /// give up when a connection is not established within this duration
    pub fn connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    /// connect to the broker
    pub async fn build(self) -> Result<Client> {
        Connection::connect_timeout(&self.broker, self.connect_timeout)
            .await
            .map(|connection| connection.client_id(self.client_id))
            .map(Client::from)
    }
}
