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

use std::{
    io,
    net::SocketAddr,
    sync::LazyLock,
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use kiln_sans_io::{ErrorCodes as _, Exchange, Frame, Request, Response, primitive::Encode as _};
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _},
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tracing::{Instrument, Level, debug, error, span};
use url::Url;

use crate::{Error, METER, Result};

/// A broker connection with a correlation id.
///
/// Every exchange borrows the connection mutably, so at most one request is
/// in flight at a time.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    correlation_id: i32,
    client_id: Option<String>,
}

impl Connection {
    /// connect to a `tcp://host:port` broker
    pub async fn connect(broker: &Url) -> Result<Self> {
        debug!(%broker);

        let attributes = [KeyValue::new("broker", broker.to_string())];
        let start = SystemTime::now();

        TcpStream::connect(&socket_addrs(broker).await?[..])
            .await
            .inspect(|_| TCP_CONNECT_DURATION.record(elapsed_millis(start), &attributes))
            .inspect_err(|err| {
                error!(%broker, ?err);
                TCP_CONNECT_ERRORS.add(1, &attributes);
            })
            .map(Self::new)
            .map_err(Into::into)
    }

    /// connect to a broker, failing with [`Error::ConnectTimeout`] when the
    /// connection is not established in time
    pub async fn connect_timeout(broker: &Url, duration: Duration) -> Result<Self> {
        timeout(duration, Self::connect(broker))
            .await
            .inspect_err(|_| error!(%broker, ?duration))?
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            correlation_id: 0,
            client_id: None,
        }
    }

    /// client id used in request headers
    pub fn client_id(self, client_id: Option<String>) -> Self {
        Self { client_id, ..self }
    }

    /// the correlation id of the most recent request, 0 before the first
    pub fn correlation_id(&self) -> i32 {
        self.correlation_id
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// send a typed request, returning its typed response
    pub async fn call<Q>(&mut self, request: Q) -> Result<Q::Response>
    where
        Q: Exchange,
    {
        self.send_request(request.into())
            .await
            .and_then(|response| Q::Response::try_from(response).map_err(Into::into))
    }

    /// send a request, failing with [`Error::Rejected`] when the response
    /// carries a non zero error code
    pub async fn send_request(&mut self, request: Request) -> Result<Response> {
        let response = self.round_trip(request).await?;

        if let Some(error) = response.error() {
            debug!(%error);

            Err(Error::Rejected {
                error,
                response: Box::new(response),
            })
        } else {
            Ok(response)
        }
    }

    /// send a request and decode its response, without inspecting error codes
    pub async fn round_trip(&mut self, request: Request) -> Result<Response> {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        let correlation_id = self.correlation_id;

        let api_key = request.api_key();
        let attributes = [KeyValue::new("api_key", api_key.to_string())];

        let span = span!(Level::DEBUG, "client", api_key, correlation_id);

        async move {
            let frame = Frame::new_request(correlation_id, self.client_id.clone(), request)?;
            self.request(frame.encode()?, &attributes).await?;

            let encoded = self.read_frame(&attributes).await?;
            let response = Frame::response_to(encoded, &frame.body)?;

            if response.correlation_id() == correlation_id {
                debug!(?response.body);
                Ok(response.body)
            } else {
                Err(Error::CorrelationMismatch {
                    expected: correlation_id,
                    received: response.correlation_id(),
                })
            }
        }
        .instrument(span)
        .await
    }

    /// write a request frame to the broker
    async fn request(&mut self, payload: Bytes, attributes: &[KeyValue]) -> Result<()> {
        let start = SystemTime::now();

        self.stream
            .write_all(&payload[..])
            .await
            .inspect(|_| {
                TCP_SEND_DURATION.record(elapsed_millis(start), attributes);
                TCP_BYTES_SENT.add(payload.len() as u64, attributes);
            })
            .inspect_err(|_| {
                TCP_SEND_ERRORS.add(1, attributes);
            })
            .map_err(Into::into)
    }

    /// read exactly one response frame, including its size
    async fn read_frame(&mut self, attributes: &[KeyValue]) -> Result<Bytes> {
        let start = SystemTime::now();

        let mut size = [0u8; 4];
        _ = self
            .stream
            .read_exact(&mut size)
            .await
            .inspect_err(|_| TCP_RECEIVE_ERRORS.add(1, attributes))?;

        let length = frame_length(size)?;

        // the buffer grows with the bytes received, not the declared length
        let mut buffer = Vec::from(size);
        _ = (&mut self.stream)
            .take((length - size.len()) as u64)
            .read_to_end(&mut buffer)
            .await
            .and_then(|_| {
                if buffer.len() == length {
                    Ok(())
                } else {
                    Err(io::Error::from(io::ErrorKind::UnexpectedEof))
                }
            })
            .inspect(|_| {
                TCP_RECEIVE_DURATION.record(elapsed_millis(start), attributes);
                TCP_BYTES_RECEIVED.add(buffer.len() as u64, attributes);
            })
            .inspect_err(|_| {
                TCP_RECEIVE_ERRORS.add(1, attributes);
            })?;

        Ok(Bytes::from(buffer))
    }
}

/// resolve the broker host into IPv4 or IPv6 socket addresses, tried in
/// order when connecting
async fn socket_addrs(broker: &Url) -> Result<Vec<SocketAddr>> {
    if let Some(host) = broker.host_str()
        && let Some(port) = broker.port()
    {
        let attributes = [KeyValue::new("url", broker.to_string())];
        let start = SystemTime::now();

        let addresses = lookup_host(format!("{host}:{port}"))
            .await
            .inspect(|_| DNS_LOOKUP_DURATION.record(elapsed_millis(start), &attributes))?
            .collect::<Vec<_>>();
        debug!(?addresses);

        if !addresses.is_empty() {
            return Ok(addresses);
        }
    }

    Err(Error::UnknownHost(broker.clone()))
}

/// the size of a frame, including the size itself
fn frame_length(encoded: [u8; 4]) -> Result<usize> {
    let declared = i32::from_be_bytes(encoded);

    usize::try_from(declared)
        .map(|length| length + encoded.len())
        .map_err(|_| kiln_sans_io::Error::InvalidLength(declared).into())
}

fn elapsed_millis(start: SystemTime) -> u64 {
    start
        .elapsed()
        .map_or(0, |duration| duration.as_millis() as u64)
}

static DNS_LOOKUP_DURATION: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("dns_lookup_duration")
        .with_unit("ms")
        .with_description("DNS lookup latencies")
        .build()
});

static TCP_CONNECT_DURATION: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("tcp_connect_duration")
        .with_unit("ms")
        .with_description("The TCP connect latencies in milliseconds")
        .build()
});

static TCP_CONNECT_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tcp_connect_errors")
        .with_description("TCP connect errors")
        .build()
});

static TCP_SEND_DURATION: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("tcp_send_duration")
        .with_unit("ms")
        .with_description("The TCP send latencies in milliseconds")
        .build()
});

static TCP_SEND_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tcp_send_errors")
        .with_description("TCP send errors")
        .build()
});

static TCP_RECEIVE_DURATION: LazyLock<Histogram<u64>> = LazyLock::new(|| {
    METER
        .u64_histogram("tcp_receive_duration")
        .with_unit("ms")
        .with_description("The TCP receive latencies in milliseconds")
        .build()
});

static TCP_RECEIVE_ERRORS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tcp_receive_errors")
        .with_description("TCP receive errors")
        .build()
});

static TCP_BYTES_SENT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tcp_bytes_sent")
        .with_description("TCP bytes sent")
        .build()
});

static TCP_BYTES_RECEIVED: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("tcp_bytes_received")
        .with_description("TCP bytes received")
        .build()
});
