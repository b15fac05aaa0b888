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
//
//! A Kafka style protocol implementation that performs no I/O (it operates only on bytes)
//!
//! Three request kinds are supported, each answered by a paired response:
//!
//! | request | api key | response |
//! |---|---|---|
//! | [`MetadataRequest`] | 3 | [`MetadataResponse`] |
//! | [`CreateTopicsRequest`] | 19 | [`CreateTopicsResponse`] |
//! | [`ProduceRequest`] | 0 | [`ProduceResponse`] |
//!
//! Some useful starting points:
//!
//! - **Data Structures** - [`Frame`], [`Header`], [`Request`] and [`Response`].
//! - **Byte level encoding** - [`primitive::Encoder`] and [`primitive::Decoder`].
//! - **Broker errors** - [`ErrorCode`], [`map_error_code`] and [`ErrorCodes`].
//!
//! ## Examples
//!
//! Encoding a [`CreateTopicsRequest`] request body:
//!
//! ```
//! # use kiln_sans_io::Error;
//! # fn main() -> Result<(), Error> {
//! use kiln_sans_io::{CreateTopicsRequest, Request, primitive::Encode as _};
//!
//! let request = Request::from(
//!     CreateTopicsRequest::default()
//!         .topic("balances")
//!         .partitions(3)
//!         .replication_factor(1),
//! );
//!
//! assert_eq!(19, request.api_key());
//! assert_eq!(request.encoded_size(), request.encode()?.len());
//! # Ok(())
//! # }
//! ```
//!
//! Decoding a [`ProduceResponse`] body:
//!
//! ```
//! # use kiln_sans_io::Error;
//! # fn main() -> Result<(), Error> {
//! use kiln_sans_io::{ProduceResponse, primitive::Decode as _};
//!
//! let encoded = vec![
//!     0, 0, 0, 1, 0, 6, 111, 114, 100, 101, 114, 115, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
//!     0, 0, 0, 42,
//! ];
//!
//! let response = ProduceResponse::decode(encoded)?;
//! assert_eq!(42, response.topics[0].partitions[0].base_offset);
//! # Ok(())
//! # }
//! ```

pub mod create_topics;
pub mod error_code;
pub mod frame;
pub mod metadata;
pub mod primitive;
pub mod produce;

use std::{
    fmt::{self, Display, Formatter},
    num, string,
};

use bytes::TryGetError;
pub use create_topics::{CreateTopicsRequest, CreateTopicsResponse};
pub use error_code::{ErrorCode, ErrorCodes, map_error_code};
pub use frame::{Frame, Header};
pub use metadata::{MetadataRequest, MetadataResponse};
use primitive::{ByteSize, Decode, Decoder, Encode, Encoder};
pub use produce::{ProduceRequest, ProduceResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub trait ApiKey {
    const KEY: i16;
}

pub trait ApiVersion {
    const VERSION: i16;
}

/// A request statically paired with the response that answers it
pub trait Exchange:
    ApiKey + ApiVersion + fmt::Debug + Into<Request> + Send + Sync + 'static
{
    type Response: ApiKey
        + ErrorCodes
        + fmt::Debug
        + Into<Response>
        + TryFrom<Response, Error = Error>
        + Send
        + Sync
        + 'static;
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    Api(ErrorCode),
    Crc { stored: u32, computed: u32 },
    FrameSize { declared: i32, actual: usize },
    FromUtf8(string::FromUtf8Error),
    InvalidLength(i32),
    StringTooLong(usize),
    TrailingBytes(usize),
    TruncatedFrame { wanted: usize, remaining: usize },
    TryFromInt(#[from] num::TryFromIntError),
    UnexpectedResponse { expected: i16, received: i16 },
    UnknownApiErrorCode(i16),
    UnsupportedMessage { magic: i8, attributes: i8 },
    UnsupportedRequest(i16),
    UnsupportedVersion { api_key: i16, api_version: i16 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api(error_code) => write!(f, "{error_code}"),
            Error::UnknownApiErrorCode(error_code) => write!(f, "unknown error code: {error_code}"),
            e => write!(f, "{e:?}"),
        }
    }
}

impl From<TryGetError> for Error {
    fn from(value: TryGetError) -> Self {
        Self::TruncatedFrame {
            wanted: value.requested,
            remaining: value.available,
        }
    }
}

impl From<string::FromUtf8Error> for Error {
    fn from(value: string::FromUtf8Error) -> Self {
        Self::FromUtf8(value)
    }
}

fn check_version(api_key: i16, api_version: i16) -> Result<()> {
    if api_version == 0 {
        Ok(())
    } else {
        Err(Error::UnsupportedVersion {
            api_key,
            api_version,
        })
    }
}

/// A request body, one variant per supported API.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Request {
    Metadata(MetadataRequest),
    CreateTopics(CreateTopicsRequest),
    Produce(ProduceRequest),
}

impl Request {
    pub fn api_key(&self) -> i16 {
        match self {
            Self::Metadata(_) => MetadataRequest::KEY,
            Self::CreateTopics(_) => CreateTopicsRequest::KEY,
            Self::Produce(_) => ProduceRequest::KEY,
        }
    }

    pub fn api_version(&self) -> i16 {
        match self {
            Self::Metadata(_) => MetadataRequest::VERSION,
            Self::CreateTopics(_) => CreateTopicsRequest::VERSION,
            Self::Produce(_) => ProduceRequest::VERSION,
        }
    }

    /// the exact length of [`Encode::encode`] for this body
    pub fn encoded_size(&self) -> usize {
        self.size_in_bytes()
    }

    /// decode the body of the response that answers this request
    pub fn decode_response(&self, decoder: &mut Decoder) -> Result<Response> {
        match self {
            Self::Metadata(_) => MetadataResponse::decode_from(decoder).map(Response::Metadata),

            Self::CreateTopics(_) => {
                CreateTopicsResponse::decode_from(decoder).map(Response::CreateTopics)
            }

            Self::Produce(_) => ProduceResponse::decode_from(decoder).map(Response::Produce),
        }
    }

    pub fn decode_body(api_key: i16, api_version: i16, decoder: &mut Decoder) -> Result<Self> {
        debug!(api_key, api_version);

        check_version(api_key, api_version)?;

        match api_key {
            MetadataRequest::KEY => MetadataRequest::decode_from(decoder).map(Self::Metadata),

            CreateTopicsRequest::KEY => {
                CreateTopicsRequest::decode_from(decoder).map(Self::CreateTopics)
            }

            ProduceRequest::KEY => ProduceRequest::decode_from(decoder).map(Self::Produce),

            otherwise => Err(Error::UnsupportedRequest(otherwise)),
        }
    }
}

impl ByteSize for Request {
    fn size_in_bytes(&self) -> usize {
        match self {
            Self::Metadata(request) => request.size_in_bytes(),
            Self::CreateTopics(request) => request.size_in_bytes(),
            Self::Produce(request) => request.size_in_bytes(),
        }
    }
}

impl Encode for Request {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        match self {
            Self::Metadata(request) => request.encode_into(encoder),
            Self::CreateTopics(request) => request.encode_into(encoder),
            Self::Produce(request) => request.encode_into(encoder),
        }
    }
}

impl From<MetadataRequest> for Request {
    fn from(value: MetadataRequest) -> Self {
        Self::Metadata(value)
    }
}

impl From<CreateTopicsRequest> for Request {
    fn from(value: CreateTopicsRequest) -> Self {
        Self::CreateTopics(value)
    }
}

impl From<ProduceRequest> for Request {
    fn from(value: ProduceRequest) -> Self {
        Self::Produce(value)
    }
}

/// A response body, one variant per supported API.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Response {
    Metadata(MetadataResponse),
    CreateTopics(CreateTopicsResponse),
    Produce(ProduceResponse),
}

impl Response {
    pub fn api_key(&self) -> i16 {
        match self {
            Self::Metadata(_) => MetadataResponse::KEY,
            Self::CreateTopics(_) => CreateTopicsResponse::KEY,
            Self::Produce(_) => ProduceResponse::KEY,
        }
    }

    pub fn encoded_size(&self) -> usize {
        self.size_in_bytes()
    }

    pub fn decode_body(api_key: i16, api_version: i16, decoder: &mut Decoder) -> Result<Self> {
        debug!(api_key, api_version);

        check_version(api_key, api_version)?;

        match api_key {
            MetadataResponse::KEY => MetadataResponse::decode_from(decoder).map(Self::Metadata),

            CreateTopicsResponse::KEY => {
                CreateTopicsResponse::decode_from(decoder).map(Self::CreateTopics)
            }

            ProduceResponse::KEY => ProduceResponse::decode_from(decoder).map(Self::Produce),

            otherwise => Err(Error::UnsupportedRequest(otherwise)),
        }
    }
}

impl ErrorCodes for Response {
    fn error_codes(&self) -> Vec<i16> {
        match self {
            Self::Metadata(response) => response.error_codes(),
            Self::CreateTopics(response) => response.error_codes(),
            Self::Produce(response) => response.error_codes(),
        }
    }
}

impl ByteSize for Response {
    fn size_in_bytes(&self) -> usize {
        match self {
            Self::Metadata(response) => response.size_in_bytes(),
            Self::CreateTopics(response) => response.size_in_bytes(),
            Self::Produce(response) => response.size_in_bytes(),
        }
    }
}

impl Encode for Response {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        match self {
            Self::Metadata(response) => response.encode_into(encoder),
            Self::CreateTopics(response) => response.encode_into(encoder),
            Self::Produce(response) => response.encode_into(encoder),
        }
    }
}

impl From<MetadataResponse> for Response {
    fn from(value: MetadataResponse) -> Self {
        Self::Metadata(value)
    }
}

impl From<CreateTopicsResponse> for Response {
    fn from(value: CreateTopicsResponse) -> Self {
        Self::CreateTopics(value)
    }
}

impl From<ProduceResponse> for Response {
    fn from(value: ProduceResponse) -> Self {
        Self::Produce(value)
    }
}

impl TryFrom<Response> for MetadataResponse {
    type Error = Error;

    fn try_from(value: Response) -> Result<Self, Self::Error> {
        if let Response::Metadata(response) = value {
            Ok(response)
        } else {
            Err(Error::UnexpectedResponse {
                expected: Self::KEY,
                received: value.api_key(),
            })
        }
    }
}

impl TryFrom<Response> for CreateTopicsResponse {
    type Error = Error;

    fn try_from(value: Response) -> Result<Self, Self::Error> {
        if let Response::CreateTopics(response) = value {
            Ok(response)
        } else {
            Err(Error::UnexpectedResponse {
                expected: Self::KEY,
                received: value.api_key(),
            })
        }
    }
}

impl TryFrom<Response> for ProduceResponse {
    type Error = Error;

    fn try_from(value: Response) -> Result<Self, Self::Error> {
        if let Response::Produce(response) = value {
            Ok(response)
        } else {
            Err(Error::UnexpectedResponse {
                expected: Self::KEY,
                received: value.api_key(),
            })
        }
    }
}
