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

use std::time::SystemTime;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    Error, Request, Response, Result,
    primitive::{ByteSize, Decoder, Encode, Encoder},
};

/// The header that follows the size of a frame.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Header {
    Request {
        api_key: i16,
        api_version: i16,
        correlation_id: i32,
        client_id: Option<String>,
    },
    Response {
        correlation_id: i32,
    },
}

impl Header {
    pub fn correlation_id(&self) -> i32 {
        match self {
            Self::Request { correlation_id, .. } | Self::Response { correlation_id } => {
                *correlation_id
            }
        }
    }
}

impl ByteSize for Header {
    fn size_in_bytes(&self) -> usize {
        match self {
            Self::Request {
                api_key,
                api_version,
                correlation_id,
                client_id,
            } => {
                api_key.size_in_bytes()
                    + api_version.size_in_bytes()
                    + correlation_id.size_in_bytes()
                    + client_id.size_in_bytes()
            }

            Self::Response { correlation_id } => correlation_id.size_in_bytes(),
        }
    }
}

impl Encode for Header {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        match self {
            Self::Request {
                api_key,
                api_version,
                correlation_id,
                client_id,
            } => {
                encoder.put_i16(*api_key);
                encoder.put_i16(*api_version);
                encoder.put_i32(*correlation_id);
                encoder.put_nullable_string(client_id.as_deref())
            }

            Self::Response { correlation_id } => {
                encoder.put_i32(*correlation_id);
                Ok(())
            }
        }
    }
}

/// A frame prefixed with its size, followed by a header and a body.
///
/// The size counts every byte after itself, on both requests and responses.
///
/// ```
/// # use kiln_sans_io::Error;
/// # fn main() -> Result<(), Error> {
/// use kiln_sans_io::{Frame, MetadataRequest};
///
/// let encoded = Frame::request(
///     1,
///     None,
///     MetadataRequest::default()
///         .topic("orders")
///         .partitions(3)
///         .replication_factor(1)
///         .into(),
/// )?;
///
/// assert_eq!(
///     vec![
///         0, 0, 0, 24, 0, 3, 0, 0, 0, 0, 0, 1, 255, 255, 0, 6, 111, 114, 100, 101, 114, 115, 0, 0,
///         0, 3, 0, 1,
///     ],
///     encoded
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Frame<B> {
    /// The size of this frame, excluding the size itself.
    pub size: i32,

    /// The frame header.
    pub header: Header,

    /// The frame body.
    pub body: B,
}

impl<B> Frame<B>
where
    B: Encode,
{
    fn elapsed_millis(start: SystemTime) -> u64 {
        start
            .elapsed()
            .map_or(0, |duration| duration.as_millis() as u64)
    }

    fn with_header(header: Header, body: B) -> Result<Self> {
        i32::try_from(header.size_in_bytes() + body.size_in_bytes())
            .map(|size| Self { size, header, body })
            .map_err(Into::into)
    }

    pub fn correlation_id(&self) -> i32 {
        self.header.correlation_id()
    }
}

impl<B> ByteSize for Frame<B>
where
    B: Encode,
{
    fn size_in_bytes(&self) -> usize {
        self.size.size_in_bytes() + self.header.size_in_bytes() + self.body.size_in_bytes()
    }
}

impl<B> Encode for Frame<B>
where
    B: Encode,
{
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i32(self.size);
        self.header.encode_into(encoder)?;
        self.body.encode_into(encoder)
    }
}

/// the declared size of a frame must match the bytes that follow it
fn check_size(decoder: &mut Decoder) -> Result<i32> {
    let declared = decoder.get_i32()?;
    let actual = decoder.remaining();

    if usize::try_from(declared).is_ok_and(|declared| declared == actual) {
        Ok(declared)
    } else {
        Err(Error::FrameSize { declared, actual })
    }
}

impl Frame<Request> {
    pub fn new_request(
        correlation_id: i32,
        client_id: Option<String>,
        body: Request,
    ) -> Result<Self> {
        Self::with_header(
            Header::Request {
                api_key: body.api_key(),
                api_version: body.api_version(),
                correlation_id,
                client_id,
            },
            body,
        )
    }

    /// serialize an API request into a frame of bytes
    #[instrument(skip(client_id, body))]
    pub fn request(
        correlation_id: i32,
        client_id: Option<String>,
        body: Request,
    ) -> Result<Bytes> {
        let start = SystemTime::now();

        Self::new_request(correlation_id, client_id, body)
            .and_then(|frame| frame.encode())
            .inspect(|encoded| {
                debug!(
                    len = encoded.len(),
                    elapsed_millis = Self::elapsed_millis(start)
                )
            })
    }

    /// deserialize bytes into an API request frame
    #[instrument(skip_all)]
    pub fn request_from_bytes(encoded: impl Into<Bytes>) -> Result<Self> {
        let start = SystemTime::now();

        let mut decoder = Decoder::new(encoded);
        let size = check_size(&mut decoder)?;

        let api_key = decoder.get_i16()?;
        let api_version = decoder.get_i16()?;
        let correlation_id = decoder.get_i32()?;
        let client_id = decoder.get_nullable_string()?;

        let body = Request::decode_body(api_key, api_version, &mut decoder)?;
        decoder.finish()?;

        debug!(
            api_key,
            correlation_id,
            elapsed_millis = Self::elapsed_millis(start)
        );

        Ok(Self {
            size,
            header: Header::Request {
                api_key,
                api_version,
                correlation_id,
                client_id,
            },
            body,
        })
    }
}

impl Frame<Response> {
    pub fn new_response(correlation_id: i32, body: Response) -> Result<Self> {
        Self::with_header(Header::Response { correlation_id }, body)
    }

    /// serialize an API response into a frame of bytes
    #[instrument(skip(body))]
    pub fn response(correlation_id: i32, body: Response) -> Result<Bytes> {
        let start = SystemTime::now();

        Self::new_response(correlation_id, body)
            .and_then(|frame| frame.encode())
            .inspect(|encoded| {
                debug!(
                    len = encoded.len(),
                    elapsed_millis = Self::elapsed_millis(start)
                )
            })
    }

    /// deserialize bytes into an API response frame, the api key and version
    /// being those of the request that solicited it
    #[instrument(skip(encoded))]
    pub fn response_from_bytes(
        encoded: impl Into<Bytes>,
        api_key: i16,
        api_version: i16,
    ) -> Result<Self> {
        Self::decode_response(encoded, |decoder| {
            Response::decode_body(api_key, api_version, decoder)
        })
    }

    /// deserialize bytes into the response frame paired with `request`
    #[instrument(skip_all)]
    pub fn response_to(encoded: impl Into<Bytes>, request: &Request) -> Result<Self> {
        Self::decode_response(encoded, |decoder| request.decode_response(decoder))
    }

    fn decode_response<F>(encoded: impl Into<Bytes>, body: F) -> Result<Self>
    where
        F: FnOnce(&mut Decoder) -> Result<Response>,
    {
        let start = SystemTime::now();

        let mut decoder = Decoder::new(encoded);
        let size = check_size(&mut decoder)?;
        let correlation_id = decoder.get_i32()?;

        let body = body(&mut decoder)?;
        decoder.finish()?;

        debug!(correlation_id, elapsed_millis = Self::elapsed_millis(start));

        Ok(Self {
            size,
            header: Header::Response { correlation_id },
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CreateTopicsResponse, ProduceRequest, create_topics::CreatableTopicResult};

    #[test]
    fn request_size_counts_header_and_body() -> Result<()> {
        let body = Request::from(ProduceRequest::default().topic("t"));
        let body_size = body.encoded_size();

        let frame = Frame::new_request(12, Some("kiln".into()), body)?;
        assert_eq!(
            i32::try_from(2 + 2 + 4 + 2 + 4 + body_size)?,
            frame.size
        );

        let encoded = frame.encode()?;
        assert_eq!(frame.size_in_bytes(), encoded.len());
        assert_eq!(frame, Frame::request_from_bytes(encoded)?);
        Ok(())
    }

    #[test]
    fn response_declared_size_too_large() -> Result<()> {
        let mut encoded = Frame::response(
            3,
            CreateTopicsResponse::default()
                .topics(vec![CreatableTopicResult::default().name("t")])
                .into(),
        )?
        .to_vec();
        encoded[3] += 1;

        assert!(matches!(
            Frame::response_from_bytes(encoded, 19, 0),
            Err(Error::FrameSize { .. })
        ));
        Ok(())
    }

    #[test]
    fn negative_size() {
        assert!(matches!(
            Frame::response_from_bytes(vec![255, 255, 255, 255], 19, 0),
            Err(Error::FrameSize {
                declared: -1,
                actual: 0
            })
        ));
    }
}
