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

//! Production of a single message to a topic partition.
//!
//! The message set carries exactly one message in the legacy (magic `0`)
//! message format:
//!
//! ```text
//! offset: i64, message_size: i32, crc: u32, magic: i8, attributes: i8, key: bytes, value: bytes
//! ```
//!
//! The CRC covers every byte from the magic byte to the end of the value.

use bytes::Bytes;
use crc::{CRC_32_ISO_HDLC, Crc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ApiKey, ApiVersion, Error, Exchange, Result,
    error_code::ErrorCodes,
    primitive::{ByteSize, Decode, Decoder, Encode, Encoder},
};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const OFFSET: i64 = 0;
const MAGIC: i8 = 0;

/// no compression
const ATTRIBUTES: i8 = 0;

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProduceRequest {
    pub topic: String,
    pub partition: i32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl ProduceRequest {
    pub fn topic(self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self
        }
    }

    pub fn partition(self, partition: i32) -> Self {
        Self { partition, ..self }
    }

    pub fn key(self, key: Option<Bytes>) -> Self {
        Self { key, ..self }
    }

    pub fn value(self, value: Option<Bytes>) -> Self {
        Self { value, ..self }
    }

    /// magic, attributes, key and value: the bytes covered by the CRC
    fn contents_size(&self) -> usize {
        MAGIC.size_in_bytes()
            + ATTRIBUTES.size_in_bytes()
            + self.key.size_in_bytes()
            + self.value.size_in_bytes()
    }

    fn message_size(&self) -> usize {
        size_of::<u32>() + self.contents_size()
    }

    fn message_set_size(&self) -> usize {
        OFFSET.size_in_bytes() + size_of::<i32>() + self.message_size()
    }
}

impl ApiKey for ProduceRequest {
    const KEY: i16 = 0;
}

impl ApiVersion for ProduceRequest {
    const VERSION: i16 = 0;
}

impl Exchange for ProduceRequest {
    type Response = ProduceResponse;
}

impl ByteSize for ProduceRequest {
    fn size_in_bytes(&self) -> usize {
        self.topic.size_in_bytes()
            + self.partition.size_in_bytes()
            + size_of::<i32>()
            + self.message_set_size()
    }
}

impl Encode for ProduceRequest {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_string(&self.topic)?;
        encoder.put_i32(self.partition);
        encoder.put_i32(i32::try_from(self.message_set_size())?);

        let mut contents = Encoder::with_capacity(self.contents_size());
        contents.put_i8(MAGIC);
        contents.put_i8(ATTRIBUTES);
        contents.put_bytes(self.key.as_deref())?;
        contents.put_bytes(self.value.as_deref())?;
        let contents = contents.finish();

        encoder.put_i64(OFFSET);
        encoder.put_i32(i32::try_from(self.message_size())?);
        encoder.put_u32(CRC32.checksum(&contents[..]));
        encoder.put_slice(&contents[..]);
        Ok(())
    }
}

impl Decode for ProduceRequest {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        let topic = decoder.get_string()?;
        let partition = decoder.get_i32()?;

        let message_set_size = decoder.get_i32()?;
        let mut message_set = usize::try_from(message_set_size)
            .map_err(|_| Error::InvalidLength(message_set_size))
            .and_then(|length| decoder.split(length))?;

        let offset = message_set.get_i64()?;
        debug!(offset);

        let message_size = message_set.get_i32()?;
        let mut message = usize::try_from(message_size)
            .map_err(|_| Error::InvalidLength(message_size))
            .and_then(|length| message_set.split(length))?;
        message_set.finish()?;

        let stored = message.get_u32()?;
        let contents = message.get_slice(message.remaining())?;
        let computed = CRC32.checksum(&contents[..]);
        if stored != computed {
            return Err(Error::Crc { stored, computed });
        }

        let mut contents = Decoder::new(contents);

        match (contents.get_i8()?, contents.get_i8()?) {
            (MAGIC, ATTRIBUTES) => (),
            (magic, attributes) => return Err(Error::UnsupportedMessage { magic, attributes }),
        }

        let key = contents.get_bytes()?;
        let value = contents.get_bytes()?;
        contents.finish()?;

        Ok(Self {
            topic,
            partition,
            key,
            value,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProduceResponse {
    pub topics: Vec<TopicProduceResponse>,
}

impl ProduceResponse {
    pub fn topics(self, topics: Vec<TopicProduceResponse>) -> Self {
        Self { topics }
    }
}

impl ApiKey for ProduceResponse {
    const KEY: i16 = ProduceRequest::KEY;
}

impl ApiVersion for ProduceResponse {
    const VERSION: i16 = ProduceRequest::VERSION;
}

impl ErrorCodes for ProduceResponse {
    fn error_codes(&self) -> Vec<i16> {
        self.topics
            .iter()
            .flat_map(|topic| topic.partitions.iter())
            .map(|partition| partition.error_code)
            .collect()
    }
}

impl ByteSize for ProduceResponse {
    fn size_in_bytes(&self) -> usize {
        self.topics.size_in_bytes()
    }
}

impl Encode for ProduceResponse {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_array(&self.topics)
    }
}

impl Decode for ProduceResponse {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        decoder.get_array().map(|topics| Self { topics })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TopicProduceResponse {
    pub name: String,
    pub partitions: Vec<PartitionProduceResponse>,
}

impl TopicProduceResponse {
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn partitions(self, partitions: Vec<PartitionProduceResponse>) -> Self {
        Self { partitions, ..self }
    }
}

impl ByteSize for TopicProduceResponse {
    fn size_in_bytes(&self) -> usize {
        self.name.size_in_bytes() + self.partitions.size_in_bytes()
    }
}

impl Encode for TopicProduceResponse {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_string(&self.name)?;
        encoder.put_array(&self.partitions)
    }
}

impl Decode for TopicProduceResponse {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            name: decoder.get_string()?,
            partitions: decoder.get_array()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PartitionProduceResponse {
    pub index: i32,
    pub error_code: i16,
    pub base_offset: i64,
}

impl PartitionProduceResponse {
    pub fn index(self, index: i32) -> Self {
        Self { index, ..self }
    }

    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn base_offset(self, base_offset: i64) -> Self {
        Self {
            base_offset,
            ..self
        }
    }
}

impl ByteSize for PartitionProduceResponse {
    fn size_in_bytes(&self) -> usize {
        self.index.size_in_bytes()
            + self.error_code.size_in_bytes()
            + self.base_offset.size_in_bytes()
    }
}

impl Encode for PartitionProduceResponse {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i32(self.index);
        encoder.put_i16(self.error_code);
        encoder.put_i64(self.base_offset);
        Ok(())
    }
}

impl Decode for PartitionProduceResponse {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            index: decoder.get_i32()?,
            error_code: decoder.get_i16()?,
            base_offset: decoder.get_i64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProduceRequest {
        ProduceRequest::default()
            .topic("orders")
            .key(Some(Bytes::from_static(b"k")))
            .value(Some(Bytes::from_static(b"v")))
    }

    #[test]
    fn message_set_layout() -> Result<()> {
        let request = request();
        let encoded = request.encode()?;
        assert_eq!(request.size_in_bytes(), encoded.len());

        let mut decoder = Decoder::new(encoded);
        assert_eq!("orders", decoder.get_string()?);
        assert_eq!(0, decoder.get_i32()?);

        // offset, message size and the message itself
        assert_eq!(8 + 4 + 4 + 1 + 1 + 5 + 5, decoder.get_i32()?);
        assert_eq!(0, decoder.get_i64()?);
        assert_eq!(4 + 1 + 1 + 5 + 5, decoder.get_i32()?);

        let crc = decoder.get_u32()?;
        let contents = decoder.get_slice(decoder.remaining())?;
        assert_eq!(&[0, 0, 0, 0, 0, 1, 107, 0, 0, 0, 1, 118][..], &contents[..]);
        assert_eq!(CRC32.checksum(&contents[..]), crc);
        Ok(())
    }

    #[test]
    fn null_key() -> Result<()> {
        let request = request().key(None);
        let encoded = request.encode()?;

        assert_eq!(request.size_in_bytes(), encoded.len());
        assert_eq!(request, ProduceRequest::decode(encoded)?);
        Ok(())
    }

    #[test]
    fn corrupt_crc() -> Result<()> {
        let mut encoded = request().encode()?.to_vec();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;

        assert!(matches!(
            ProduceRequest::decode(encoded),
            Err(Error::Crc { .. })
        ));
        Ok(())
    }

    #[test]
    fn unsupported_magic() -> Result<()> {
        let mut contents = Encoder::new();
        contents.put_i8(1);
        contents.put_i8(ATTRIBUTES);
        contents.put_bytes(None)?;
        contents.put_bytes(Some(&b"v"[..]))?;
        let contents = contents.finish();

        let mut encoder = Encoder::new();
        encoder.put_string("orders")?;
        encoder.put_i32(0);
        encoder.put_i32(i32::try_from(8 + 4 + 4 + contents.len())?);
        encoder.put_i64(OFFSET);
        encoder.put_i32(i32::try_from(4 + contents.len())?);
        encoder.put_u32(CRC32.checksum(&contents[..]));
        encoder.put_slice(&contents[..]);

        assert!(matches!(
            ProduceRequest::decode(encoder.finish()),
            Err(Error::UnsupportedMessage {
                magic: 1,
                attributes: 0
            })
        ));
        Ok(())
    }

    #[test]
    fn first_failing_partition() {
        let response = ProduceResponse::default().topics(vec![
            TopicProduceResponse::default().name("a").partitions(vec![
                PartitionProduceResponse::default().index(0),
                PartitionProduceResponse::default().index(1).error_code(7),
            ]),
            TopicProduceResponse::default()
                .name("b")
                .partitions(vec![PartitionProduceResponse::default().error_code(3)]),
        ]);

        assert_eq!(vec![0, 7, 3], response.error_codes());
        assert!(matches!(
            response.error(),
            Some(Error::Api(crate::ErrorCode::RequestTimedOut))
        ));
    }
}
