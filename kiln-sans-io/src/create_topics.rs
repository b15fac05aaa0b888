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

//! Creation of a single topic.

use serde::{Deserialize, Serialize};

use crate::{
    ApiKey, ApiVersion, Error, Exchange, Result,
    error_code::ErrorCodes,
    primitive::{ByteSize, Decode, Decoder, Encode, Encoder},
};

pub const DEFAULT_TIMEOUT_MS: i32 = 30_000;

/// Replica assignments and topic configuration are always sent empty.
const EMPTY: i32 = 0;

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CreateTopicsRequest {
    pub topic: String,
    pub partitions: i32,
    pub replication_factor: i16,
    pub timeout_ms: i32,
}

impl Default for CreateTopicsRequest {
    fn default() -> Self {
        Self {
            topic: String::default(),
            partitions: 0,
            replication_factor: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CreateTopicsRequest {
    pub fn topic(self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self
        }
    }

    pub fn partitions(self, partitions: i32) -> Self {
        Self { partitions, ..self }
    }

    pub fn replication_factor(self, replication_factor: i16) -> Self {
        Self {
            replication_factor,
            ..self
        }
    }

    pub fn timeout_ms(self, timeout_ms: i32) -> Self {
        Self { timeout_ms, ..self }
    }
}

impl ApiKey for CreateTopicsRequest {
    const KEY: i16 = 19;
}

impl ApiVersion for CreateTopicsRequest {
    const VERSION: i16 = 0;
}

impl Exchange for CreateTopicsRequest {
    type Response = CreateTopicsResponse;
}

impl ByteSize for CreateTopicsRequest {
    fn size_in_bytes(&self) -> usize {
        self.topic.size_in_bytes()
            + self.partitions.size_in_bytes()
            + self.replication_factor.size_in_bytes()
            + EMPTY.size_in_bytes()
            + EMPTY.size_in_bytes()
            + self.timeout_ms.size_in_bytes()
    }
}

impl Encode for CreateTopicsRequest {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_string(&self.topic)?;
        encoder.put_i32(self.partitions);
        encoder.put_i16(self.replication_factor);
        encoder.put_i32(EMPTY);
        encoder.put_i32(EMPTY);
        encoder.put_i32(self.timeout_ms);
        Ok(())
    }
}

impl Decode for CreateTopicsRequest {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        let topic = decoder.get_string()?;
        let partitions = decoder.get_i32()?;
        let replication_factor = decoder.get_i16()?;

        for _ in 0..2 {
            match decoder.get_i32()? {
                EMPTY => (),
                count => return Err(Error::InvalidLength(count)),
            }
        }

        Ok(Self {
            topic,
            partitions,
            replication_factor,
            timeout_ms: decoder.get_i32()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CreateTopicsResponse {
    pub topics: Vec<CreatableTopicResult>,
}

impl CreateTopicsResponse {
    pub fn topics(self, topics: Vec<CreatableTopicResult>) -> Self {
        Self { topics }
    }
}

impl ApiKey for CreateTopicsResponse {
    const KEY: i16 = CreateTopicsRequest::KEY;
}

impl ApiVersion for CreateTopicsResponse {
    const VERSION: i16 = CreateTopicsRequest::VERSION;
}

impl ErrorCodes for CreateTopicsResponse {
    fn error_codes(&self) -> Vec<i16> {
        self.topics.iter().map(|topic| topic.error_code).collect()
    }
}

impl ByteSize for CreateTopicsResponse {
    fn size_in_bytes(&self) -> usize {
        self.topics.size_in_bytes()
    }
}

impl Encode for CreateTopicsResponse {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_array(&self.topics)
    }
}

impl Decode for CreateTopicsResponse {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        decoder.get_array().map(|topics| Self { topics })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CreatableTopicResult {
    pub name: String,
    pub error_code: i16,
    pub error_message: Option<String>,
}

impl CreatableTopicResult {
    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn error_message(self, error_message: Option<String>) -> Self {
        Self {
            error_message,
            ..self
        }
    }
}

impl ByteSize for CreatableTopicResult {
    fn size_in_bytes(&self) -> usize {
        self.name.size_in_bytes()
            + self.error_code.size_in_bytes()
            + self.error_message.size_in_bytes()
    }
}

impl Encode for CreatableTopicResult {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_string(&self.name)?;
        encoder.put_i16(self.error_code);
        encoder.put_nullable_string(self.error_message.as_deref())
    }
}

impl Decode for CreatableTopicResult {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            name: decoder.get_string()?,
            error_code: decoder.get_i16()?,
            error_message: decoder.get_nullable_string()?,
        })
    }
}
