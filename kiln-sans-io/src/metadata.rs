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

//! Metadata lookup of a single topic.

use std::iter::once;

use serde::{Deserialize, Serialize};

use crate::{
    ApiKey, ApiVersion, Exchange, Result,
    error_code::ErrorCodes,
    primitive::{ByteSize, Decode, Decoder, Encode, Encoder},
};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataRequest {
    pub topic: String,
    pub partitions: i32,
    pub replication_factor: i16,
}

impl MetadataRequest {
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
}

impl ApiKey for MetadataRequest {
    const KEY: i16 = 3;
}

impl ApiVersion for MetadataRequest {
    const VERSION: i16 = 0;
}

impl Exchange for MetadataRequest {
    type Response = MetadataResponse;
}

impl ByteSize for MetadataRequest {
    fn size_in_bytes(&self) -> usize {
        self.topic.size_in_bytes()
            + self.partitions.size_in_bytes()
            + self.replication_factor.size_in_bytes()
    }
}

impl Encode for MetadataRequest {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_string(&self.topic)?;
        encoder.put_i32(self.partitions);
        encoder.put_i16(self.replication_factor);
        Ok(())
    }
}

impl Decode for MetadataRequest {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            topic: decoder.get_string()?,
            partitions: decoder.get_i32()?,
            replication_factor: decoder.get_i16()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetadataResponse {
    pub brokers: Vec<Broker>,
    pub topics: Vec<TopicMetadata>,
}

impl MetadataResponse {
    pub fn brokers(self, brokers: Vec<Broker>) -> Self {
        Self { brokers, ..self }
    }

    pub fn topics(self, topics: Vec<TopicMetadata>) -> Self {
        Self { topics, ..self }
    }
}

impl ApiKey for MetadataResponse {
    const KEY: i16 = MetadataRequest::KEY;
}

impl ApiVersion for MetadataResponse {
    const VERSION: i16 = MetadataRequest::VERSION;
}

impl ErrorCodes for MetadataResponse {
    fn error_codes(&self) -> Vec<i16> {
        self.topics
            .iter()
            .flat_map(|topic| {
                once(topic.error_code).chain(
                    topic
                        .partitions
                        .iter()
                        .map(|partition| partition.error_code),
                )
            })
            .collect()
    }
}

impl ByteSize for MetadataResponse {
    fn size_in_bytes(&self) -> usize {
        self.brokers.size_in_bytes() + self.topics.size_in_bytes()
    }
}

impl Encode for MetadataResponse {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_array(&self.brokers)?;
        encoder.put_array(&self.topics)
    }
}

impl Decode for MetadataResponse {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            brokers: decoder.get_array()?,
            topics: decoder.get_array()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Broker {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl Broker {
    pub fn new(node_id: i32, host: impl Into<String>, port: i32) -> Self {
        Self {
            node_id,
            host: host.into(),
            port,
        }
    }
}

impl ByteSize for Broker {
    fn size_in_bytes(&self) -> usize {
        self.node_id.size_in_bytes() + self.host.size_in_bytes() + self.port.size_in_bytes()
    }
}

impl Encode for Broker {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i32(self.node_id);
        encoder.put_string(&self.host)?;
        encoder.put_i32(self.port);
        Ok(())
    }
}

impl Decode for Broker {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            node_id: decoder.get_i32()?,
            host: decoder.get_string()?,
            port: decoder.get_i32()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TopicMetadata {
    pub error_code: i16,
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn partitions(self, partitions: Vec<PartitionMetadata>) -> Self {
        Self { partitions, ..self }
    }
}

impl ByteSize for TopicMetadata {
    fn size_in_bytes(&self) -> usize {
        self.error_code.size_in_bytes()
            + self.name.size_in_bytes()
            + self.partitions.size_in_bytes()
    }
}

impl Encode for TopicMetadata {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i16(self.error_code);
        encoder.put_string(&self.name)?;
        encoder.put_array(&self.partitions)
    }
}

impl Decode for TopicMetadata {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            error_code: decoder.get_i16()?,
            name: decoder.get_string()?,
            partitions: decoder.get_array()?,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PartitionMetadata {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
}

impl PartitionMetadata {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn partition_index(self, partition_index: i32) -> Self {
        Self {
            partition_index,
            ..self
        }
    }

    pub fn leader_id(self, leader_id: i32) -> Self {
        Self { leader_id, ..self }
    }

    pub fn replica_nodes(self, replica_nodes: Vec<i32>) -> Self {
        Self {
            replica_nodes,
            ..self
        }
    }

    pub fn isr_nodes(self, isr_nodes: Vec<i32>) -> Self {
        Self { isr_nodes, ..self }
    }
}

impl ByteSize for PartitionMetadata {
    fn size_in_bytes(&self) -> usize {
        self.error_code.size_in_bytes()
            + self.partition_index.size_in_bytes()
            + self.leader_id.size_in_bytes()
            + self.replica_nodes.size_in_bytes()
            + self.isr_nodes.size_in_bytes()
    }
}

impl Encode for PartitionMetadata {
    fn encode_into(&self, encoder: &mut Encoder) -> Result<()> {
        encoder.put_i16(self.error_code);
        encoder.put_i32(self.partition_index);
        encoder.put_i32(self.leader_id);
        encoder.put_array(&self.replica_nodes)?;
        encoder.put_array(&self.isr_nodes)
    }
}

impl Decode for PartitionMetadata {
    fn decode_from(decoder: &mut Decoder) -> Result<Self> {
        Ok(Self {
            error_code: decoder.get_i16()?,
            partition_index: decoder.get_i32()?,
            leader_id: decoder.get_i32()?,
            replica_nodes: decoder.get_array()?,
            isr_nodes: decoder.get_array()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, ErrorCode};

    #[test]
    fn orders() -> Result<()> {
        let request = MetadataRequest::default()
            .topic("orders")
            .partitions(3)
            .replication_factor(1);

        let encoded = request.encode()?;

        assert_eq!(
            &[0, 6, 111, 114, 100, 101, 114, 115, 0, 0, 0, 3, 0, 1][..],
            &encoded[..]
        );
        assert_eq!(request.size_in_bytes(), encoded.len());
        Ok(())
    }

    #[test]
    fn topic_error_before_partition_error() {
        let response = MetadataResponse::default().topics(vec![
            TopicMetadata::default()
                .name("orders")
                .error_code(5)
                .partitions(vec![PartitionMetadata::default().error_code(3)]),
        ]);

        assert_eq!(vec![5, 3], response.error_codes());
        assert!(matches!(
            response.error(),
            Some(Error::Api(ErrorCode::LeaderNotAvailable))
        ));
    }
}
