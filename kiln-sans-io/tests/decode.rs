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

use common::{Error, init_tracing};
use kiln_sans_io::{
    CreateTopicsRequest, CreateTopicsResponse, Error as ProtocolError, ErrorCode, ErrorCodes as _,
    Frame, Header, MetadataResponse, ProduceResponse, Request, Response,
    create_topics::CreatableTopicResult,
    metadata::{Broker, PartitionMetadata, TopicMetadata},
    primitive::{Decode as _, Encode as _},
};
use pretty_assertions::assert_eq;

pub mod common;

#[test]
fn produce_response_orders() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![
        0, 0, 0, 1, 0, 6, 111, 114, 100, 101, 114, 115, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 42,
    ];

    let response = ProduceResponse::decode(encoded)?;

    assert_eq!("orders", response.topics[0].name);
    assert_eq!(0, response.topics[0].partitions[0].index);
    assert_eq!(42, response.topics[0].partitions[0].base_offset);
    assert!(response.error().is_none());

    Ok(())
}

#[test]
fn create_topics_response_round_trip() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let fixture = CreateTopicsResponse::default().topics(vec![
        CreatableTopicResult::default()
            .name("balances")
            .error_code(41)
            .error_message(Some("Replication factor is invalid.".into())),
    ]);

    let decoded = CreateTopicsResponse::decode(fixture.encode()?)?;

    assert_eq!("balances", decoded.topics[0].name);
    assert_eq!(41, decoded.topics[0].error_code);
    assert_eq!(
        Some("Replication factor is invalid."),
        decoded.topics[0].error_message.as_deref()
    );
    assert!(matches!(
        decoded.error(),
        Some(ProtocolError::Api(ErrorCode::InvalidReplicationFactor))
    ));

    Ok(())
}

#[test]
fn metadata_response() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![
        // brokers
        0, 0, 0, 1, 0, 0, 0, 1, 0, 9, 108, 111, 99, 97, 108, 104, 111, 115, 116, 0, 0, 35, 132,
        // topics
        0, 0, 0, 1, 0, 0, 0, 6, 111, 114, 100, 101, 114, 115,
        // partitions
        0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
        // replicas
        0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2,
        // isr
        0, 0, 0, 1, 0, 0, 0, 1,
    ];

    assert_eq!(
        MetadataResponse::default()
            .brokers(vec![Broker::new(1, "localhost", 9092)])
            .topics(vec![TopicMetadata::default().name("orders").partitions(vec![
                PartitionMetadata::default()
                    .partition_index(0)
                    .leader_id(1)
                    .replica_nodes(vec![1, 2])
                    .isr_nodes(vec![1]),
            ])]),
        MetadataResponse::decode(encoded)?
    );

    Ok(())
}

#[test]
fn truncated_partition() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![
        0, 0, 0, 1, 0, 6, 111, 114, 100, 101, 114, 115, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];

    assert!(matches!(
        ProduceResponse::decode(encoded),
        Err(ProtocolError::TruncatedFrame {
            wanted: 8,
            remaining: 3
        })
    ));

    Ok(())
}

#[test]
fn topic_name_longer_than_frame() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![0, 0, 0, 1, 0, 60, 111, 114, 100, 101, 114, 115];

    assert!(matches!(
        CreateTopicsResponse::decode(encoded),
        Err(ProtocolError::TruncatedFrame {
            wanted: 60,
            remaining: 6
        })
    ));

    Ok(())
}

#[test]
fn trailing_bytes() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![0, 0, 0, 0, 0, 0, 0, 0, 0];

    assert!(matches!(
        MetadataResponse::decode(encoded),
        Err(ProtocolError::TrailingBytes(1))
    ));

    Ok(())
}

#[test]
fn response_frame() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![0, 0, 0, 8, 0, 0, 0, 5, 0, 0, 0, 0];

    assert_eq!(
        Frame {
            size: 8,
            header: Header::Response { correlation_id: 5 },
            body: Response::CreateTopics(CreateTopicsResponse::default()),
        },
        Frame::response_from_bytes(encoded.clone(), 19, 0)?
    );

    let request = Request::from(CreateTopicsRequest::default().topic("t"));
    assert_eq!(5, Frame::response_to(encoded, &request)?.correlation_id());

    Ok(())
}

#[test]
fn unsupported_api_key() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![0, 0, 0, 4, 0, 0, 0, 5];

    assert!(matches!(
        Frame::response_from_bytes(encoded, 1, 0),
        Err(ProtocolError::UnsupportedRequest(1))
    ));

    Ok(())
}

#[test]
fn unsupported_version() -> Result<(), Error> {
    let _guard = init_tracing()?;

    let encoded = vec![0, 0, 0, 8, 0, 0, 0, 5, 0, 0, 0, 0];

    assert!(matches!(
        Frame::response_from_bytes(encoded, 19, 7),
        Err(ProtocolError::UnsupportedVersion {
            api_key: 19,
            api_version: 7
        })
    ));

    Ok(())
}

#[test]
fn unexpected_response() -> Result<(), Error> {
    let _guard = init_tracing()?;

    assert!(matches!(
        ProduceResponse::try_from(Response::from(MetadataResponse::default())),
        Err(ProtocolError::UnexpectedResponse {
            expected: 0,
            received: 3
        })
    ));

    Ok(())
}
