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

use clap::Subcommand;
use kiln_client::Client;
use kiln_sans_io::{CreateTopicsRequest, ErrorCode, create_topics::DEFAULT_TIMEOUT_MS};

use crate::Result;

use super::report;

#[derive(Clone, Debug, Subcommand)]
pub(super) enum Command {
    /// Create a topic
    Create {
        /// The name of the topic to create
        #[clap(value_parser)]
        name: String,

        /// The number of partitions to create
        #[arg(long, default_value = "1")]
        partitions: i32,

        /// The number of replicas of each partition
        #[arg(long, default_value = "1")]
        replication_factor: i16,

        /// How long the broker may take to create the topic
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: i32,
    },
}

impl From<Command> for CreateTopicsRequest {
    fn from(value: Command) -> Self {
        match value {
            Command::Create {
                name,
                partitions,
                replication_factor,
                timeout_ms,
            } => CreateTopicsRequest::default()
                .topic(name)
                .partitions(partitions)
                .replication_factor(replication_factor)
                .timeout_ms(timeout_ms),
        }
    }
}

impl Command {
    pub(super) async fn main(self, client: &mut Client) -> Result<ErrorCode> {
        report(client.call(CreateTopicsRequest::from(self)).await)
    }
}
