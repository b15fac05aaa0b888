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

use clap::Args;
use kiln_client::Client;
use kiln_sans_io::ErrorCode;

use crate::Result;

use super::report;

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    /// The topic to look up
    topic: String,

    /// Partitions sent with the request
    #[arg(long, default_value = "0")]
    partitions: i32,

    /// Replication factor sent with the request
    #[arg(long, default_value = "0")]
    replication_factor: i16,
}

impl Arg {
    pub(super) async fn main(self, client: &mut Client) -> Result<ErrorCode> {
        report(
            client
                .metadata(&self.topic, self.partitions, self.replication_factor)
                .await,
        )
    }
}
