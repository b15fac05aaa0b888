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

use bytes::Bytes;
use clap::Args;
use kiln_client::Client;
use kiln_sans_io::{ErrorCode, ProduceRequest};

use crate::Result;

use super::report;

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    /// The topic receiving the message, always on partition 0
    pub(super) topic: String,

    /// Message key, null when absent
    #[arg(long)]
    pub(super) key: Option<String>,

    /// Message value
    pub(super) value: String,
}

impl From<Arg> for ProduceRequest {
    fn from(value: Arg) -> Self {
        ProduceRequest::default()
            .topic(value.topic)
            .key(value.key.map(Bytes::from))
            .value(Some(Bytes::from(value.value)))
    }
}

impl Arg {
    pub(super) async fn main(self, client: &mut Client) -> Result<ErrorCode> {
        report(client.call(ProduceRequest::from(self)).await)
    }
}
