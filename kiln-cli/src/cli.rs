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

use std::{process, time::Duration};

use crate::{EnvVarExp, Result};
use clap::{Args, Parser, Subcommand};
use kiln_client::{Client, Error};
use kiln_sans_io::{ErrorCode, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

mod metadata;
mod produce;
mod topic;

const DEFAULT_BROKER: &str = "tcp://localhost:9092";

#[derive(Clone, Debug, Parser)]
#[command(name = "kiln", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[clap(flatten)]
    connection: Connection,
}

/// Arguments common to every command
#[derive(Args, Clone, Debug)]
struct Connection {
    /// Broker URL
    #[arg(long, global = true, env = "KILN_BROKER", default_value = DEFAULT_BROKER)]
    broker: EnvVarExp<Url>,

    /// Client id sent in every request header
    #[arg(long, global = true, env = "KILN_CLIENT_ID")]
    client_id: Option<String>,

    /// Give up when the broker connection is not established within this time
    #[arg(long, global = true, default_value = "5000")]
    connect_timeout_ms: u64,
}

impl Connection {
    async fn client(self) -> Result<Client> {
        Client::builder(self.broker.into_inner())
            .client_id(self.client_id)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .build()
            .await
            .map_err(Into::into)
    }
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Look up the metadata of a topic
    Metadata(metadata::Arg),

    /// Produce a single message to a topic
    Produce(produce::Arg),

    /// Create topics managed by the broker
    Topic {
        #[command(subcommand)]
        command: topic::Command,
    },
}

impl Cli {
    pub async fn main() -> Result<ErrorCode> {
        debug!(pid = process::id());

        let cli = Cli::parse();
        let mut client = cli.connection.client().await?;

        let outcome = match cli.command {
            Command::Metadata(arg) => arg.main(&mut client).await,
            Command::Produce(arg) => arg.main(&mut client).await,
            Command::Topic { command } => command.main(&mut client).await,
        };

        outcome
            .inspect(|error_code| debug!(?error_code))
            .inspect_err(|err| debug!(?err))
    }
}

/// Print the outcome of a request as JSON.
fn report<R>(outcome: kiln_client::Result<R>) -> Result<ErrorCode>
where
    R: Serialize + TryFrom<Response, Error = kiln_sans_io::Error>,
{
    render(outcome).map(|(json, error_code)| {
        println!("{json}");
        error_code
    })
}

/// The typed response as JSON, with the error code it carries.
///
/// A response rejected with a known error code is rendered in the same shape
/// as an accepted one, the code becoming the exit status of the command.
fn render<R>(outcome: kiln_client::Result<R>) -> Result<(String, ErrorCode)>
where
    R: Serialize + TryFrom<Response, Error = kiln_sans_io::Error>,
{
    match outcome {
        Ok(response) => serde_json::to_string_pretty(&response)
            .map(|json| (json, ErrorCode::None))
            .map_err(Into::into),

        Err(Error::Rejected {
            error: kiln_sans_io::Error::Api(error_code),
            response,
        }) => R::try_from(*response)
            .map_err(|error| crate::Error::from(Error::from(error)))
            .and_then(|response| serde_json::to_string_pretty(&response).map_err(Into::into))
            .map(|json| (json, error_code)),

        Err(error) => Err(error.into()),
    }
}
