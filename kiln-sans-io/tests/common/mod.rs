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

#![allow(dead_code)]

use std::{error, fs, fs::File, sync::Arc, thread};

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

pub(crate) type Error = Box<dyn error::Error + Send + Sync>;

pub(crate) fn init_tracing() -> Result<DefaultGuard, Error> {
    let directory = format!("../logs/{}", env!("CARGO_PKG_NAME"));
    fs::create_dir_all(&directory)?;

    Ok(tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_level(true)
            .with_line_number(true)
            .with_thread_names(false)
            .with_target(true)
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(
                    format!("{}=debug", env!("CARGO_PKG_NAME").replace("-", "_")).parse()?,
                ),
            )
            .with_writer(
                thread::current()
                    .name()
                    .ok_or(Error::from("unnamed thread"))
                    .and_then(|name| {
                        File::create(format!(
                            "{directory}/{}::{name}.log",
                            env!("CARGO_CRATE_NAME")
                        ))
                        .map_err(Into::into)
                    })
                    .map(Arc::new)?,
            )
            .finish(),
    ))
}
