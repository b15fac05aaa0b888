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

use std::{
    fmt::{self, Display, Formatter},
    process::{ExitCode, Termination},
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Protocol error codes returned by a broker in topic or partition results.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum ErrorCode {
    #[default]
    None,
    UnknownTopicOrPartition,
    LeaderNotAvailable,
    RequestTimedOut,
    InvalidReplicationFactor,
}

impl Termination for ErrorCode {
    fn report(self) -> ExitCode {
        if let Self::None = self {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl TryFrom<i16> for ErrorCode {
    type Error = Error;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::try_from(&value)
    }
}

impl TryFrom<&i16> for ErrorCode {
    type Error = Error;

    fn try_from(value: &i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            3 => Ok(Self::UnknownTopicOrPartition),
            5 => Ok(Self::LeaderNotAvailable),
            7 => Ok(Self::RequestTimedOut),
            41 => Ok(Self::InvalidReplicationFactor),
            otherwise => Err(Error::UnknownApiErrorCode(*otherwise)),
        }
    }
}

impl From<ErrorCode> for i16 {
    fn from(value: ErrorCode) -> Self {
        Self::from(&value)
    }
}

impl From<&ErrorCode> for i16 {
    fn from(value: &ErrorCode) -> Self {
        match value {
            ErrorCode::None => 0,
            ErrorCode::UnknownTopicOrPartition => 3,
            ErrorCode::LeaderNotAvailable => 5,
            ErrorCode::RequestTimedOut => 7,
            ErrorCode::InvalidReplicationFactor => 41,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::None => f.write_str("No error."),
            ErrorCode::UnknownTopicOrPartition => {
                f.write_str("This server does not host this topic-partition.")
            }
            ErrorCode::LeaderNotAvailable => f.write_str(
                "There is no leader for this topic-partition as we are in the middle of a \
                 leadership election.",
            ),
            ErrorCode::RequestTimedOut => f.write_str("The request timed out."),
            ErrorCode::InvalidReplicationFactor => f.write_str("Replication factor is invalid."),
        }
    }
}

/// Map a protocol error code into an [`Error`], with `0` being no error.
///
/// ```
/// use kiln_sans_io::{Error, ErrorCode, map_error_code};
///
/// assert!(map_error_code(0).is_none());
///
/// assert!(matches!(
///     map_error_code(41),
///     Some(Error::Api(ErrorCode::InvalidReplicationFactor))
/// ));
///
/// assert!(matches!(
///     map_error_code(-1),
///     Some(Error::UnknownApiErrorCode(-1))
/// ));
/// ```
pub fn map_error_code(error_code: i16) -> Option<Error> {
    match ErrorCode::try_from(error_code) {
        Ok(ErrorCode::None) => None,
        Ok(error_code) => Some(Error::Api(error_code)),
        Err(error) => Some(error),
    }
}

/// Responses carrying per topic or per partition error codes.
pub trait ErrorCodes {
    /// every error code, topics before their partitions, in response order
    fn error_codes(&self) -> Vec<i16>;

    /// the first non-zero error code as an [`Error`]
    fn error(&self) -> Option<Error> {
        self.error_codes().into_iter().find_map(map_error_code)
    }
}
