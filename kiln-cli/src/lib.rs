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

use std::{collections::HashMap, env::vars, fmt, result, str::FromStr};

mod cli;

pub use cli::Cli;
use regex::{Regex, Replacer};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    Client(#[from] kiln_client::Error),
    Json(#[from] serde_json::Error),
    Regex(#[from] regex::Error),
    Url(#[from] url::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(error) => write!(f, "{error}"),
            error => write!(f, "{error:?}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;

/// `${NAME}` references replaced with the value of the variable `NAME`
#[derive(Clone, Debug)]
pub struct VarRep(HashMap<String, String>);

impl From<HashMap<String, String>> for VarRep {
    fn from(value: HashMap<String, String>) -> Self {
        Self(value)
    }
}

impl VarRep {
    fn replace(&self, haystack: &str) -> Result<String> {
        Regex::new(r"\$\{(?<var>[^\}]+)\}")
            .map(|re| re.replace_all(haystack, self).into_owned())
            .map_err(Into::into)
    }
}

impl Replacer for &VarRep {
    fn replace_append(&mut self, caps: &regex::Captures<'_>, dst: &mut String) {
        if let Some(variable) = caps.name("var")
            && let Some(value) = self.0.get(variable.as_str())
        {
            dst.push_str(value);
        }
    }
}

/// An argument expanded with environment variables before being parsed,
/// e.g. `tcp://${KILN_HOST}:9092`
#[derive(Clone, Debug)]
pub struct EnvVarExp<T>(T);

impl<T> EnvVarExp<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromStr for EnvVarExp<T>
where
    T: FromStr,
    Error: From<<T as FromStr>::Err>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VarRep::from(vars().collect::<HashMap<_, _>>())
            .replace(s)
            .and_then(|s| T::from_str(&s).map_err(Into::into))
            .map(|t| Self(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replace_known_variables() -> Result<()> {
        let rep = VarRep::from(HashMap::from([
            ("HOST".into(), "broker".into()),
            ("PORT".into(), "9093".into()),
        ]));

        assert_eq!(
            "tcp://broker:9093",
            rep.replace("tcp://${HOST}:${PORT}")?
        );
        Ok(())
    }

    #[test]
    fn unknown_variable_is_empty() -> Result<()> {
        let rep = VarRep::from(HashMap::new());
        assert_eq!("tcp://:9092", rep.replace("tcp://${UNDEFINED}:9092")?);
        Ok(())
    }

    #[test]
    fn url_without_variables() -> Result<()> {
        let url = EnvVarExp::<url::Url>::from_str("tcp://localhost:9092")?.into_inner();

        assert_eq!(Some("localhost"), url.host_str());
        assert_eq!(Some(9092), url.port());
        Ok(())
    }
}
