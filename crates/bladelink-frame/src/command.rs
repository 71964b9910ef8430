use std::fmt;

use crate::error::Result;
use crate::frame::{build_frame, build_query};

/// An outbound request: a target path plus ordered parameters.
///
/// Built once per user action and consumed by [`Command::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    target: String,
    subaddr: Option<String>,
    params: Vec<(String, String)>,
    query: bool,
}

impl Command {
    /// Create a command addressed to `target` with no parameters.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            subaddr: None,
            params: Vec::new(),
            query: false,
        }
    }

    /// Create a state query, encoded as `<TARGET[:SUBADDR]?>`.
    pub fn query(target: impl Into<String>) -> Self {
        Self {
            query: true,
            ..Self::new(target)
        }
    }

    /// Set the sub-address (e.g. `1.2` for mixer 1, channel 2).
    pub fn at(mut self, subaddr: impl Into<String>) -> Self {
        self.subaddr = Some(subaddr.into());
        self
    }

    /// Append a parameter. Values are escaped during encoding.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn subaddr(&self) -> Option<&str> {
        self.subaddr.as_deref()
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_query(&self) -> bool {
        self.query
    }

    /// Serialize into a wire frame (without the line terminator).
    ///
    /// Query commands ignore any parameters.
    pub fn encode(&self) -> Result<String> {
        if self.query {
            build_query(&self.target, self.subaddr.as_deref())
        } else {
            build_frame(&self.target, self.subaddr.as_deref(), &self.params)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(frame) => f.write_str(&frame),
            Err(_) => write!(f, "<invalid command for {}>", self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    #[test]
    fn encode_with_params() {
        let cmd = Command::new("UMIX").at("1.2").param("ON", 1).param("FDRA", -6.5);
        assert_eq!(cmd.encode().unwrap(), "<UMIX:1.2|ON:1,FDRA:-6.5>");
        assert_eq!(cmd.target(), "UMIX");
        assert_eq!(cmd.subaddr(), Some("1.2"));
        assert_eq!(cmd.params().len(), 2);
        assert!(!cmd.is_query());
    }

    #[test]
    fn encode_query() {
        assert_eq!(Command::query("SYS").encode().unwrap(), "<SYS?>");
        assert_eq!(
            Command::query("DST").at("00400001").encode().unwrap(),
            "<DST:00400001?>"
        );
    }

    #[test]
    fn encode_propagates_invalid_command() {
        let err = Command::new("BAD>").encode().unwrap_err();
        assert!(matches!(err, FrameError::InvalidCommand(_)));
        assert_eq!(Command::new("BAD>").to_string(), "<invalid command for BAD>>");
    }

    #[test]
    fn display_matches_encoding() {
        let cmd = Command::new("SALVO").at("4").param("FIRE", 1);
        assert_eq!(cmd.to_string(), "<SALVO:4|FIRE:1>");
    }
}
