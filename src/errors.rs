use crate::registry::ChainFamily;

/// Failure taxonomy for every upstream fetch.
///
/// Adapters convert any transport-, provider- or payload-level failure into
/// one of these variants at their boundary; raw `reqwest`/`serde` errors never
/// cross into the aggregation or polling layers. Each variant carries the
/// label of the failing source so that logs and surfaced error state name the
/// upstream that misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network-level failure: connect, timeout, TLS, interrupted body.
    #[error("{source_name}: transport failure: {message}")]
    Transport { source_name: &'static str, message: String },

    /// The upstream answered but the answer is unusable: non-2xx status or a
    /// provider-reported failure status inside a 200 body.
    #[error("{source_name}: upstream failure: {message}")]
    Upstream {
        source_name: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The payload arrived but did not have the expected shape.
    #[error("{source_name}: unexpected payload: {message}")]
    Parse { source_name: &'static str, message: String },

    /// A required credential or endpoint is not configured.
    #[error("{source_name}: missing configuration: {what}")]
    Config { source_name: &'static str, what: &'static str },

    /// The chain family has no implementation for the requested capability.
    #[error("{capability} is not supported for the {family} chain family")]
    Unsupported {
        family: ChainFamily,
        capability: &'static str,
    },
}

impl FetchError {
    pub fn transport(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Transport { source_name, message: message.into() }
    }

    pub fn upstream(source_name: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream { source_name, status, message: message.into() }
    }

    pub fn parse(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Parse { source_name, message: message.into() }
    }

    pub fn config(source_name: &'static str, what: &'static str) -> Self {
        Self::Config { source_name, what }
    }

    pub fn unsupported(family: ChainFamily, capability: &'static str) -> Self {
        Self::Unsupported { family, capability }
    }

    /// Classify a `reqwest` error under the taxonomy.
    pub fn from_reqwest(source_name: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Parse { source_name, message: err.to_string() };
        }
        if let Some(status) = err.status() {
            return Self::Upstream { source_name, status: Some(status.as_u16()), message: err.to_string() };
        }
        Self::Transport { source_name, message: err.to_string() }
    }

    /// Name of the source that produced this error, for logs and error state.
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Transport { source_name, .. }
            | Self::Upstream { source_name, .. }
            | Self::Parse { source_name, .. }
            | Self::Config { source_name, .. } => source_name,
            Self::Unsupported { .. } => "adapter-registry",
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
