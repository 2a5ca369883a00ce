use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum RemoteFailure {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unexpected status {status}")]
    Status { status: u16 },
    #[error("response carried no data")]
    MissingData,
    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// `{success, error?, data?}` wrapper every remote response uses.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// `data` may be absent on success.
    pub fn into_result(self) -> Result<Option<T>, RemoteFailure> {
        if self.success {
            Ok(self.data)
        } else {
            Err(RemoteFailure::Rejected(
                self.error.unwrap_or_else(|| "unspecified error".to_owned()),
            ))
        }
    }

    pub fn into_data(self) -> Result<T, RemoteFailure> {
        self.into_result()?.ok_or(RemoteFailure::MissingData)
    }
}

/// Decodes a response body. A non-2xx status still goes through the envelope
/// when the body carries one, so the remote error text survives.
pub fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
) -> Result<Envelope<T>, RemoteFailure> {
    match serde_json::from_slice::<Envelope<T>>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !(200..300).contains(&status) => Err(RemoteFailure::Status { status }),
        Err(e) => Err(RemoteFailure::Decode(e)),
    }
}
