use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Connection could not be established or was dropped mid-transfer.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Faults raised by the transport itself rather than by the caller.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Network(_) | BridgeError::Timeout(_) | BridgeError::HttpStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(BridgeError::Network("reset".into()).is_transport());
        assert!(BridgeError::Timeout(3000).is_transport());
        assert!(BridgeError::HttpStatus {
            status: 503,
            url: "https://cdn.example.com/a.ts".into()
        }
        .is_transport());
        assert!(!BridgeError::OperationFailed("bad header".into()).is_transport());
        assert!(!BridgeError::NotAvailable("engine".into()).is_transport());
    }
}
