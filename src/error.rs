/// Errors which can occur while attacking a ciphertext
#[derive(Debug)]
pub enum PadbusterError {
    /// Occurs when the input is malformed, before any probe is sent.
    ConfigurationError(String),
    /// Occurs when the oracle cannot be reached or answers garbage.
    OracleTransportError(String),
    /// Occurs when no candidate byte satisfied the oracle (block index, byte offset).
    ByteNotFoundError(usize, usize),
    /// Occurs when the genuine last plaintext byte is not a padding length.
    InvalidPaddingError(u8),
}

impl std::fmt::Display for PadbusterError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PadbusterError::ConfigurationError(ref s) => write!(f, "{}", s),
            PadbusterError::OracleTransportError(ref s) => {
                write!(f, "Unable to reach padding oracle: {}", s)
            }
            PadbusterError::ByteNotFoundError(ref block, ref offset) => write!(
                f,
                "Not found in block: {}, byte: {} (no candidate accepted by oracle)",
                block, offset
            ),
            PadbusterError::InvalidPaddingError(ref pad) => {
                write!(f, "Recovered padding byte {:#04x} is not a valid padding", pad)
            }
        }
    }
}

impl std::error::Error for PadbusterError {}

impl From<hex::FromHexError> for PadbusterError {
    fn from(e: hex::FromHexError) -> Self {
        PadbusterError::ConfigurationError(format!("Invalid hex input: {}", e))
    }
}

impl From<reqwest::Error> for PadbusterError {
    fn from(e: reqwest::Error) -> Self {
        PadbusterError::OracleTransportError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_block_and_offset() {
        let e = PadbusterError::ByteNotFoundError(2, 13);
        assert_eq!(
            e.to_string(),
            "Not found in block: 2, byte: 13 (no candidate accepted by oracle)"
        );
    }

    #[test]
    fn test_from_hex_error() {
        let e: PadbusterError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(e, PadbusterError::ConfigurationError(_)));
    }
}
