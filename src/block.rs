use std::ops::{Deref, DerefMut};

use crate::PadbusterError;

/// `Block` is one fixed-width chunk of CBC data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block(Vec<u8>);

impl Block {
    /// Return a block of `size` zero bytes
    pub fn zeroed(size: usize) -> Self {
        Block(vec![0u8; size])
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Block(bytes.to_vec())
    }

    /// XOR with another block of the same width
    pub fn xor(&self, other: &[u8]) -> Block {
        Block(xor_data(&self.0, other))
    }

    /// XOR every byte with `b`
    pub fn xor_byte(&self, b: u8) -> Block {
        Block(xor_data(&self.0, &[b]))
    }

    /// Return `self || other` as raw bytes
    pub fn concat(&self, other: &[u8]) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.0.len() + other.len());
        res.extend_from_slice(&self.0);
        res.extend_from_slice(other);
        res
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for Block {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// `CipherText` is an IV block followed by the blocks to decrypt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherText {
    block_size: usize,
    blocks: Vec<Block>,
}

impl CipherText {
    /// Split raw bytes into blocks
    ///
    /// # Arguments
    ///
    /// * `bytes` - IV followed by ciphertext.
    /// * `block_size` - Size of CBC block (8, 16, 32).
    ///
    pub fn from_bytes(bytes: &[u8], block_size: usize) -> Result<Self, PadbusterError> {
        if block_size == 0 || block_size > u8::MAX as usize {
            return Err(PadbusterError::ConfigurationError(format!(
                "Invalid block size {}",
                block_size
            )));
        }
        if bytes.len() % block_size != 0 {
            return Err(PadbusterError::ConfigurationError(format!(
                "Ciphertext of {} bytes not of block size {}",
                bytes.len(),
                block_size
            )));
        }
        if bytes.len() < block_size * 2 {
            return Err(PadbusterError::ConfigurationError(
                "ciphertext too short to attack".to_string(),
            ));
        }

        Ok(CipherText {
            block_size,
            blocks: bytes.chunks(block_size).map(Block::from_slice).collect(),
        })
    }

    pub fn from_hex(ciphertext: &str, block_size: usize) -> Result<Self, PadbusterError> {
        let bytes = hex::decode(ciphertext.trim())?;
        Self::from_bytes(&bytes, block_size)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn len_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    /// The block XORed into `index` during CBC decryption
    pub fn predecessor(&self, index: usize) -> &Block {
        &self.blocks[index - 1]
    }

    /// Number of bytes the attack can recover (everything after the IV)
    pub fn payload_len(&self) -> usize {
        (self.blocks.len() - 1) * self.block_size
    }

    pub fn to_hex(&self) -> String {
        self.blocks.iter().map(Block::to_hex).collect()
    }
}

/// `xor_data` xor data with key, repeating the key
pub(crate) fn xor_data(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    let mut res = vec![0u8; data.len()];
    for (index, b) in data.iter().enumerate() {
        res[index] = b ^ key[index % key.len()];
    }
    res
}
