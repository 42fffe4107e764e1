//! AES-128-CBC padding oracle used by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hex_literal::hex;

use crate::{Oracle, PadbusterError};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const KEY: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");
pub const IV: [u8; 16] = hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");

/// Return `iv || AES-128-CBC(plaintext)` with PKCS#7 padding
pub fn encrypt(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let ciphertext =
        Aes128CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut data = iv.to_vec();
    data.extend_from_slice(&ciphertext);
    data
}

/// Padding oracle over a known key, recording every probe
pub struct CbcOracle {
    key: [u8; 16],
    calls: AtomicUsize,
    probes: Mutex<Vec<Vec<u8>>>,
    // Probes identical to this are answered "invalid", as a server whose
    // integrity check succeeds would.
    genuine: Option<Vec<u8>>,
    // Number of leading probes answered "invalid" regardless of padding.
    blind: usize,
}

impl CbcOracle {
    pub fn new(key: [u8; 16]) -> Self {
        CbcOracle {
            key,
            calls: AtomicUsize::new(0),
            probes: Mutex::new(Vec::new()),
            genuine: None,
            blind: 0,
        }
    }

    pub fn rejecting_genuine(mut self, ciphertext: &[u8]) -> Self {
        self.genuine = Some(ciphertext.to_vec());
        self
    }

    pub fn blind_for(mut self, probes: usize) -> Self {
        self.blind = probes;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> Vec<Vec<u8>> {
        self.probes.lock().unwrap().clone()
    }

    fn padding_valid(&self, data: &[u8]) -> bool {
        if data.len() < 32 || data.len() % 16 != 0 {
            return false;
        }
        let cipher = Aes128CbcDec::new_from_slices(&self.key, &data[..16]).unwrap();
        cipher.decrypt_padded_vec_mut::<Pkcs7>(&data[16..]).is_ok()
    }
}

impl Oracle for CbcOracle {
    fn query(&self, candidate: &[u8]) -> Result<bool, PadbusterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.probes.lock().unwrap().push(candidate.to_vec());
        if call < self.blind {
            return Ok(false);
        }
        if self.genuine.as_deref() == Some(candidate) {
            return Ok(false);
        }
        Ok(self.padding_valid(candidate))
    }
}
