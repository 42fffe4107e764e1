//! Padding oracle attack on CBC mode ciphertexts.
//!
//! The engine never holds the key: every plaintext byte is inferred from
//! whether the oracle accepts the padding of a forged ciphertext.

mod attack;
mod block;
mod error;
mod oracle;
mod progress;
mod solver;

#[cfg(test)]
mod testing;

pub use attack::{AttackState, Padbuster};
pub use block::{Block, CipherText};
pub use error::PadbusterError;
pub use oracle::{HttpOracle, HttpOracleBuilder, Oracle, OracleQuery};
pub use progress::{LogReporter, Progress, ProgressReporter, Silent};
pub use solver::{BlockSolver, ByteSolver, SolveEvent};
