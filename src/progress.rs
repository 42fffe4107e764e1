use log::{debug, info};

/// `Progress` counts decrypted bytes against the attackable payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    decrypted: usize,
    total: usize,
}

impl Progress {
    pub fn new(decrypted: usize, total: usize) -> Self {
        Progress { decrypted, total }
    }

    pub fn decrypted(&self) -> usize {
        self.decrypted
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.decrypted as f64 / self.total as f64 * 100.0
    }

    /// Human readable line, `scan_fraction` being how far the current byte scan went
    pub fn line(&self, scan_fraction: f64) -> String {
        format!(
            "Padding Oracle Attack - total: {:.1}%, current: {:.0}%",
            self.percent(),
            scan_fraction * 100.0
        )
    }
}

/// Observer of a running attack. Every hook defaults to doing nothing.
pub trait ProgressReporter {
    fn scanning(&mut self, _progress: Progress, _scan_fraction: f64) {}

    fn byte_solved(&mut self, _progress: Progress, _plaintext_byte: u8) {}

    fn block_solved(&mut self, _block_index: usize, _progress: Progress) {}
}

/// Reporter for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl ProgressReporter for Silent {}

/// Reporter writing through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn scanning(&mut self, progress: Progress, scan_fraction: f64) {
        debug!("{}", progress.line(scan_fraction));
    }

    fn byte_solved(&mut self, progress: Progress, plaintext_byte: u8) {
        info!(
            "{} - found {:02x}",
            progress.line(1.0),
            plaintext_byte
        );
    }

    fn block_solved(&mut self, block_index: usize, progress: Progress) {
        info!(
            "*** Block {} done *** ({}/{} bytes)",
            block_index,
            progress.decrypted(),
            progress.total()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line() {
        let progress = Progress::new(4, 32);
        assert_eq!(
            progress.line(0.5),
            "Padding Oracle Attack - total: 12.5%, current: 50%"
        );
    }

    #[test]
    fn test_percent_bounds() {
        assert_eq!(Progress::new(0, 48).percent(), 0.0);
        assert_eq!(Progress::new(48, 48).percent(), 100.0);
        assert_eq!(Progress::new(0, 0).percent(), 100.0);
    }
}
