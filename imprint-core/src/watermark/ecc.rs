//! Repetition code used to recover watermark bits.
//!
//! Every logical bit is written to `n` independent samples and decoded by
//! majority vote, which corrects up to `(n - 1) / 2` corrupted samples.

/// Result of voting over the samples of one logical bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub bit: bool,
    /// Fraction of samples that agree with `bit`, in `[0.5, 1.0]`.
    pub agreement: f64,
}

/// An n-fold repetition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionCode {
    copies: usize,
}

impl RepetitionCode {
    pub fn new(copies: usize) -> Self {
        Self {
            copies: copies.max(1),
        }
    }

    pub fn copies(&self) -> usize {
        self.copies
    }

    /// Corrupted samples per bit that are guaranteed to be corrected.
    pub fn correctable(&self) -> usize {
        (self.copies - 1) / 2
    }

    /// Majority vote. A tie reads as 0.
    pub fn decode(&self, samples: &[bool]) -> Vote {
        if samples.is_empty() {
            return Vote {
                bit: false,
                agreement: 0.0,
            };
        }

        let ones = samples.iter().filter(|&&s| s).count();
        let zeros = samples.len() - ones;
        let bit = ones > zeros;
        let agreeing = if bit { ones } else { zeros };

        Vote {
            bit,
            agreement: agreeing as f64 / samples.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanimous_vote() {
        let code = RepetitionCode::new(5);
        let vote = code.decode(&[true; 5]);
        assert!(vote.bit);
        assert_eq!(vote.agreement, 1.0);
    }

    #[test]
    fn test_corrects_minority_errors() {
        let code = RepetitionCode::new(7);
        assert_eq!(code.correctable(), 3);
        let vote = code.decode(&[true, true, false, true, false, true, false]);
        assert!(vote.bit);
        assert!((vote.agreement - 4.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_reads_zero() {
        let vote = RepetitionCode::new(4).decode(&[true, false, true, false]);
        assert!(!vote.bit);
        assert_eq!(vote.agreement, 0.5);
    }

    #[test]
    fn test_empty_samples() {
        let vote = RepetitionCode::new(3).decode(&[]);
        assert!(!vote.bit);
        assert_eq!(vote.agreement, 0.0);
    }

    #[test]
    fn test_single_copy_corrects_nothing() {
        assert_eq!(RepetitionCode::new(1).correctable(), 0);
        assert_eq!(RepetitionCode::new(0).copies(), 1);
    }
}
