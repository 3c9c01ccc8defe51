//! Numeric token normalization for perf's locale-dependent text output.
//!
//! perf prints counter values with a grouping separator and the elapsed time
//! with a decimal separator, and which character plays which role depends on
//! the locale the tool ran under. The same raw token is ambiguous on its own
//! (`1.234` is either 1234 grouped or 1.234 fractional), so the convention is
//! explicit caller-supplied configuration, never inferred per token.

/// Separator convention of one log source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    /// Thousands-grouping character, stripped before integer parsing.
    pub grouping: char,
    /// Decimal character of the elapsed-time line, substituted with `.`
    /// before float parsing.
    pub decimal: char,
}

impl NumberFormat {
    /// perf under a European locale: `1.234.567` counts, `0,00456` seconds.
    pub const EUROPEAN: Self = Self {
        grouping: '.',
        decimal: ',',
    };

    /// perf under the C locale: `1,234,567` counts, `0.00456` seconds.
    pub const C_LOCALE: Self = Self {
        grouping: ',',
        decimal: '.',
    };

    /// Parse a counter-value token. Counts are always integers once the
    /// grouping separator is removed; anything else is malformed and yields
    /// `None` rather than an error.
    pub fn parse_count(&self, token: &str) -> Option<u64> {
        let cleaned: String = token.trim().chars().filter(|c| *c != self.grouping).collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse().ok()
    }

    /// Parse an elapsed-time token. Time is always a float once the grouping
    /// separator is removed and the decimal separator is substituted.
    pub fn parse_seconds(&self, token: &str) -> Option<f64> {
        let cleaned: String = token
            .trim()
            .chars()
            .filter(|c| *c != self.grouping)
            .map(|c| if c == self.decimal { '.' } else { c })
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse().ok()
    }
}
