//! Decode options: the leniency policy plus diagnostic verbosity.

use std::ops::{BitOr, BitOrAssign};

/// Bit set of decode options.
///
/// `ALLOW_INVALID` implies `ALLOW_EMPTY`, and `TRACE` implies `DEBUG`. The
/// verbosity flags only select diagnostic output, never the decode outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Options(u8);

impl Options {
    pub const NONE: Self = Self(0);
    /// Emit trace output for every proxy and copy step.
    pub const TRACE: Self = Self(1);
    /// Emit one line per decode naming the value and proxy shapes.
    pub const DEBUG: Self = Self(2);
    /// Decode empty identifier text to the nil identifier.
    pub const ALLOW_EMPTY: Self = Self(4);
    /// Decode unparseable identifier text to the nil identifier.
    pub const ALLOW_INVALID: Self = Self(8);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn trace(self) -> bool {
        self.contains(Self::TRACE)
    }

    pub const fn debug(self) -> bool {
        self.trace() || self.contains(Self::DEBUG)
    }

    pub const fn allows_empty(self) -> bool {
        self.contains(Self::ALLOW_EMPTY) || self.allows_invalid()
    }

    pub const fn allows_invalid(self) -> bool {
        self.contains(Self::ALLOW_INVALID)
    }

    /// Whether decoding has to go through a proxy value.
    pub const fn is_lenient(self) -> bool {
        self.allows_empty()
    }
}

impl BitOr for Options {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Options {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl FromIterator<Options> for Options {
    fn from_iter<I: IntoIterator<Item = Options>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::union)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implications_matrix() {
        assert!(!Options::NONE.is_lenient());
        assert!(Options::ALLOW_EMPTY.allows_empty());
        assert!(!Options::ALLOW_EMPTY.allows_invalid());
        assert!(Options::ALLOW_INVALID.allows_empty());
        assert!(Options::ALLOW_INVALID.allows_invalid());
        assert!(Options::TRACE.debug());
        assert!(Options::DEBUG.debug());
        assert!(!Options::DEBUG.trace());
        assert!(!Options::TRACE.is_lenient());
    }

    #[test]
    fn combine_with_or_and_collect() {
        let mut opts = Options::DEBUG;
        opts |= Options::ALLOW_EMPTY;
        assert_eq!(opts, Options::DEBUG | Options::ALLOW_EMPTY);
        assert_eq!(opts.bits(), 6);

        let collected: Options = [Options::TRACE, Options::ALLOW_INVALID].into_iter().collect();
        assert!(collected.trace());
        assert!(collected.allows_invalid());
        assert_eq!(Vec::<Options>::new().into_iter().collect::<Options>(), Options::NONE);
    }
}
