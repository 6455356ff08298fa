//! Attempt limit: how many times a task may be handed to the transport.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Upper bound on attempts for one task.
///
/// Built from the caller's integer: zero or negative means "retry until it
/// succeeds".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptLimit {
    Unlimited,
    AtMost(NonZeroU32),
}

impl AttemptLimit {
    pub fn unlimited() -> Self {
        AttemptLimit::Unlimited
    }

    /// `at_most(0)` is `Unlimited`.
    pub fn at_most(n: u32) -> Self {
        NonZeroU32::new(n).map_or(AttemptLimit::Unlimited, AttemptLimit::AtMost)
    }

    /// May a task that has already made `attempts_made` attempts be dispatched again?
    pub fn permits_another(self, attempts_made: u32) -> bool {
        match self {
            AttemptLimit::Unlimited => true,
            AttemptLimit::AtMost(max) => attempts_made < max.get(),
        }
    }
}

impl From<i32> for AttemptLimit {
    fn from(n: i32) -> Self {
        if n <= 0 {
            AttemptLimit::Unlimited
        } else {
            AttemptLimit::at_most(n.unsigned_abs())
        }
    }
}

impl fmt::Display for AttemptLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptLimit::Unlimited => f.write_str("unlimited"),
            AttemptLimit::AtMost(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-5, AttemptLimit::Unlimited)]
    #[case(0, AttemptLimit::Unlimited)]
    #[case(1, AttemptLimit::at_most(1))]
    #[case(7, AttemptLimit::at_most(7))]
    fn integer_conversion(#[case] input: i32, #[case] expected: AttemptLimit) {
        assert_eq!(AttemptLimit::from(input), expected);
    }

    #[rstest]
    #[case(AttemptLimit::at_most(3), 0, true)]
    #[case(AttemptLimit::at_most(3), 2, true)]
    #[case(AttemptLimit::at_most(3), 3, false)]
    #[case(AttemptLimit::at_most(1), 1, false)]
    #[case(AttemptLimit::Unlimited, 1_000_000, true)]
    fn permits_another(#[case] limit: AttemptLimit, #[case] made: u32, #[case] expected: bool) {
        assert_eq!(limit.permits_another(made), expected);
    }

    #[test]
    fn displays_like_the_cli_flag() {
        assert_eq!(AttemptLimit::Unlimited.to_string(), "unlimited");
        assert_eq!(AttemptLimit::at_most(4).to_string(), "4");
    }
}
