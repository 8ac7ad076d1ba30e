// The result of running a single test execution against a buffer, and the
// total order over those results.
//
// Variant declaration order matters: derived `Ord` compares enum variants
// in declaration order, so `Overrun < Invalid < Valid < Interesting` falls
// straight out of this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// The test asked for more bytes than the buffer provides.
    Overrun,
    /// The test rejected this input (`mark_invalid`, or a filter that made
    /// no progress).
    Invalid,
    /// The test ran to completion uneventfully.
    Valid,
    /// The test triggered the property failure.
    Interesting,
}

/// Lexicographic key used to order two `Interesting` candidates: smaller is
/// a better (more-shrunk) counterexample. Comparing the full `Vec<u8>` as
/// the final tiebreak means two candidates of equal cost, interval count
/// and length are ordered the same way `Vec<u8>`'s own `Ord` would order
/// them.
pub fn interest_key(cost: u64, interval_count: usize, buffer: &[u8]) -> (u64, usize, usize, &[u8]) {
    (cost, interval_count, buffer.len(), buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering() {
        assert!(Status::Overrun < Status::Invalid);
        assert!(Status::Invalid < Status::Valid);
        assert!(Status::Valid < Status::Interesting);
    }

    #[test]
    fn interest_key_prefers_lower_cost() {
        let cheap = interest_key(0, 1, b"zz");
        let expensive = interest_key(1, 0, b"a");
        assert!(cheap < expensive);
    }

    #[test]
    fn interest_key_prefers_fewer_intervals_over_length() {
        let fewer = interest_key(0, 1, b"zzzz");
        let more = interest_key(0, 2, b"a");
        assert!(fewer < more);
    }

    #[test]
    fn interest_key_prefers_shorter_over_lexicographic() {
        let shorter = interest_key(0, 0, b"zz");
        let longer = interest_key(0, 0, b"aaa");
        assert!(shorter < longer);
    }

    #[test]
    fn interest_key_breaks_ties_lexicographically() {
        let a = interest_key(0, 0, b"aa");
        let b = interest_key(0, 0, b"ab");
        assert!(a < b);
    }
}
