// Given the current best TestData and a fresh one, decide whether the
// fresh one replaces it. This is the only place status transitions are
// judged; everything else just calls `should_accept`.

use crate::data::TestData;
use crate::status::{interest_key, Status};

pub fn should_accept(last: &TestData, candidate: &TestData) -> bool {
    if candidate.status() != last.status() {
        return candidate.status() > last.status();
    }
    match candidate.status() {
        // Prefer inputs that consumed more before rejecting: they teach us
        // more about where the real constraint is.
        Status::Invalid => candidate.index() >= last.index(),
        // Prefer overruns that are closer to actually fitting.
        Status::Overrun => candidate.index() <= last.index(),
        Status::Interesting => {
            assert!(
                candidate.buffer().len() <= last.buffer().len(),
                "shrink candidates must never grow the buffer"
            );
            let candidate_key = interest_key(
                candidate.cost(),
                candidate.intervals().len(),
                candidate.buffer(),
            );
            let last_key = interest_key(last.cost(), last.intervals().len(), last.buffer());
            candidate_key < last_key
        }
        // A fresh Valid example is kept simply as the most recent one.
        Status::Valid => true,
    }
}
