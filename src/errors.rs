// Early-termination signals. These are plumbing, not a public error type:
// they short-circuit the draw call stack with `?` and are always caught at
// the per-candidate execution boundary in `engine::execute`.

use std::convert::Infallible;

/// Raised by a draw that can't be satisfied by the remaining buffer, or by
/// an explicit `mark_invalid` call. Propagated with `?` through arbitrarily
/// deep strategy code; the strategy author never has to check a status flag
/// after every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    Overrun,
    Invalid,
}

pub type DrawResult<T> = Result<T, Abort>;

/// Raised from inside a shrink pass once the shrink budget has been spent,
/// so the pass can unwind cleanly without finishing its sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExhausted;

pub type ShrinkResult<T> = Result<T, BudgetExhausted>;

/// The configuration surface is the one place a malformed input is a real,
/// reportable error rather than a programmer bug.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidInteger { var: &'static str, value: String },
    #[error("{var} must be \"true\" or \"false\", got {value:?}")]
    InvalidBool { var: &'static str, value: String },
}

/// A strategy author is required to call `mark_invalid` where Rust would
/// otherwise want a `!`; the type exists only so the signature can still
/// say "never produces a value" while flowing through `DrawResult`.
pub type Never = Infallible;
