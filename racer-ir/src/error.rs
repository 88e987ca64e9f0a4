use thiserror::Error;

use crate::name::Name;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The textual module failed to parse; the message carries the
    /// collected diagnostics.
    #[error("parse error in `{module}`:\n{detail}")]
    Parse { module: String, detail: String },

    #[error("unrecognized data layout string: `{0}`")]
    BadDataLayout(String),

    #[error("function `{function}` has no basic blocks")]
    EmptyFunction { function: String },

    #[error("block `{block}` of function `{function}` is empty or does not end with a terminator")]
    MissingTerminator { function: String, block: String },

    #[error("terminator in the middle of block `{block}` of function `{function}`")]
    TerminatorMidBlock { function: String, block: String },

    #[error("duplicate block label `{block}` in function `{function}`")]
    DuplicateLabel { function: String, block: String },

    #[error("branch to undefined label `{label}` in function `{function}`")]
    UndefinedLabel { function: String, label: String },

    /// Multiple operations with a shared destination violate SSA form.
    #[error("the name `%{duplicate}` is defined more than once in function `{function}`")]
    DuplicateSsaName { function: String, duplicate: Name },

    /// An operand refers to a name that was never defined.
    #[error("operand refers to undefined name `%{undefined}` in function `{function}`")]
    UndefinedSsaName { function: String, undefined: Name },
}
