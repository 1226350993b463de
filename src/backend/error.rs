use compiled_ir::{StatementId, StatementKind, TerminalId};

/// Malformed IR detected while emitting one function
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("{0} has no left hand side operand")]
    MissingLhs(StatementId),
    #[error("{statement} needs at least {expected} right hand side operands, found {found}")]
    MissingRhs {
        statement: StatementId,
        expected: usize,
        found: usize,
    },
    #[error("{0} has no associated property")]
    MissingProperty(TerminalId),
    #[error("{0} must be a class literal")]
    NotAClassLiteral(TerminalId),
    #[error("{1:?} {0} requires a dispatch loop but the function is emitted straight-line")]
    GotoWithoutDispatch(StatementId, StatementKind),
    #[error("{1:?} {0} cannot be used as an inline expression")]
    InvalidInline(StatementId, StatementKind),
    #[error("{0} has no target label")]
    MissingTarget(StatementId),
    #[error("{0} is not a call")]
    MissingCallee(StatementId),
    #[error("unknown {kind} `{name}`")]
    UnknownType { kind: &'static str, name: String },
    #[error("dangling {0}")]
    DanglingStatement(StatementId),
    #[error("dangling {0}")]
    DanglingTerminal(TerminalId),
    #[error("dangling property #{0}")]
    DanglingProperty(usize),
    #[error("dangling function #{0}")]
    DanglingFunction(usize),
    #[error("latent action info `{0}` has no linkage to patch")]
    LatentLinkage(String),
}

pub type Result<T, E = EmitError> = std::result::Result<T, E>;
