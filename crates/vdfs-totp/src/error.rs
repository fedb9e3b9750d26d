use thiserror::Error;

pub type TotpResult<T> = Result<T, TotpError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    /// The secret decodes to zero usable bytes; enrollment must not proceed.
    #[error("TOTP secret decodes to no usable bytes")]
    InvalidSecret,

    /// An enrollment transition was invoked from the wrong phase.
    #[error("two-factor operation not valid in phase '{0}'")]
    InvalidPhase(&'static str),
}
