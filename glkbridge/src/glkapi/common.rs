/*

Common things
=============

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use thiserror::Error;

/** Misuse of the Glk API. These are all fatal: the VM has no way to recover from them */
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GlkApiError {
    #[error("cannot close window stream")]
    CannotCloseWindowStream,
    #[error("the session has halted")]
    Halted,
    #[error("illegal filemode")]
    IllegalFilemode,
    #[error("invalid reference")]
    InvalidReference,
    #[error("invalid wintype")]
    InvalidWindowType,
    #[error("no event is being waited for")]
    NoPendingRequest,
    #[error("window has pending keyboard request")]
    PendingKeyboardRequest,
    #[error("cannot read from write-only stream")]
    ReadFromWriteOnly,
    #[error("a request is already outstanding")]
    RequestPending,
    #[error("splitwin must be null for first window")]
    SplitMustBeNull,
    #[error("cannot write to read-only stream")]
    WriteToReadOnly,
    #[error("wrong kind of pending request")]
    WrongPendingRequest,
}

pub type GlkResult<T> = Result<T, GlkApiError>;
