//! Error Types
//!
//! This module defines the error types used throughout the compositor.
//!
//! # Overview
//!
//! The main error type [`CompositorError`] covers all failure modes the
//! engine can hit during startup and steady-state operation: missing
//! extensions, a competing manager already owning the selection, and the
//! underlying X11 transport's own connection/reply errors.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, CompositorError>`.

use thiserror::Error;

/// The main error type for the compositing engine.
#[derive(Error, Debug)]
pub enum CompositorError {
    /// A required X11 extension is not present on the server.
    #[error("required X11 extension not available: {0}")]
    MissingExtension(&'static str),

    /// Another process already owns the `_NET_WM_CM_S<screen>` selection.
    #[error("another composite manager is already running ({0})")]
    AnotherManagerRunning(String),

    /// The manager selection could not be acquired for a reason other than
    /// an existing owner (e.g. the helper window could not be created).
    #[error("failed to acquire compositor manager selection: {0}")]
    SelectionAcquisitionFailed(String),

    /// Redirecting the root window's subwindows failed (e.g. a competing
    /// compositor raced us for `CompositeRedirectManual`).
    #[error("failed to redirect root subwindows: {0}")]
    RedirectFailed(String),

    /// Failed to open or negotiate the display connection itself.
    #[error("failed to open display connection: {0}")]
    ConnectFailed(String),

    /// Lower-level X11 connection error (I/O, parsing, protocol framing).
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    /// A request-reply round trip failed, either locally or with a
    /// server-side protocol error.
    #[error("X11 reply error: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    /// A request that also allocates an XID failed.
    #[error("X11 reply/id error: {0}")]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),

    /// Polling the display connection's file descriptor failed.
    #[error("I/O error polling display connection: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, CompositorError>`.
pub type Result<T> = std::result::Result<T, CompositorError>;
