//! Connection log verbosity.

/// Log verbosity for a connection.
///
/// Gates emission of `tracing` events only; it never alters control flow.
/// Levels are ordered: a connection at `Warning` also emits `Fatal` and
/// `Error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Emit nothing.
    #[default]
    Nothing,
    /// Unrecoverable failures only.
    Fatal,
    /// Server and client errors.
    Error,
    /// Notices and warnings from the server.
    Warning,
    /// Every SQL command sent.
    Command,
    /// Protocol-level diagnostics.
    Debug,
    /// Everything, including skipped messages.
    Verbose,
}
