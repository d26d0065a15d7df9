/// Errors that can occur in the session layer.
///
/// User actions never fail loudly: an invalid action is a logged no-op.
/// These errors come from configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A history policy name other than `clear` or `preserve`.
    #[error("unknown history policy {0:?}: expected \"clear\" or \"preserve\"")]
    UnknownHistoryPolicy(String),
}
