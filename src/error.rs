use thiserror::Error;

/// Error type for binding construction.
///
/// Returned from: [`Binding::bind_weak`](crate::Binding::bind_weak)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    /// The bind target was dropped before the binding could be constructed
    #[error("bind target has been dropped")]
    TargetGone,
}

/// Error type for relay propagation.
///
/// Never thrown across the notification boundary: the observed mutation has already
/// happened and cannot be rolled back, so relay failures are isolated per link and
/// reported through `tracing::warn!`. Delivery to sibling subscribers and links of
/// the same change event proceeds regardless.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropagationError {
    /// The destination binding's subject was dropped
    #[error("relay target has been dropped")]
    TargetGone,

    /// The destination accessor has no setter
    #[error("accessor `{0}` is read-only")]
    ReadOnly(&'static str),
}
