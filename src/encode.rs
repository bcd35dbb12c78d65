//! Encoding sinks.
//!
//! Sinks consume normalized frames in display order.

/// Animated GIF sinks backed by `image`'s GIF encoder.
pub mod gif;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
