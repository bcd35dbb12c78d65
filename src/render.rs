/// Coverage masks and clipped blending.
pub mod mask;
pub(crate) mod outline;
/// Caption stamping.
pub mod text;
