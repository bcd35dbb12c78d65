pub(crate) mod bitmap_font;
pub mod decode;
pub mod fonts;
pub mod media;
pub mod source;
