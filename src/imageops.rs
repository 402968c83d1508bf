pub mod mask;
pub mod normalize;

pub use mask::apply_alpha_mask;
pub use normalize::{encode_png, normalize_to_rgba_png};
