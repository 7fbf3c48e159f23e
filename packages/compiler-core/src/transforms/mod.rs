//! Built-in node transforms.

pub mod transform_element;
pub mod transform_for;
pub mod transform_if;
pub mod transform_text;

pub use transform_element::transform_element;
pub use transform_for::transform_for;
pub use transform_if::transform_if;
pub use transform_text::transform_text;
