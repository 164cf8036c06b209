//! Output artifacts built from an ordered batch of recipes.
//!
//! Both renderers are pure: same recipes in, same bytes out.

mod ingredients;
mod latex;

pub use ingredients::render_ingredient_list;
pub use latex::{escape_latex, image_file_name, unescape_latex, LatexRenderer};
