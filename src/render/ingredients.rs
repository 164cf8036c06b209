use crate::model::Recipe;

/// Every ingredient line of every recipe, one per line.
///
/// Lines keep recipe order, then page order within a recipe. Duplicates
/// across recipes are kept as-is; consolidating a grocery list is left to
/// whoever reads this file.
pub fn render_ingredient_list(recipes: &[Recipe]) -> String {
    let mut out = String::new();
    for ingredient in recipes.iter().flat_map(|r| r.ingredients()) {
        out.push_str(ingredient);
        out.push('\n');
    }
    out
}
