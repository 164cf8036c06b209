use super::{
    element_text, first_text, list_items, select_outermost, LayoutStrategy, Lookup,
    ParsingContext, Region,
};
use crate::model::normalize_text;
use log::debug;
use scraper::ElementRef;
use std::collections::HashMap;

/// Falls back on the class names used by common recipe-card plugins
/// (WP Recipe Maker, Tasty Recipes, Mediavine Create, WPZoom, ...).
pub struct HtmlClassLayout {
    exact: HashMap<Region, Vec<&'static str>>,
    fuzzy: HashMap<Region, Vec<&'static str>>,
}

// Fuzzy matches longer than this are most likely the whole page
const MAX_FUZZY_TEXT: usize = 5000;

impl Default for HtmlClassLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlClassLayout {
    pub fn new() -> Self {
        let mut exact = HashMap::new();
        let mut fuzzy = HashMap::new();

        exact.insert(
            Region::Title,
            vec![
                "wprm-recipe-name",
                "tasty-recipes-title",
                "mv-create-title",
                "recipe-name",
                "recipe-title",
                "recipe-card-title",
                "wpzoom-recipe-card-title",
                "recipe-card__title",
                "wpupg-recipe-name",
            ],
        );

        exact.insert(
            Region::Ingredients,
            vec![
                "wprm-recipe-ingredients-container",
                "tasty-recipes-ingredients",
                "mv-create-ingredients",
                "recipe-ingredients",
                "recipe-ingredient-list",
                "recipe-card-ingredients",
                "wpzoom-recipe-ingredients",
                "structured-ingredients",
                "mpprecipe-ingredients",
                "recipe_ingredients",
            ],
        );

        exact.insert(
            Region::Steps,
            vec![
                "wprm-recipe-instructions-container",
                "tasty-recipes-instructions",
                "mv-create-instructions",
                "recipe-instructions",
                "recipe-instruction-list",
                "recipe-card-instructions",
                "wpzoom-recipe-instructions",
                "structured-instructions",
                "mpprecipe-instructions",
                "recipe_instructions",
                "recipe-directions",
            ],
        );

        exact.insert(
            Region::PrepTime,
            vec![
                "wprm-recipe-prep_time-container",
                "wprm-recipe-prep-time",
                "tasty-recipes-prep-time",
                "mv-create-time-prep",
                "recipe-prep-time",
                "prep-time",
            ],
        );

        exact.insert(
            Region::CookTime,
            vec![
                "wprm-recipe-cook_time-container",
                "wprm-recipe-cook-time",
                "tasty-recipes-cook-time",
                "mv-create-time-active",
                "recipe-cook-time",
                "cook-time",
            ],
        );

        exact.insert(
            Region::TotalTime,
            vec![
                "wprm-recipe-total_time-container",
                "wprm-recipe-total-time",
                "tasty-recipes-total-time",
                "mv-create-time-total",
                "recipe-total-time",
                "total-time",
            ],
        );

        exact.insert(
            Region::Servings,
            vec![
                "wprm-recipe-servings",
                "tasty-recipes-yield",
                "mv-create-yield",
                "recipe-yield",
                "recipe-servings",
                "recipe-card-servings",
            ],
        );

        fuzzy.insert(Region::Title, vec!["recipe-title", "recipe-name"]);
        fuzzy.insert(Region::Ingredients, vec!["ingredient"]);
        fuzzy.insert(Region::Steps, vec!["instruction", "direction", "recipe-method"]);

        HtmlClassLayout { exact, fuzzy }
    }

    fn text(&self, root: ElementRef<'_>, region: Region) -> Lookup {
        if let Some(classes) = self.exact.get(&region) {
            let selectors: Vec<String> = classes.iter().map(|c| format!(".{c}")).collect();
            let selectors: Vec<&str> = selectors.iter().map(String::as_str).collect();
            if let Lookup::Found(items) = first_text(root, &selectors) {
                if !items.is_empty() {
                    return Lookup::Found(items);
                }
            }
        }

        if let Some(patterns) = self.fuzzy.get(&region) {
            for pattern in patterns {
                for element in select_outermost(root, &format!("[class*='{pattern}']")) {
                    let text = normalize_text(&element_text(element));
                    if !text.is_empty() && text.len() < MAX_FUZZY_TEXT {
                        debug!("Found {} using fuzzy class pattern: {}", region, pattern);
                        return Lookup::Found(vec![text]);
                    }
                }
            }
        }

        Lookup::Missing
    }

    fn list(&self, root: ElementRef<'_>, region: Region) -> Lookup {
        let exact = self
            .exact
            .get(&region)
            .into_iter()
            .flatten()
            .map(|class| format!(".{class}"));
        let fuzzy = self
            .fuzzy
            .get(&region)
            .into_iter()
            .flatten()
            .map(|pattern| format!("[class*='{pattern}']"));

        let mut first_problem = None;
        for css in exact.chain(fuzzy) {
            match list_items(&select_outermost(root, &css)) {
                Lookup::Found(items) if !items.is_empty() => {
                    debug!("Found {} {} using {}", items.len(), region, css);
                    return Lookup::Found(items);
                }
                Lookup::Missing => {}
                other => {
                    first_problem.get_or_insert(other);
                }
            }
        }

        first_problem.unwrap_or(Lookup::Missing)
    }
}

impl LayoutStrategy for HtmlClassLayout {
    fn name(&self) -> &'static str {
        "html_class"
    }

    fn locate(&self, context: &ParsingContext, region: Region) -> Lookup {
        let root = context.document.root_element();
        match region {
            Region::Title => match self.text(root, region) {
                // The page's primary heading
                Lookup::Missing => first_text(root, &["h1"]),
                found => found,
            },
            Region::Ingredients | Region::Steps => self.list(root, region),
            Region::Subtitle | Region::Image => Lookup::Missing,
            Region::Servings | Region::PrepTime | Region::CookTime | Region::TotalTime => {
                self.text(root, region)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_falls_back_to_h1() {
        let context = ParsingContext::new(
            "https://example.com",
            "<html><body><h1> Plain   Heading </h1></body></html>",
        );
        assert_eq!(
            HtmlClassLayout::new().locate(&context, Region::Title),
            Lookup::Found(vec!["Plain Heading".to_string()])
        );
    }

    #[test]
    fn test_fuzzy_ingredient_container() {
        let context = ParsingContext::new(
            "https://example.com",
            r#"<section class="my-ingredients-box"><ul><li>1 onion</li><li>2 carrots</li></ul></section>"#,
        );
        assert_eq!(
            HtmlClassLayout::new().locate(&context, Region::Ingredients),
            Lookup::Found(vec!["1 onion".to_string(), "2 carrots".to_string()])
        );
    }

    #[test]
    fn test_container_without_list_is_unrecognized() {
        let context = ParsingContext::new(
            "https://example.com",
            r#"<div class="recipe-ingredients"><table><tr><td>1 onion</td></tr></table></div>"#,
        );
        assert!(matches!(
            HtmlClassLayout::new().locate(&context, Region::Ingredients),
            Lookup::Unrecognized(_)
        ));
    }

    #[test]
    fn test_fuzzy_steps_ignore_unrelated_method_classes() {
        let context = ParsingContext::new(
            "https://example.com",
            r#"
            <div class="payment-method"><ul><li>Visa</li><li>PayPal</li></ul></div>
            <div class="recipe-method-box"><ol><li>Chop.</li><li>Simmer.</li></ol></div>
            "#,
        );
        assert_eq!(
            HtmlClassLayout::new().locate(&context, Region::Steps),
            Lookup::Found(vec!["Chop.".to_string(), "Simmer.".to_string()])
        );
    }
}
