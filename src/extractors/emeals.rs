use super::{first_text, list_items, select_outermost, LayoutStrategy, Lookup, ParsingContext, Region};
use scraper::ElementRef;

/// Layout of eMeals meal-plan recipe pages.
///
/// The main dish and its side share one page: both ingredient lists sit in
/// `.ingredients` blocks and are read together in page order.
pub struct EmealsLayout;

const TITLE: &[&str] = &[".mainTitle"];
const SUBTITLE: &[&str] = &[".sideTitle"];
const INGREDIENTS: &str = ".ingredients";
const STEPS: &str = ".instructions, .directions";
const SERVINGS: &[&str] = &[
    ".servings [itemprop='recipeYield']",
    "[itemprop='recipeYield']",
    ".servings",
];
const PREP_TIME: &[&str] = &[".times [itemprop='prepTime']"];
const COOK_TIME: &[&str] = &[".times [itemprop='cookTime']"];
const TOTAL_TIME: &[&str] = &[".times [itemprop='totalTime']"];
const IMAGE: &str = ".recipe_image img";

impl EmealsLayout {
    fn image(&self, root: ElementRef<'_>) -> Lookup {
        let images = select_outermost(root, IMAGE);
        if images.is_empty() {
            return Lookup::Missing;
        }
        let sources: Vec<String> = images
            .iter()
            .filter_map(|img| img.value().attr("src"))
            .map(str::to_string)
            .collect();
        if sources.is_empty() {
            Lookup::Unrecognized("recipe image has no src attribute".to_string())
        } else {
            Lookup::Found(sources)
        }
    }
}

impl LayoutStrategy for EmealsLayout {
    fn name(&self) -> &'static str {
        "emeals"
    }

    fn locate(&self, context: &ParsingContext, region: Region) -> Lookup {
        let root = context.document.root_element();
        match region {
            Region::Title => first_text(root, TITLE),
            Region::Subtitle => first_text(root, SUBTITLE),
            Region::Ingredients => list_items(&select_outermost(root, INGREDIENTS)),
            Region::Steps => list_items(&select_outermost(root, STEPS)),
            Region::Servings => first_text(root, SERVINGS),
            Region::PrepTime => first_text(root, PREP_TIME),
            Region::CookTime => first_text(root, COOK_TIME),
            Region::TotalTime => first_text(root, TOTAL_TIME),
            Region::Image => self.image(root),
        }
    }
}
