use serde::Serialize;

use crate::error::{ExtractError, ProcessError};
use crate::extractors::Region;

/// A recipe extracted from one page.
///
/// A `Recipe` always has a title, at least one ingredient and at least one
/// step. The only way to obtain one is [`RecipeBuilder::build`], which
/// rejects anything less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    title: String,
    subtitle: Option<String>,
    servings: Option<String>,
    prep_time: Option<String>,
    cook_time: Option<String>,
    total_time: Option<String>,
    image_url: Option<String>,
    ingredients: Vec<String>,
    steps: Vec<String>,
    source_url: String,
}

impl Recipe {
    pub fn builder(source_url: impl Into<String>) -> RecipeBuilder {
        RecipeBuilder {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Side dish served with the main recipe, if the page names one
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn servings(&self) -> Option<&str> {
        self.servings.as_deref()
    }

    pub fn prep_time(&self) -> Option<&str> {
        self.prep_time.as_deref()
    }

    pub fn cook_time(&self) -> Option<&str> {
        self.cook_time.as_deref()
    }

    pub fn total_time(&self) -> Option<&str> {
        self.total_time.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Ingredient lines in page order
    pub fn ingredients(&self) -> &[String] {
        &self.ingredients
    }

    /// Instructions in execution order
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Collects the pieces of a [`Recipe`] and validates them as a whole.
#[derive(Debug, Default, Clone)]
pub struct RecipeBuilder {
    source_url: String,
    title: Option<String>,
    subtitle: Option<String>,
    servings: Option<String>,
    prep_time: Option<String>,
    cook_time: Option<String>,
    total_time: Option<String>,
    image_url: Option<String>,
    ingredients: Vec<String>,
    steps: Vec<String>,
}

impl RecipeBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: Option<String>) -> Self {
        self.subtitle = subtitle;
        self
    }

    pub fn servings(mut self, servings: Option<String>) -> Self {
        self.servings = servings;
        self
    }

    pub fn prep_time(mut self, prep_time: Option<String>) -> Self {
        self.prep_time = prep_time;
        self
    }

    pub fn cook_time(mut self, cook_time: Option<String>) -> Self {
        self.cook_time = cook_time;
        self
    }

    pub fn total_time(mut self, total_time: Option<String>) -> Self {
        self.total_time = total_time;
        self
    }

    pub fn image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Normalizes every text field and checks the recipe is complete.
    ///
    /// Optional fields that normalize to nothing are dropped, as are blank
    /// list items. Fails if the title is blank or no ingredient or step
    /// survives.
    pub fn build(self) -> Result<Recipe, ExtractError> {
        let title = self
            .title
            .as_deref()
            .map(normalize_text)
            .ok_or(ExtractError::MissingRegion(Region::Title))?;
        if title.is_empty() {
            return Err(ExtractError::EmptyRegion(Region::Title));
        }

        let ingredients = normalize_list(self.ingredients);
        if ingredients.is_empty() {
            return Err(ExtractError::EmptyRegion(Region::Ingredients));
        }

        let steps = normalize_list(self.steps);
        if steps.is_empty() {
            return Err(ExtractError::EmptyRegion(Region::Steps));
        }

        Ok(Recipe {
            title,
            subtitle: normalize_optional(self.subtitle),
            servings: normalize_optional(self.servings),
            prep_time: normalize_optional(self.prep_time),
            cook_time: normalize_optional(self.cook_time),
            total_time: normalize_optional(self.total_time),
            image_url: normalize_optional(self.image_url),
            ingredients,
            steps,
            source_url: normalize_text(&self.source_url),
        })
    }
}

/// Trims the text and collapses every internal whitespace run to one space.
///
/// Control characters are removed; they carry no meaning in a recipe and
/// are not valid in the rendered document.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_optional(text: Option<String>) -> Option<String> {
    text.map(|t| normalize_text(&t)).filter(|t| !t.is_empty())
}

fn normalize_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|item| normalize_text(item))
        .filter(|item| !item.is_empty())
        .collect()
}

/// A URL that produced no recipe, and why
#[derive(Debug)]
pub struct Failure {
    /// Index of the URL in the batch input
    pub position: usize,
    pub url: String,
    pub error: ProcessError,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.url, self.error)
    }
}

/// One outcome of a batch, borrowed from a [`BatchResult`]
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Recipe(&'a Recipe),
    Failure(&'a Failure),
}

/// The result of processing one ordered list of URLs.
///
/// Every input URL appears exactly once, either as a recipe or as a
/// failure. Both sequences are kept in input order.
#[derive(Debug, Default)]
pub struct BatchResult {
    recipes: Vec<Recipe>,
    recipe_positions: Vec<usize>,
    failures: Vec<Failure>,
}

impl BatchResult {
    /// Flattens position-indexed outcomes into a result.
    ///
    /// `outcomes[i]` must be the outcome for `urls[i]`.
    pub(crate) fn from_outcomes(
        urls: &[String],
        outcomes: Vec<Result<Recipe, ProcessError>>,
    ) -> Self {
        debug_assert_eq!(urls.len(), outcomes.len(), "one outcome per URL");
        let mut result = BatchResult::default();
        for (position, (url, outcome)) in urls.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(recipe) => {
                    result.recipes.push(recipe);
                    result.recipe_positions.push(position);
                }
                Err(error) => result.failures.push(Failure {
                    position,
                    url: url.clone(),
                    error,
                }),
            }
        }
        result
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Number of URLs the batch covered
    pub fn len(&self) -> usize {
        self.recipes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recipes and failures merged back into input order
    pub fn outcomes(&self) -> Vec<Outcome<'_>> {
        let mut merged: Vec<(usize, Outcome<'_>)> = self
            .recipe_positions
            .iter()
            .copied()
            .zip(self.recipes.iter().map(Outcome::Recipe))
            .chain(
                self.failures
                    .iter()
                    .map(|failure| (failure.position, Outcome::Failure(failure))),
            )
            .collect();
        merged.sort_by_key(|(position, _)| *position);
        merged.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Consumes the result, keeping only the recipes
    pub fn into_recipes(self) -> Vec<Recipe> {
        self.recipes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn sample(url: &str) -> Recipe {
        Recipe::builder(url)
            .title("Toast")
            .ingredients(["1 slice bread"])
            .steps(["Toast the bread."])
            .build()
            .unwrap()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  2 cups \n\t flour  "), "2 cups flour");
        assert_eq!(normalize_text("\n \t"), "");
        assert_eq!(normalize_text("1/2 tsp. salt, divided"), "1/2 tsp. salt, divided");
        assert_eq!(normalize_text("1 cup\u{8}flour"), "1 cupflour");
        assert_eq!(normalize_text("2 \u{1b} eggs\u{7f}"), "2 eggs");
    }

    #[test]
    fn test_build_normalizes_and_keeps_order() {
        let recipe = Recipe::builder("https://example.com/r")
            .title("  Chicken\n  Tacos ")
            .subtitle(Some("   ".to_string()))
            .servings(Some(" 4 ".to_string()))
            .ingredients(["  1 lb chicken ", "", "2  tortillas", "  "])
            .steps(["Cook.", "Assemble."])
            .build()
            .unwrap();

        assert_eq!(recipe.title(), "Chicken Tacos");
        assert_eq!(recipe.subtitle(), None);
        assert_eq!(recipe.servings(), Some("4"));
        assert_eq!(recipe.ingredients(), ["1 lb chicken", "2 tortillas"]);
        assert_eq!(recipe.steps(), ["Cook.", "Assemble."]);
    }

    #[test]
    fn test_build_rejects_incomplete_recipes() {
        let missing_title = Recipe::builder("u")
            .ingredients(["a"])
            .steps(["b"])
            .build();
        assert_eq!(
            missing_title,
            Err(ExtractError::MissingRegion(Region::Title))
        );

        let blank_title = Recipe::builder("u")
            .title(" ")
            .ingredients(["a"])
            .steps(["b"])
            .build();
        assert_eq!(blank_title, Err(ExtractError::EmptyRegion(Region::Title)));

        let no_ingredients = Recipe::builder("u")
            .title("t")
            .ingredients(["  "])
            .steps(["b"])
            .build();
        assert_eq!(
            no_ingredients,
            Err(ExtractError::EmptyRegion(Region::Ingredients))
        );

        let no_steps = Recipe::builder("u").title("t").ingredients(["a"]).build();
        assert_eq!(no_steps, Err(ExtractError::EmptyRegion(Region::Steps)));
    }

    #[test]
    fn test_batch_result_partitions_by_position() {
        let urls: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let outcomes = vec![
            Ok(sample("a")),
            Err(ProcessError::RunTimedOut),
            Err(ProcessError::Fetch(FetchError::InvalidUrl("c".to_string()))),
            Ok(sample("d")),
        ];

        let result = BatchResult::from_outcomes(&urls, outcomes);
        assert_eq!(result.len(), 4);
        assert_eq!(result.recipes().len(), 2);
        assert_eq!(result.failures().len(), 2);
        assert_eq!(result.failures()[0].position, 1);
        assert_eq!(result.failures()[1].url, "c");

        let order: Vec<String> = result
            .outcomes()
            .into_iter()
            .map(|outcome| match outcome {
                Outcome::Recipe(recipe) => recipe.source_url().to_string(),
                Outcome::Failure(failure) => failure.url.clone(),
            })
            .collect();
        assert_eq!(order, urls);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "one outcome per URL")]
    fn test_outcome_count_must_match_urls() {
        let urls = vec!["https://example.com/a".to_string()];
        BatchResult::from_outcomes(&urls, Vec::new());
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure {
            position: 0,
            url: "https://bad".to_string(),
            error: ProcessError::RunTimedOut,
        };
        assert_eq!(
            failure.to_string(),
            "https://bad: batch run timed out before this URL finished"
        );
    }
}
