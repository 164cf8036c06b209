//! Page layouts and the extractor that turns a page into a [`Recipe`].
//!
//! A [`LayoutStrategy`] knows how one family of pages marks up the parts of
//! a recipe. The [`RecipeExtractor`] asks each configured strategy for the
//! regions it needs and keeps the first complete answer. Supporting a new
//! site, or a site whose markup changed, means touching one strategy.

use std::cell::OnceCell;
use std::fmt;

use log::debug;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::{ExtractError, MealprintError};
use crate::model::{normalize_text, Recipe};

mod emeals;
mod html_class;
mod json_ld;
mod microdata;

pub use emeals::EmealsLayout;
pub use html_class::HtmlClassLayout;
pub use json_ld::{convert_duration, JsonLdLayout};
pub use microdata::MicroDataLayout;

/// Strategy names in the order they are tried when none are configured
pub const DEFAULT_STRATEGIES: [&str; 4] = ["emeals", "json_ld", "microdata", "html_class"];

/// A structural part of a recipe page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Title,
    Subtitle,
    Ingredients,
    Steps,
    Servings,
    PrepTime,
    CookTime,
    TotalTime,
    Image,
}

impl Region {
    pub fn label(&self) -> &'static str {
        match self {
            Region::Title => "title",
            Region::Subtitle => "subtitle",
            Region::Ingredients => "ingredients",
            Region::Steps => "steps",
            Region::Servings => "servings",
            Region::PrepTime => "prep time",
            Region::CookTime => "cook time",
            Region::TotalTime => "total time",
            Region::Image => "image",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a strategy found when asked for a region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The page has no such region
    Missing,
    /// Raw texts of the region, in document order
    Found(Vec<String>),
    /// The region exists but its shape matches none of the known variants
    Unrecognized(String),
}

pub struct ParsingContext {
    pub url: String,
    pub document: Html,
    json_ld: OnceCell<Option<Value>>,
}

impl ParsingContext {
    pub fn new(url: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            document: Html::parse_document(html),
            json_ld: OnceCell::new(),
        }
    }

    /// The schema.org Recipe node embedded as JSON-LD, parsed on first use
    pub fn json_ld_recipe(&self) -> Option<&Value> {
        self.json_ld
            .get_or_init(|| json_ld::find_recipe_node(&self.document))
            .as_ref()
    }
}

/// Locates recipe regions for one family of page layouts
pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn locate(&self, context: &ParsingContext, region: Region) -> Lookup;
}

/// Builds a strategy from its configuration name
pub fn strategy_by_name(name: &str) -> Option<Box<dyn LayoutStrategy>> {
    match name {
        "emeals" => Some(Box::new(EmealsLayout)),
        "json_ld" => Some(Box::new(JsonLdLayout)),
        "microdata" => Some(Box::new(MicroDataLayout)),
        "html_class" => Some(Box::new(HtmlClassLayout::new())),
        _ => None,
    }
}

pub struct RecipeExtractor {
    strategies: Vec<Box<dyn LayoutStrategy>>,
}

impl Default for RecipeExtractor {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_STRATEGIES
                .iter()
                .filter_map(|name| strategy_by_name(name))
                .collect(),
        }
    }
}

impl RecipeExtractor {
    pub fn new(strategies: Vec<Box<dyn LayoutStrategy>>) -> Self {
        Self { strategies }
    }

    /// Builds an extractor trying the named strategies in the given order
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, MealprintError> {
        if names.is_empty() {
            return Err(MealprintError::Builder(
                "at least one layout strategy must be configured".to_string(),
            ));
        }

        let strategies = names
            .iter()
            .map(|name| {
                strategy_by_name(name.as_ref())
                    .ok_or_else(|| ExtractError::UnknownStrategy(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { strategies })
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Parses a page body and extracts its recipe
    pub fn extract(&self, url: &str, html: &str) -> Result<Recipe, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::EmptyPage);
        }
        let context = ParsingContext::new(url, html);
        self.extract_from(&context)
    }

    pub fn extract_from(&self, context: &ParsingContext) -> Result<Recipe, ExtractError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match extract_with(strategy.as_ref(), context) {
                Ok(recipe) => {
                    debug!(
                        "Extracted '{}' from {} using {} layout ({} ingredients, {} steps)",
                        recipe.title(),
                        context.url,
                        strategy.name(),
                        recipe.ingredients().len(),
                        recipe.steps().len()
                    );
                    return Ok(recipe);
                }
                Err(e) => {
                    debug!("{} layout rejected {}: {}", strategy.name(), context.url, e);
                    attempts.push((strategy.name().to_string(), e));
                }
            }
        }

        if attempts.len() == 1 {
            let (_, error) = attempts.remove(0);
            Err(error)
        } else {
            Err(ExtractError::NoLayoutMatched(attempts))
        }
    }
}

/// Extracts a full recipe with a single strategy, never mixing layouts
fn extract_with(
    strategy: &dyn LayoutStrategy,
    context: &ParsingContext,
) -> Result<Recipe, ExtractError> {
    let title = required(strategy, context, Region::Title)?;
    let ingredients = required(strategy, context, Region::Ingredients)?;
    let steps = required(strategy, context, Region::Steps)?;

    Recipe::builder(context.url.clone())
        .title(title.join(" "))
        .subtitle(optional(strategy, context, Region::Subtitle))
        .servings(optional(strategy, context, Region::Servings))
        .prep_time(optional(strategy, context, Region::PrepTime))
        .cook_time(optional(strategy, context, Region::CookTime))
        .total_time(optional(strategy, context, Region::TotalTime))
        .image_url(optional(strategy, context, Region::Image))
        .ingredients(ingredients)
        .steps(steps)
        .build()
}

fn required(
    strategy: &dyn LayoutStrategy,
    context: &ParsingContext,
    region: Region,
) -> Result<Vec<String>, ExtractError> {
    match strategy.locate(context, region) {
        Lookup::Missing => Err(ExtractError::MissingRegion(region)),
        Lookup::Unrecognized(detail) => Err(ExtractError::UnrecognizedMarkup { region, detail }),
        Lookup::Found(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| normalize_text(item))
                .filter(|item| !item.is_empty())
                .collect();
            if items.is_empty() {
                return Err(ExtractError::EmptyRegion(region));
            }
            // A title is a single heading; later matches are page chrome.
            if region == Region::Title {
                return Ok(items.into_iter().take(1).collect());
            }
            Ok(items)
        }
    }
}

fn optional(strategy: &dyn LayoutStrategy, context: &ParsingContext, region: Region) -> Option<String> {
    match strategy.locate(context, region) {
        Lookup::Found(items) => items
            .iter()
            .map(|item| normalize_text(item))
            .find(|item| !item.is_empty()),
        Lookup::Unrecognized(detail) => {
            debug!("Ignoring unrecognized {} markup: {}", region, detail);
            None
        }
        Lookup::Missing => None,
    }
}

/// All elements under `root` matching `css`, in document order.
///
/// Containers nested inside an already matched container are skipped so a
/// region is never read twice.
pub(crate) fn select_outermost<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(css) else {
        debug!("Invalid selector: {}", css);
        return Vec::new();
    };

    let mut chosen: Vec<ElementRef<'a>> = Vec::new();
    for element in root.select(&selector) {
        let nested = element
            .ancestors()
            .any(|ancestor| chosen.iter().any(|c| c.id() == ancestor.id()));
        if !nested {
            chosen.push(element);
        }
    }
    chosen
}

/// Raw text of an element. Inline markup splits text into several nodes, so
/// they are joined as-is and whitespace is left to [`normalize_text`].
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Text of the first element matching any of `selectors`, tried in order
pub(crate) fn first_text(root: ElementRef<'_>, selectors: &[&str]) -> Lookup {
    let mut seen_empty = false;
    for css in selectors {
        for element in select_outermost(root, css) {
            let text = normalize_text(&element_text(element));
            if !text.is_empty() {
                return Lookup::Found(vec![text]);
            }
            seen_empty = true;
        }
    }
    if seen_empty {
        Lookup::Found(Vec::new())
    } else {
        Lookup::Missing
    }
}

/// List items of the region containers, in document order.
///
/// Only innermost `li` elements are read; an item that wraps a nested list
/// is a group heading. A container with text but no list items is a shape
/// this reader does not understand.
pub(crate) fn list_items(containers: &[ElementRef<'_>]) -> Lookup {
    if containers.is_empty() {
        return Lookup::Missing;
    }

    let Ok(li) = Selector::parse("li") else {
        return Lookup::Missing;
    };

    let items: Vec<String> = containers
        .iter()
        .flat_map(|container| container.select(&li))
        .filter(|item| item.select(&li).next().is_none())
        .map(element_text)
        .collect();

    if items.is_empty() {
        let has_text = containers
            .iter()
            .any(|container| !normalize_text(&element_text(*container)).is_empty());
        if has_text {
            return Lookup::Unrecognized("region has text but no list items".to_string());
        }
    }

    Lookup::Found(items)
}
