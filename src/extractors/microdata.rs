use super::{
    convert_duration, element_text, list_items, select_outermost, LayoutStrategy, Lookup,
    ParsingContext, Region,
};
use crate::model::normalize_text;
use scraper::{ElementRef, Selector};

/// Reads schema.org Recipe microdata (`itemscope` / `itemprop`)
pub struct MicroDataLayout;

impl MicroDataLayout {
    // Lookups stay inside the Recipe item: global `itemprop` searches pick up
    // site titles, author bios and ads.
    fn find_recipe_container<'a>(&self, context: &'a ParsingContext) -> Option<ElementRef<'a>> {
        let selector = Selector::parse("[itemscope][itemtype]").ok()?;
        context.document.select(&selector).find(|element| {
            element.value().attr("itemtype").is_some_and(|itemtype| {
                itemtype.contains("schema.org/Recipe")
                    || itemtype.contains("data-vocabulary.org/Recipe")
            })
        })
    }

    /// Elements carrying `prop` that belong to the Recipe item itself.
    ///
    /// A property inside a nested `itemscope` (author, nutrition, review)
    /// describes that item, not the recipe.
    fn props<'a>(&self, container: ElementRef<'a>, prop: &str) -> Vec<ElementRef<'a>> {
        select_outermost(container, &format!("[itemprop='{prop}']"))
            .into_iter()
            .filter(|element| {
                !element
                    .ancestors()
                    .take_while(|ancestor| ancestor.id() != container.id())
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| ancestor.value().attr("itemscope").is_some())
            })
            .collect()
    }

    fn text(&self, container: ElementRef<'_>, prop: &str) -> Lookup {
        let elements = self.props(container, prop);
        if elements.is_empty() {
            return Lookup::Missing;
        }
        let text = elements
            .into_iter()
            .map(|element| normalize_text(&element_text(element)))
            .find(|text| !text.is_empty());
        Lookup::Found(text.into_iter().collect())
    }

    /// Every element carrying one of the properties, in document order
    fn items(&self, container: ElementRef<'_>, props: &[&str]) -> Lookup {
        for prop in props {
            let elements = self.props(container, prop);
            if elements.is_empty() {
                continue;
            }
            // One wrapper holding a whole list, rather than one itemprop per line
            if elements.len() == 1 {
                if let Lookup::Found(items) = list_items(&elements) {
                    if !items.is_empty() {
                        return Lookup::Found(items);
                    }
                }
            }
            return Lookup::Found(elements.into_iter().map(element_text).collect());
        }
        Lookup::Missing
    }

    /// Durations are usually machine-readable in `content`, human in text
    fn duration(&self, container: ElementRef<'_>, prop: &str) -> Lookup {
        let Some(element) = self.props(container, prop).into_iter().next() else {
            return Lookup::Missing;
        };
        match element
            .value()
            .attr("content")
            .or_else(|| element.value().attr("datetime"))
        {
            Some(iso) => Lookup::Found(vec![convert_duration(iso)]),
            None => Lookup::Found(vec![element_text(element)]),
        }
    }

    fn image(&self, container: ElementRef<'_>) -> Lookup {
        let Some(element) = self.props(container, "image").into_iter().next() else {
            return Lookup::Missing;
        };
        let value = element.value();
        match value
            .attr("src")
            .or_else(|| value.attr("content"))
            .or_else(|| value.attr("href"))
        {
            Some(url) => Lookup::Found(vec![url.to_string()]),
            None => Lookup::Found(vec![element_text(element)]),
        }
    }
}

impl LayoutStrategy for MicroDataLayout {
    fn name(&self) -> &'static str {
        "microdata"
    }

    fn locate(&self, context: &ParsingContext, region: Region) -> Lookup {
        let Some(container) = self.find_recipe_container(context) else {
            return Lookup::Missing;
        };

        match region {
            Region::Title => self.text(container, "name"),
            Region::Subtitle => self.text(container, "alternativeHeadline"),
            Region::Ingredients => self.items(container, &["recipeIngredient", "ingredients"]),
            Region::Steps => self.items(container, &["recipeInstructions", "instructions"]),
            Region::Servings => self.text(container, "recipeYield"),
            Region::PrepTime => self.duration(container, "prepTime"),
            Region::CookTime => self.duration(container, "cookTime"),
            Region::TotalTime => self.duration(container, "totalTime"),
            Region::Image => self.image(container),
        }
    }
}
