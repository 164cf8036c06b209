use super::{LayoutStrategy, Lookup, ParsingContext, Region};
use html_escape::decode_html_entities;
use log::debug;
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Reads the schema.org Recipe that many sites embed as JSON-LD
pub struct JsonLdLayout;

impl LayoutStrategy for JsonLdLayout {
    fn name(&self) -> &'static str {
        "json_ld"
    }

    fn locate(&self, context: &ParsingContext, region: Region) -> Lookup {
        let Some(recipe) = context.json_ld_recipe() else {
            return Lookup::Missing;
        };

        match region {
            Region::Title => text_field(recipe, "name"),
            Region::Subtitle => text_field(recipe, "alternativeHeadline"),
            Region::Ingredients => ingredients(recipe),
            Region::Steps => instructions(recipe),
            Region::Servings => servings(recipe),
            Region::PrepTime => duration_field(recipe, "prepTime"),
            Region::CookTime => duration_field(recipe, "cookTime"),
            Region::TotalTime => duration_field(recipe, "totalTime"),
            Region::Image => image(recipe),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeIngredients {
    Single(String),
    Strings(Vec<String>),
    Objects(Vec<IngredientObject>),
}

#[derive(Debug, Deserialize)]
struct IngredientObject {
    name: String,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    Text(String),
    List(Vec<InstructionItem>),
}

// Section must precede Step: a step's fields are all optional, so any
// object would match it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstructionItem {
    Text(String),
    Section {
        #[serde(rename = "itemListElement")]
        item_list_element: Vec<InstructionItem>,
    },
    Step {
        text: Option<String>,
        name: Option<String>,
    },
    Nested(Vec<InstructionItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeYield {
    String(String),
    Number(f64),
    Array(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageType {
    String(String),
    Object(ImageObject),
    MultipleStrings(Vec<String>),
    MultipleObjects(Vec<ImageObject>),
}

/// Deserializes one property, telling "absent" apart from "unexpected shape"
fn field<T: DeserializeOwned>(recipe: &Value, key: &str) -> Result<Option<T>, String> {
    match recipe.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| format!("unexpected {key} shape: {e}")),
    }
}

fn text_field(recipe: &Value, key: &str) -> Lookup {
    match field::<String>(recipe, key) {
        Ok(Some(text)) => Lookup::Found(vec![decode_html_symbols(&text)]),
        Ok(None) => Lookup::Missing,
        Err(detail) => Lookup::Unrecognized(detail),
    }
}

fn duration_field(recipe: &Value, key: &str) -> Lookup {
    match field::<String>(recipe, key) {
        Ok(Some(text)) => Lookup::Found(vec![convert_duration(&text)]),
        Ok(None) => Lookup::Missing,
        Err(detail) => Lookup::Unrecognized(detail),
    }
}

fn ingredients(recipe: &Value) -> Lookup {
    let key = if recipe.get("recipeIngredient").is_some() {
        "recipeIngredient"
    } else {
        "ingredients"
    };

    match field::<RecipeIngredients>(recipe, key) {
        Ok(Some(RecipeIngredients::Single(line))) => {
            Lookup::Found(vec![decode_html_symbols(&line)])
        }
        Ok(Some(RecipeIngredients::Strings(lines))) => {
            Lookup::Found(lines.iter().map(|l| decode_html_symbols(l)).collect())
        }
        Ok(Some(RecipeIngredients::Objects(objects))) => Lookup::Found(
            objects
                .into_iter()
                .map(|ing| {
                    let amount = ing.amount.as_deref().unwrap_or("").trim();
                    let name = decode_html_symbols(&ing.name);
                    if amount.is_empty() {
                        name
                    } else {
                        format!("{amount} {name}")
                    }
                })
                .collect(),
        ),
        Ok(None) => Lookup::Missing,
        Err(detail) => Lookup::Unrecognized(detail),
    }
}

fn instructions(recipe: &Value) -> Lookup {
    match field::<RecipeInstructions>(recipe, "recipeInstructions") {
        // A single block of text: one step per line
        Ok(Some(RecipeInstructions::Text(text))) => Lookup::Found(
            decode_html_symbols(&text)
                .lines()
                .map(str::to_string)
                .collect(),
        ),
        Ok(Some(RecipeInstructions::List(items))) => {
            let mut steps = Vec::new();
            flatten_steps(items, &mut steps);
            Lookup::Found(steps)
        }
        Ok(None) => Lookup::Missing,
        Err(detail) => Lookup::Unrecognized(detail),
    }
}

fn flatten_steps(items: Vec<InstructionItem>, steps: &mut Vec<String>) {
    for item in items {
        match item {
            InstructionItem::Text(text) => steps.push(decode_html_symbols(&text)),
            InstructionItem::Step { text, name } => {
                // Prefer text over name
                if let Some(text) = text.or(name) {
                    steps.push(decode_html_symbols(&text));
                }
            }
            InstructionItem::Section {
                item_list_element, ..
            } => flatten_steps(item_list_element, steps),
            InstructionItem::Nested(items) => flatten_steps(items, steps),
        }
    }
}

fn servings(recipe: &Value) -> Lookup {
    let yield_str = match field::<RecipeYield>(recipe, "recipeYield") {
        Ok(Some(RecipeYield::String(s))) => s,
        Ok(Some(RecipeYield::Number(n))) => n.to_string(),
        Ok(Some(RecipeYield::Array(values))) => {
            let texts: Vec<String> = values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            // Prefer the descriptive entry ("4 servings") over the bare number
            texts
                .iter()
                .find(|s| s.contains(char::is_alphabetic))
                .or_else(|| texts.first())
                .cloned()
                .unwrap_or_default()
        }
        Ok(None) => return Lookup::Missing,
        Err(detail) => return Lookup::Unrecognized(detail),
    };
    Lookup::Found(vec![yield_str])
}

fn image(recipe: &Value) -> Lookup {
    let urls = match field::<ImageType>(recipe, "image") {
        Ok(Some(ImageType::String(url))) => vec![url],
        Ok(Some(ImageType::Object(obj))) => vec![obj.url],
        Ok(Some(ImageType::MultipleStrings(urls))) => urls,
        Ok(Some(ImageType::MultipleObjects(objs))) => objs.into_iter().map(|o| o.url).collect(),
        Ok(None) => return Lookup::Missing,
        Err(detail) => return Lookup::Unrecognized(detail),
    };
    Lookup::Found(urls.iter().map(|u| decode_html_symbols(u)).collect())
}

fn decode_html_symbols(text: &str) -> String {
    // Some sites double-encode entities (&amp;amp;)
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

/// Searches a JSON-LD value for a Recipe, including `@graph` and arrays
fn find_recipe_in_json(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if is_recipe_type(json) {
                return Some(json);
            }
            obj.values().find_map(find_recipe_in_json)
        }
        Value::Array(items) => items.iter().find_map(find_recipe_in_json),
        _ => None,
    }
}

/// Finds the first Recipe node across every JSON-LD script on the page
pub(crate) fn find_recipe_node(document: &Html) -> Option<Value> {
    let Ok(selector) = Selector::parse("script[type='application/ld+json']") else {
        return None;
    };

    for (index, script) in document.select(&selector).enumerate() {
        let raw_json = script.inner_html();
        let json = match serde_json::from_str::<Value>(&raw_json) {
            Ok(json) => json,
            Err(e) => {
                debug!("JSON-LD script {} is not valid JSON ({}), repairing", index, e);
                match serde_json::from_str::<Value>(&sanitize_json(&raw_json)) {
                    Ok(json) => json,
                    Err(e) => {
                        debug!("JSON-LD script {} could not be repaired: {}", index, e);
                        continue;
                    }
                }
            }
        };

        if let Some(recipe) = find_recipe_in_json(&json) {
            debug!("Found Recipe node in JSON-LD script {}", index);
            return Some(recipe.clone());
        }
    }

    None
}

/// Repairs the two breakages seen most in the wild: raw line breaks inside
/// strings and trailing commas before a closing bracket.
fn sanitize_json(json_str: &str) -> String {
    let mut cleaned = String::with_capacity(json_str.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json_str.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                '\n' | '\r' | '\t' => {
                    cleaned.push(' ');
                    continue;
                }
                _ => {}
            }
            cleaned.push(c);
            continue;
        }

        match c {
            '"' => in_string = true,
            ']' | '}' => {
                let trimmed_len = cleaned.trim_end().len();
                if cleaned[..trimmed_len].ends_with(',') {
                    cleaned.truncate(trimmed_len - 1);
                }
            }
            _ => {}
        }
        cleaned.push(c);
    }

    cleaned
}

/// Converts an ISO 8601 duration to readable text.
///
/// `PT1H30M` and `PT90M` both become "1 hour 30 minutes", `PT15-20M`
/// becomes "15-20 minutes", `PT5400.0S` is rounded to whole minutes. Input
/// that is not a duration is returned unchanged.
pub fn convert_duration(duration: &str) -> String {
    let original = duration.trim();
    let Some(rest) = original.strip_prefix('P') else {
        return original.to_string();
    };
    let (date_part, time_part) = rest.split_once('T').unwrap_or((rest, ""));

    let mut total_minutes = 0.0_f64;
    let mut minute_range = None;
    let mut parsed_any = false;

    if !date_part.is_empty() {
        let Some(days) = date_part
            .strip_suffix('D')
            .and_then(|d| d.parse::<f64>().ok())
        else {
            return original.to_string();
        };
        total_minutes += days * 24.0 * 60.0;
        parsed_any = true;
    }

    let mut number = String::new();
    for c in time_part.chars() {
        match c {
            'H' | 'M' | 'S' => {
                if c == 'M' && number.contains('-') {
                    minute_range = Some(std::mem::take(&mut number));
                    parsed_any = true;
                    continue;
                }
                let Ok(value) = number.parse::<f64>() else {
                    return original.to_string();
                };
                total_minutes += match c {
                    'H' => value * 60.0,
                    'M' => value,
                    _ => value / 60.0,
                };
                number.clear();
                parsed_any = true;
            }
            _ => number.push(c),
        }
    }

    if !parsed_any || !number.is_empty() {
        return original.to_string();
    }

    let total = total_minutes.round() as u64;
    let (hours, minutes) = (total / 60, total % 60);
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if let Some(range) = minute_range {
        parts.push(format!("{range} minutes"));
    } else if minutes > 0 || parts.is_empty() {
        parts.push(plural(minutes, "minute"));
    }
    parts.join(" ")
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_html_document(json_ld: &str) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script type="application/ld+json">
                    {json_ld}
                </script>
            </head>
            <body></body>
            </html>
            "#
        )
    }

    #[test]
    fn test_duration_conversion() {
        assert_eq!(convert_duration("PT30M"), "30 minutes");
        assert_eq!(convert_duration("PT1H"), "1 hour");
        assert_eq!(convert_duration("PT1H30M"), "1 hour 30 minutes");
        assert_eq!(convert_duration("PT90M"), "1 hour 30 minutes");
        assert_eq!(convert_duration("PT2H1M"), "2 hours 1 minute");
        assert_eq!(convert_duration("PT15-20M"), "15-20 minutes");
        assert_eq!(convert_duration("PT5400.0S"), "1 hour 30 minutes");
        assert_eq!(convert_duration("P1DT2H"), "26 hours");
        assert_eq!(convert_duration("PT0M"), "0 minutes");
        assert_eq!(convert_duration("20 mins"), "20 mins");
        assert_eq!(convert_duration("PTxyzM"), "PTxyzM");
        assert_eq!(convert_duration("PT"), "PT");
    }

    #[test]
    fn test_sanitize_json() {
        assert_eq!(sanitize_json(r#"{"a": [1, 2,], }"#), r#"{"a": [1, 2]}"#);
        assert_eq!(
            sanitize_json("{\"name\": \"Line\none\"}"),
            r#"{"name": "Line one"}"#
        );
        assert_eq!(sanitize_json(r#"{"q": "a, ]\""}"#), r#"{"q": "a, ]\""}"#);
    }

    #[test]
    fn test_find_recipe_in_graph() {
        let html = create_html_document(
            r#"{"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "Site"},
                {"@type": ["Recipe", "NewsArticle"], "name": "Graph Recipe"}
            ]}"#,
        );
        let context = ParsingContext::new("https://example.com", &html);
        assert_eq!(
            JsonLdLayout.locate(&context, Region::Title),
            Lookup::Found(vec!["Graph Recipe".to_string()])
        );
    }

    #[test]
    fn test_no_json_ld_is_missing() {
        let context = ParsingContext::new("https://example.com", "<html><body>Test</body></html>");
        assert_eq!(JsonLdLayout.locate(&context, Region::Title), Lookup::Missing);
    }

    #[test]
    fn test_instruction_shapes() {
        let html = create_html_document(
            r#"{"@type": "Recipe", "name": "Soup",
                "recipeInstructions": [
                    {"@type": "HowToSection", "name": "Broth", "itemListElement": [
                        {"@type": "HowToStep", "text": "Simmer bones."},
                        {"@type": "HowToStep", "name": "Strain."}
                    ]},
                    {"@type": "HowToStep", "text": "Add noodles &amp; serve."},
                    "Garnish."
                ]}"#,
        );
        let context = ParsingContext::new("https://example.com", &html);
        assert_eq!(
            JsonLdLayout.locate(&context, Region::Steps),
            Lookup::Found(vec![
                "Simmer bones.".to_string(),
                "Strain.".to_string(),
                "Add noodles & serve.".to_string(),
                "Garnish.".to_string(),
            ])
        );
    }

    #[test]
    fn test_unexpected_ingredient_shape() {
        let html = create_html_document(
            r#"{"@type": "Recipe", "name": "Odd", "recipeIngredient": {"list": 3}}"#,
        );
        let context = ParsingContext::new("https://example.com", &html);
        assert!(matches!(
            JsonLdLayout.locate(&context, Region::Ingredients),
            Lookup::Unrecognized(_)
        ));
    }

    #[test]
    fn test_yield_prefers_descriptive_entry() {
        let html = create_html_document(
            r#"{"@type": "Recipe", "name": "Buns", "recipeYield": ["15", "15 buns"]}"#,
        );
        let context = ParsingContext::new("https://example.com", &html);
        assert_eq!(
            JsonLdLayout.locate(&context, Region::Servings),
            Lookup::Found(vec!["15 buns".to_string()])
        );
    }
}
