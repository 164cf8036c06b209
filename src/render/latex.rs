use crate::config::{DocumentConfig, PageBreak};
use crate::model::Recipe;
use std::fmt::Write;

// Image formats `\includegraphics` can load under XeLaTeX
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// Renders an ordered batch of recipes as a single XeLaTeX document.
///
/// Every recipe becomes one block separated from the next by a page break,
/// so each recipe starts on its own page. Page text goes through
/// [`escape_latex`], which keeps the document compilable whatever the
/// source site put in its markup.
#[derive(Debug, Clone, Default)]
pub struct LatexRenderer {
    options: DocumentConfig,
}

impl LatexRenderer {
    pub fn new(options: DocumentConfig) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DocumentConfig {
        &self.options
    }

    /// The complete document, preamble to `\end{document}`
    ///
    /// # Example
    /// ```
    /// use mealprint::{LatexRenderer, Recipe};
    ///
    /// let recipe = Recipe::builder("https://example.com/toast")
    ///     .title("Toast & Jam")
    ///     .ingredients(["1 slice bread", "1 tbsp jam"])
    ///     .steps(["Toast the bread.", "Spread the jam."])
    ///     .build()
    ///     .unwrap();
    ///
    /// let document = LatexRenderer::default().render(&[recipe]);
    /// assert!(document.contains(r"{\LARGE Toast \& Jam}"));
    /// assert!(document.ends_with("\\end{document}\n"));
    /// ```
    pub fn render(&self, recipes: &[Recipe]) -> String {
        let mut out = String::new();
        self.preamble(&mut out);

        out.push_str("\\begin{document}\n");
        if recipes.is_empty() {
            out.push_str("\n\\begin{center}\nNo recipes were extracted.\n\\end{center}\n");
        }
        for (index, recipe) in recipes.iter().enumerate() {
            if index > 0 {
                out.push_str(match self.options.page_break {
                    PageBreak::NewPage => "\n\\newpage\n",
                    PageBreak::ClearDoublePage => "\n\\cleardoublepage\n",
                });
            }
            self.recipe_block(index, recipe, &mut out);
        }
        out.push_str("\n\\end{document}\n");
        out
    }

    fn preamble(&self, out: &mut String) {
        let mut class_options = vec![format!("{}pt", self.options.font_size)];
        if self.options.page_break == PageBreak::ClearDoublePage {
            class_options.push("twoside".to_string());
        }
        let _ = writeln!(out, "\\documentclass[{}]{{article}}", class_options.join(","));
        out.push('\n');
        out.push_str("\\usepackage{fullpage}\n");

        let font = self
            .options
            .font
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());
        if font.is_some() {
            out.push_str("\\usepackage{fontspec}\n");
        }
        out.push_str("\\usepackage{multicol}\n");
        out.push_str("\\usepackage{graphicx}\n");
        if let Some(font) = font {
            let _ = writeln!(out, "\n\\setmainfont{{{}}}", escape_latex(font));
        }
        out.push_str("\n\\setlength{\\parindent}{0pt}\n\n");
    }

    fn recipe_block(&self, index: usize, recipe: &Recipe, out: &mut String) {
        // Comments end at the line break, which normalized URLs never contain
        let _ = writeln!(out, "\n% source: {}", recipe.source_url());

        if self.options.include_images {
            if let Some(file) = recipe
                .image_url()
                .and_then(|url| image_file_name(index, url))
            {
                // The download may have failed; the document must still compile
                let _ = writeln!(
                    out,
                    "\\IfFileExists{{{file}}}{{\\includegraphics[width=\\linewidth,height=0.3\\textheight,keepaspectratio]{{{file}}}\\par\\medskip}}{{}}"
                );
            }
        }

        let _ = writeln!(out, "{{\\LARGE {}}}\\par", escape_latex(recipe.title()));
        if let Some(subtitle) = recipe.subtitle() {
            let _ = writeln!(out, "{{\\Large {}}}\\par", escape_latex(subtitle));
        }

        let metadata: Vec<String> = [
            ("Yield", recipe.servings()),
            ("Prep", recipe.prep_time()),
            ("Cook", recipe.cook_time()),
            ("Total", recipe.total_time()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| labeled(label, v)))
        .collect();
        if !metadata.is_empty() {
            let _ = writeln!(out, "\\medskip\n{}\\par", metadata.join(" \\quad "));
        }

        out.push_str("\n\\subsection*{Ingredients}\n");
        let columns = self.options.ingredient_columns;
        if columns > 1 {
            let _ = writeln!(out, "\\begin{{multicols}}{{{columns}}}");
        }
        write_list(out, "itemize", recipe.ingredients());
        if columns > 1 {
            out.push_str("\\end{multicols}\n");
        }

        out.push_str("\n\\subsection*{Directions}\n");
        write_list(out, "enumerate", recipe.steps());
    }
}

// Some sites already print "Prep 10 min"; do not label it twice
fn labeled(label: &str, value: &str) -> String {
    let has_label = value
        .get(..label.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(label));
    if has_label {
        escape_latex(value)
    } else {
        format!("{label}: {}", escape_latex(value))
    }
}

fn write_list(out: &mut String, environment: &str, items: &[String]) {
    let _ = writeln!(out, "\\begin{{{environment}}}");
    for item in items {
        // A leading bracket would be read as the optional label of \item
        let guard = if item.starts_with('[') { "{}" } else { "" };
        let _ = writeln!(out, "  \\item {guard}{}", escape_latex(item));
    }
    let _ = writeln!(out, "\\end{{{environment}}}");
}

/// Escapes every character that has a special meaning in LaTeX text mode.
///
/// Control characters other than whitespace are invalid LaTeX input and
/// are dropped.
///
/// # Example
/// ```
/// use mealprint::escape_latex;
///
/// assert_eq!(escape_latex("50% off & $5"), r"50\% off \& \$5");
/// ```
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() && !c.is_whitespace() => {}
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_latex`]
pub fn unescape_latex(text: &str) -> String {
    const WORDS: [(&str, char); 3] = [
        ("textbackslash{}", '\\'),
        ("textasciicircum{}", '^'),
        ("textasciitilde{}", '~'),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        if let Some((word, c)) = WORDS.iter().find(|(word, _)| rest.starts_with(word)) {
            out.push(*c);
            rest = &rest[word.len()..];
            continue;
        }
        match rest.chars().next() {
            Some(c @ ('&' | '%' | '$' | '#' | '_' | '{' | '}')) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
            _ => out.push('\\'),
        }
    }
    out.push_str(rest);
    out
}

/// Local file name for the image of the recipe at `index` in a rendered batch
///
/// The name is the recipe's 1-based position followed by the last URL path
/// segment, so photos of different recipes never share a file even when
/// their URLs end the same way. Returns `None` when the URL does not end in
/// a file LaTeX can include. Characters that could upset `\includegraphics`
/// are replaced with `_`, including every dot but the one before the
/// extension.
///
/// # Example
/// ```
/// use mealprint::image_file_name;
///
/// assert_eq!(
///     image_file_name(0, "https://cdn.example.com/img/beef.tacos.JPG?w=800").as_deref(),
///     Some("01-beef_tacos.JPG")
/// );
/// assert_eq!(image_file_name(0, "https://example.com/image"), None);
/// ```
pub fn image_file_name(index: usize, url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (stem, extension) = segment.rsplit_once('.')?;

    let known = IMAGE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension));
    if !known || stem.is_empty() {
        return None;
    }

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    Some(format!("{:02}-{stem}.{extension}", index + 1))
}
