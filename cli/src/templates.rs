//! Embedded style-guide content — the HTML page bodies compiled into the
//! binary.
//!
//! At compile time, `include_dir!` embeds everything under
//! `templates/style-guide/`. Each `.html` file becomes one private page on
//! the target site: the file stem is the page slug and the title is derived
//! from it.

use include_dir::{Dir, include_dir};

static STYLE_GUIDE: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates/style-guide");

/// One embedded style-guide page.
pub struct StyleGuideTemplate {
    pub slug: String,
    pub title: String,
    pub body: &'static str,
}

/// All embedded style-guide pages, ordered by slug.
#[must_use]
pub fn style_guide_templates() -> Vec<StyleGuideTemplate> {
    let mut templates: Vec<StyleGuideTemplate> = STYLE_GUIDE
        .files()
        .filter_map(|file| {
            let path = file.path();
            if path.extension().is_none_or(|ext| ext != "html") {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            Some(StyleGuideTemplate {
                slug: stem.to_string(),
                title: title_from_slug(stem),
                body: file.contents_utf8().unwrap_or_default(),
            })
        })
        .collect();
    templates.sort_by(|a, b| a.slug.cmp(&b.slug));
    templates
}

/// Human page title: non-alphanumerics become spaces, words are capitalized.
#[must_use]
pub fn title_from_slug(slug: &str) -> String {
    let spaced: String = slug
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    spaced
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}
