//! Field extraction from fetched pages
//!
//! The crawl chain treats extraction as a collaborator: it hands over page
//! content plus the kind of page, and gets back whatever fields could be
//! found. Nothing in here fails; a missing element is simply an absent field.

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

/// The three kinds of page visited for one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// A page of search results listing catalog entries
    SearchResults,

    /// The page of a single catalog entry (a release)
    EntryDetail,

    /// The related page fetched after the detail page (the artist profile)
    CrossReference,
}

/// Named values a page can yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    EntryLink,
    Genre,
    ArtistName,
    ArtistLink,
    ReleaseYear,
    Title,
    RecordLabel,
    TrackNumber,
    TrackName,
    TrackDuration,
    Style,
    Member,
    Website,
}

/// Multi-valued map of extracted fields, values kept in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    values: BTreeMap<Field, Vec<String>>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one value for `field`
    pub fn push(&mut self, field: Field, value: impl Into<String>) {
        self.values.entry(field).or_default().push(value.into());
    }

    /// Adds several values for `field`, preserving their order
    pub fn extend<I>(&mut self, field: Field, values: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for value in values {
            self.push(field, value);
        }
    }

    /// First value of `field`, if any
    pub fn first(&self, field: Field) -> Option<&str> {
        self.all(field).first().map(String::as_str)
    }

    /// Every value of `field`; empty when absent
    pub fn all(&self, field: Field) -> &[String] {
        self.values.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if no field has any value
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}

/// Pulls structured fields out of page content
pub trait Extractor: Send + Sync {
    fn extract(&self, content: &str, kind: PageKind) -> Fields;
}

/// Extractor for the catalog's HTML markup, built on `scraper`
///
/// # Extraction Rules
///
/// | Page | Field | Source |
/// |------|-------|--------|
/// | search | EntryLink | `a.search_result_title` href |
/// | detail | Genre | first `a[href^="/genre/"]` text |
/// | detail | ArtistName / ArtistLink | first `a[href^="/artist/"]` text / href |
/// | detail | ReleaseYear | `a[href^="/search/"] time` datetime |
/// | detail | Title | text after the artist `<span>` inside `<h1>` (untrimmed) |
/// | detail | RecordLabel | `<a>` texts in the cell after the "Label:" header |
/// | detail | TrackNumber / TrackName / TrackDuration | `td[class^=trackPos] span`, `span[class^=trackTitle]`, `td[class^=duration] span span` |
/// | detail | Style | `a[href^="/style/"]` texts |
/// | cross-reference | Member | `a[href*="/artist/"] > span` in the cell after "Members" |
/// | cross-reference | Website | `a` hrefs in the cell after "Sites" |
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperExtractor;

impl ScraperExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ScraperExtractor {
    fn extract(&self, content: &str, kind: PageKind) -> Fields {
        let document = Html::parse_document(content);
        let root = document.root_element();
        let mut fields = Fields::new();

        match kind {
            PageKind::SearchResults => {
                fields.extend(Field::EntryLink, attrs(root, "a.search_result_title", "href"));
            }
            PageKind::EntryDetail => extract_detail(root, &mut fields),
            PageKind::CrossReference => extract_crossref(root, &mut fields),
        }

        fields
    }
}

fn extract_detail(root: ElementRef<'_>, fields: &mut Fields) {
    fields.extend(Field::Genre, first_text(root, r#"a[href^="/genre/"]"#));
    fields.extend(Field::ArtistName, first_text(root, r#"a[href^="/artist/"]"#));
    fields.extend(
        Field::ArtistLink,
        attrs(root, r#"a[href^="/artist/"]"#, "href").into_iter().next(),
    );
    fields.extend(
        Field::ReleaseYear,
        attrs(root, r#"a[href^="/search/"] time"#, "datetime")
            .into_iter()
            .next(),
    );
    fields.extend(Field::Title, title_text(root));

    if let Some(cell) = value_cell(root, "Label:") {
        fields.extend(Field::RecordLabel, texts(cell, "a"));
    }

    fields.extend(Field::TrackNumber, texts(root, r#"td[class^="trackPos"] span"#));
    fields.extend(Field::TrackName, texts(root, r#"span[class^="trackTitle"]"#));
    fields.extend(
        Field::TrackDuration,
        texts(root, r#"td[class^="duration"] span span"#),
    );
    fields.extend(Field::Style, texts(root, r#"a[href^="/style/"]"#));
}

fn extract_crossref(root: ElementRef<'_>, fields: &mut Fields) {
    if let Some(cell) = value_cell(root, "Members") {
        fields.extend(Field::Member, texts(cell, r#"a[href*="/artist/"] > span"#));
    }

    if let Some(cell) = value_cell(root, "Sites") {
        fields.extend(Field::Website, attrs(cell, "a", "href"));
    }
}

/// Elements under `root` matching `css`; an invalid selector matches nothing
fn select<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => root.select(&selector).collect(),
        Err(e) => {
            tracing::warn!("Invalid selector {}: {:?}", css, e);
            Vec::new()
        }
    }
}

/// Direct text children of an element, trimmed, blanks dropped
fn own_text(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| text.trim().to_string()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Own text of every element matching `css`, in document order
fn texts(root: ElementRef<'_>, css: &str) -> Vec<String> {
    select(root, css).into_iter().flat_map(own_text).collect()
}

/// First own text among the elements matching `css`
fn first_text(root: ElementRef<'_>, css: &str) -> Option<String> {
    texts(root, css).into_iter().next()
}

/// Non-empty values of `attr` on every element matching `css`
fn attrs(root: ElementRef<'_>, css: &str, attr: &str) -> Vec<String> {
    select(root, css)
        .into_iter()
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// The `<td>` following a `<th>` whose `<h2>` mentions `heading`
fn value_cell<'a>(root: ElementRef<'a>, heading: &str) -> Option<ElementRef<'a>> {
    select(root, "th")
        .into_iter()
        .filter(|th| {
            select(*th, "h2")
                .iter()
                .any(|h2| h2.text().collect::<String>().contains(heading))
        })
        .find_map(|th| {
            th.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "td")
        })
}

/// Raw title text inside the first `<h1>`
///
/// The first non-blank text node after the `<span>` holding the artist
/// link. Headings without such a span have no title.
fn title_text(root: ElementRef<'_>) -> Option<String> {
    let heading = select(root, "h1").into_iter().next()?;
    let mut past_artist = false;

    for node in heading.children() {
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() == "span"
                && !select(element, r#"a[href*="/artist/"]"#).is_empty()
            {
                past_artist = true;
            }
            continue;
        }

        if !past_artist {
            continue;
        }

        if let Some(text) = node.value().as_text() {
            let raw: &str = text;
            if !raw.trim().is_empty() {
                return Some(raw.to_string());
            }
        }
    }

    None
}
