use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{Chapter, ScrapedDetail, SimilarComic};

static CHAPTER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"chapter-(\d+(?:[.-]\d+)?)").expect("chapter number regex is valid")
});

static MANGA_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/manga/([^/?#]+)").expect("manga slug regex is valid"));

const CHAPTER_ROW_SELECTORS: &[&str] = &[
    "#Daftar_Chapter tbody tr",
    "#Daftar_Chapter tr",
    "ul.chapter-list li",
    "li.wp-manga-chapter",
];

const FIRST_LATEST_SELECTORS: &[&str] = &["#Judul .new1 a", "div.new1 a"];

const SIMILAR_SELECTORS: &[&str] = &["#Spoiler .grd", "section#Spoiler article", "div.ls2"];

// Only anchors inside result cards; sidebars link to unrelated comics.
const SEARCH_RESULT_SELECTORS: &[&str] = &["div.bge div.kan a", "div.bge a"];

/// Returns the elements of the first selector in `selectors` that matches
/// anything.
fn select_first_matching<'a>(document: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            let found: Vec<ElementRef> = document.select(&selector).collect();
            if !found.is_empty() {
                return found;
            }
        }
    }

    Vec::new()
}

fn select_in<'a>(element: &ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    let found = element.select(&selector).next();
    found
}

fn clean_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last non-empty path segment of a link, e.g. `/solo-leveling-chapter-1/`
/// gives `solo-leveling-chapter-1`.
pub fn last_path_segment(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

pub fn chapter_number(chapter_slug: &str) -> Option<f64> {
    let captures = CHAPTER_NUMBER_RE.captures(chapter_slug)?;
    captures.get(1)?.as_str().replace('-', ".").parse().ok()
}

pub fn slug_from_manga_link(link: &str) -> Option<String> {
    MANGA_SLUG_RE
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn absolute_link(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Builds a chapter from an anchor. A missing or unusable href gives an
/// entry with an empty link and no number.
fn chapter_from_anchor(base: &Url, title: String, href: Option<&str>) -> Chapter {
    let link = href
        .filter(|h| !h.trim().is_empty())
        .and_then(|h| absolute_link(base, h));

    match link {
        Some(link) => {
            let slug = last_path_segment(&link).unwrap_or_default();
            let number = chapter_number(&slug);

            Chapter {
                title,
                link,
                slug,
                number,
                release_date: None,
            }
        }
        None => Chapter {
            title,
            link: String::new(),
            slug: String::new(),
            number: None,
            release_date: None,
        },
    }
}

pub fn parse_chapters(document: &Html, base: &Url) -> Vec<Chapter> {
    let rows = select_first_matching(document, CHAPTER_ROW_SELECTORS);

    rows.iter()
        .filter_map(|row| {
            // header rows carry no anchor and no cells worth reading
            let anchor = select_in(row, "a")?;
            let title = select_in(&anchor, "span")
                .map(|span| clean_text(&span))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| clean_text(&anchor));

            let mut chapter = chapter_from_anchor(base, title, anchor.value().attr("href"));
            chapter.release_date = select_in(row, "td.tanggalseries, span.chapter-release-date")
                .map(|date| clean_text(&date))
                .filter(|d| !d.is_empty());

            Some(chapter)
        })
        .collect()
}

fn anchor_label(anchor: &ElementRef) -> String {
    let spans: Vec<String> = Selector::parse("span")
        .map(|selector| anchor.select(&selector).map(|s| clean_text(&s)).collect())
        .unwrap_or_default();

    match spans.last() {
        Some(label) if !label.is_empty() => label.clone(),
        _ => clean_text(anchor),
    }
}

fn parse_first_and_latest(document: &Html, base: &Url) -> (Option<Chapter>, Option<Chapter>) {
    let anchors = select_first_matching(document, FIRST_LATEST_SELECTORS);
    let mut links = anchors.iter().filter(|a| a.value().attr("href").is_some());

    let first = links
        .next()
        .map(|a| chapter_from_anchor(base, anchor_label(a), a.value().attr("href")));
    let latest = links
        .last()
        .map(|a| chapter_from_anchor(base, anchor_label(a), a.value().attr("href")));

    (first, latest)
}

pub fn parse_similar_comics(document: &Html, base: &Url) -> Vec<SimilarComic> {
    select_first_matching(document, SIMILAR_SELECTORS)
        .iter()
        .filter_map(|card| {
            let anchor = select_in(card, "a[href]")?;
            let link = absolute_link(base, anchor.value().attr("href")?)?;
            let slug = slug_from_manga_link(&link)?;

            let title = select_in(card, "h4, .h4, h3")
                .map(|t| clean_text(&t))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| clean_text(&anchor));

            let cover_url = select_in(card, "img").and_then(|img| {
                img.value()
                    .attr("data-src")
                    .or_else(|| img.value().attr("src"))
                    .map(str::to_string)
            });

            Some(SimilarComic {
                title,
                slug,
                link,
                cover_url,
            })
        })
        .collect()
}

/// Parses a comic page. The chapter table is newest first, so when the page
/// has no explicit first/latest links they come from the ends of the list.
pub fn parse_detail(html: &str, base: &Url) -> ScrapedDetail {
    let document = Html::parse_document(html);

    let chapters = parse_chapters(&document, base);
    let (first_link, latest_link) = parse_first_and_latest(&document, base);

    let first_chapter = first_link.or_else(|| chapters.last().cloned());
    let latest_chapter = latest_link.or_else(|| chapters.first().cloned());
    let similar_comics = parse_similar_comics(&document, base);

    ScrapedDetail {
        chapters,
        first_chapter,
        latest_chapter,
        similar_comics,
    }
}

/// Comic slugs found on a search result page, in page order.
pub fn parse_search_slugs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let mut slugs: Vec<String> = Vec::new();
    for anchor in select_first_matching(&document, SEARCH_RESULT_SELECTORS) {
        if let Some(slug) = anchor.value().attr("href").and_then(slug_from_manga_link) {
            if !slugs.contains(&slug) {
                slugs.push(slug);
            }
        }
    }

    slugs
}
