//! Page extractor for calendar listings
//!
//! The rules here are bespoke to the calendar's listing layout:
//!
//! | Content type       | Block                    | Header                     |
//! |--------------------|--------------------------|----------------------------|
//! | Courses            | `div.views-row`          | `div[aria-label]`          |
//! | Programs           | `article div.w3-row`     | first `h2`/`h3`/`h4`       |
//! | Subject area index | `a[href*="/section/"]`   | anchor text                |
//!
//! Blocks that do not fit the rules are skipped silently. The listing pages
//! mix record blocks with other markup, so a partial block is noise rather
//! than an error.

use crate::records::{Course, CourseCode, Program, ProgramKind, ProgramSubjectArea};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Separator between the two halves of a listing header
pub const HEADER_DELIMITER: &str = " - ";

/// Path fragment every subject area link contains
pub const SUBJECT_AREA_MARKER: &str = "/section/";

/// Category keywords a program header must carry in parentheses
pub const PROGRAM_KEYWORDS: [&str; 7] = [
    "specialist",
    "major",
    "minor",
    "certificate",
    "focus",
    "arts program",
    "science program",
];

const COURSE_BLOCK: &str = "div.views-row";
const COURSE_HEADER: &str = "div[aria-label]";
const PROGRAM_BLOCK: &str = "article div.w3-row";
const PROGRAM_HEADER: &str = "h2, h3, h4";
const SUBJECT_AREA_LINK: &str = "a[href]";
const NEXT_PAGE_LINK: &str = "li.pager__item--next a[href]";

/// Kind of listing a page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Courses,
    SubjectAreaIndex,
    Programs,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::SubjectAreaIndex => "subject-area-index",
            Self::Programs => "programs",
        }
    }
}

/// A record produced by the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Course(Course),
    Program(Program),
    SubjectArea(ProgramSubjectArea),
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub records: Vec<Extracted>,

    /// Absolute URL of the next page in the sequence, if any
    pub next_page: Option<Url>,
}

/// Extracts records and the next-page reference from a page
///
/// # Arguments
///
/// * `content` - The page body
/// * `content_type` - Which rule set to apply
/// * `page_url` - The URL the page was fetched from, for resolving links
///
/// # Example
///
/// ```
/// use calendar_harvest::crawler::{extract, ContentType, Extracted};
/// use url::Url;
///
/// let html = r#"<div class="views-row"><div aria-label="course">CSC108H1 - Introduction to Computer Programming</div></div>"#;
/// let page_url = Url::parse("https://artsci.calendar.utoronto.ca/search-courses").unwrap();
/// let page = extract(html, ContentType::Courses, &page_url);
/// assert_eq!(page.records.len(), 1);
/// assert!(page.next_page.is_none());
/// ```
pub fn extract(content: &str, content_type: ContentType, page_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(content);

    let records = match content_type {
        ContentType::Courses => extract_courses(&document),
        ContentType::Programs => extract_programs(&document),
        ContentType::SubjectAreaIndex => extract_subject_areas(&document),
    };

    ExtractedPage {
        records,
        next_page: extract_next_page(&document, page_url),
    }
}

/// Splits a listing header on the delimiter and trims both halves
///
/// Returns None when the header has fewer than two segments. Segments past
/// the second are ignored.
pub fn split_header(text: &str) -> Option<(&str, &str)> {
    let mut parts = text.split(HEADER_DELIMITER);
    let first = parts.next()?.trim();
    let second = parts.next()?.trim();
    Some((first, second))
}

/// Parses a course header of the form `CODE - Name`
pub fn parse_course_header(text: &str) -> Option<Course> {
    let (code, name) = split_header(text)?;
    let code = CourseCode::new(code)?;
    Some(Course::new(code, name))
}

/// Returns true if the header carries a parenthesized category keyword
///
/// Matching is case-insensitive: `(Specialist)`, `(Science Program)` and
/// `(major)` all qualify, a bare `Major` does not.
pub fn has_program_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    PROGRAM_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(&format!("({}", keyword)))
}

/// Parses a program header of the form `Name (Category) - CODE`
///
/// The header must carry a category keyword and the code must start with
/// one of the known program prefixes.
pub fn parse_program_header(text: &str) -> Option<Program> {
    if !has_program_keyword(text) {
        return None;
    }

    let (name, code) = split_header(text)?;
    let kind = ProgramKind::from_code(code)?;

    Some(Program {
        code: code.to_string(),
        name: name.to_string(),
        kind,
        faculty: None,
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn extract_courses(document: &Html) -> Vec<Extracted> {
    let (Some(block_selector), Some(header_selector)) =
        (selector(COURSE_BLOCK), selector(COURSE_HEADER))
    else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for block in document.select(&block_selector) {
        let Some(header) = block.select(&header_selector).next() else {
            continue;
        };

        let text = element_text(header);
        match parse_course_header(&text) {
            Some(course) => {
                tracing::debug!("{}: {}", course.code, course.name);
                records.push(Extracted::Course(course));
            }
            None => tracing::trace!("Skipping course block {:?}", text.trim()),
        }
    }
    records
}

fn extract_programs(document: &Html) -> Vec<Extracted> {
    let (Some(block_selector), Some(header_selector)) =
        (selector(PROGRAM_BLOCK), selector(PROGRAM_HEADER))
    else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for block in document.select(&block_selector) {
        let text = match block.select(&header_selector).next() {
            Some(header) => element_text(header),
            None => element_text(block),
        };

        match parse_program_header(&text) {
            Some(program) => {
                tracing::debug!("{}: {}", program.code, program.name);
                records.push(Extracted::Program(program));
            }
            None => tracing::trace!("Skipping program block {:?}", text.trim()),
        }
    }
    records
}

fn extract_subject_areas(document: &Html) -> Vec<Extracted> {
    let Some(link_selector) = selector(SUBJECT_AREA_LINK) else {
        return Vec::new();
    };

    document
        .select(&link_selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !href.contains(SUBJECT_AREA_MARKER) {
                return None;
            }
            Some(Extracted::SubjectArea(ProgramSubjectArea {
                name: element_text(anchor).trim().to_string(),
                endpoint: href.to_string(),
            }))
        })
        .collect()
}

fn extract_next_page(document: &Html, page_url: &Url) -> Option<Url> {
    let next_selector = selector(NEXT_PAGE_LINK)?;
    let anchor = document.select(&next_selector).next()?;
    let href = anchor.value().attr("href")?;
    resolve_link(href, page_url)
}
