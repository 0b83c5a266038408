use askama::Template;
use listings_core::Property;
use url::form_urlencoded;

use super::{format_price, PLACEHOLDER_IMAGE};

/// Everything the listing page needs from one store query.
#[derive(Debug, Clone, Copy)]
pub struct ListingView<'a> {
    pub docs: &'a [Property],
    pub total_docs: u64,
    pub total_pages: u64,
    pub page: u64,
    /// Active search term, empty when none.
    pub search: &'a str,
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingPage<'a> {
    search: &'a str,
    shown: usize,
    total_docs: u64,
    cards: Vec<Card<'a>>,
    pagination: Option<Pagination>,
}

struct Card<'a> {
    slug: &'a str,
    src: &'a str,
    alt: &'a str,
    price: String,
    title: &'a str,
    location: &'a str,
}

impl<'a> Card<'a> {
    fn new(property: &'a Property) -> Self {
        Self {
            slug: &property.slug,
            src: property.image.url().unwrap_or(PLACEHOLDER_IMAGE),
            alt: property.image.alt().unwrap_or(&property.title),
            price: format_price(property.price),
            title: &property.title,
            location: &property.location,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Pagination {
    previous: Option<String>,
    pages: Vec<PageLink>,
    next: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct PageLink {
    number: u64,
    href: String,
    active: bool,
}

/// Renders the listing page. Cards keep store order.
pub fn render(view: &ListingView<'_>) -> Result<String, askama::Error> {
    ListingPage {
        search: view.search,
        shown: view.docs.len(),
        total_docs: view.total_docs,
        cards: view.docs.iter().map(Card::new).collect(),
        pagination: pagination(view.page, view.total_pages, view.search),
    }
    .render()
}

/// Pagination strip, `None` unless there is more than one page.
fn pagination(page: u64, total_pages: u64, search: &str) -> Option<Pagination> {
    if total_pages <= 1 {
        return None;
    }

    Some(Pagination {
        previous: (page > 1).then(|| page_href(search, page - 1)),
        pages: (1..=total_pages)
            .map(|number| PageLink {
                number,
                href: page_href(search, number),
                active: number == page,
            })
            .collect(),
        next: (page < total_pages).then(|| page_href(search, page + 1)),
    })
}

/// Builds `/?search=…&page=n`, leaving `search` out when no term is active.
pub fn page_href(search: &str, page: u64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !search.is_empty() {
        query.append_pair("search", search);
    }
    query.append_pair("page", &page.to_string());
    format!("/?{}", query.finish())
}
