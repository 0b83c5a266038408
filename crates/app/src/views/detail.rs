use askama::Template;
use listings_core::Property;

use super::{format_date, format_price};

#[derive(Template)]
#[template(path = "detail.html")]
struct DetailPage<'a> {
    property: &'a Property,
    image: Option<Image<'a>>,
    price: String,
    paragraphs: Vec<String>,
    listed: String,
    updated: String,
}

struct Image<'a> {
    src: &'a str,
    alt: &'a str,
}

pub fn render(property: &Property) -> Result<String, askama::Error> {
    DetailPage {
        property,
        image: property.image.url().map(|src| Image {
            src,
            alt: property.image.alt().unwrap_or(&property.title),
        }),
        price: format_price(property.price),
        paragraphs: property.description.paragraphs(),
        listed: format_date(property.created_at),
        updated: format_date(property.updated_at),
    }
    .render()
}
