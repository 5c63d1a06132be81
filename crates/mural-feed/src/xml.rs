//! Feed XML parsing.
//!
//! The feed document is a root `images` element holding repeated
//! `image` elements. Each image carries a compact `startdate`, a
//! relative `urlBase` (qualified with the image host and a fixed
//! resolution suffix), `copyright`, `copyrightlink`, and `headline`.
//! Unknown elements are skipped.

use quick_xml::Reader;
use quick_xml::events::Event;

use mural_types::{FeedEntry, dates};

use crate::error::{Error, Result};

/// Resolution suffix appended to every `urlBase`.
pub(crate) const RESOLUTION_SUFFIX: &str = "_1920x1080.jpg";

#[derive(Clone, Copy)]
enum Field {
    StartDate,
    UrlBase,
    Copyright,
    CopyrightLink,
    Headline,
}

#[derive(Default)]
struct PartialEntry {
    start_date: Option<String>,
    url_base: Option<String>,
    copyright: Option<String>,
    copyright_link: Option<String>,
    headline: Option<String>,
}

impl PartialEntry {
    fn assign(&mut self, field: Field, text: String) {
        match field {
            Field::StartDate => self.start_date = Some(text),
            Field::UrlBase => self.url_base = Some(text),
            Field::Copyright => self.copyright = Some(text),
            Field::CopyrightLink => self.copyright_link = Some(text),
            Field::Headline => self.headline = Some(text),
        }
    }

    fn finish(self, image_host: &str) -> Result<FeedEntry> {
        let start_date = self.start_date.ok_or(Error::MissingField("startdate"))?;
        let url_base = self.url_base.ok_or(Error::MissingField("urlBase"))?;

        Ok(FeedEntry {
            date: dates::parse_compact(&start_date)?,
            image_url: format!("{image_host}{url_base}{RESOLUTION_SUFFIX}"),
            copyright: self.copyright.ok_or(Error::MissingField("copyright"))?,
            copyright_link: self
                .copyright_link
                .ok_or(Error::MissingField("copyrightlink"))?,
            headline: self.headline.ok_or(Error::MissingField("headline"))?,
        })
    }
}

/// Parse a feed document into entries, in document order.
pub(crate) fn parse_feed(xml: &str, image_host: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event().map_err(Error::xml)? {
            Event::Start(start) => {
                field = match start.name().as_ref() {
                    b"image" => {
                        current = Some(PartialEntry::default());
                        None
                    }
                    b"startdate" => Some(Field::StartDate),
                    b"urlBase" => Some(Field::UrlBase),
                    b"copyright" => Some(Field::Copyright),
                    b"copyrightlink" => Some(Field::CopyrightLink),
                    b"headline" => Some(Field::Headline),
                    _ => None,
                };
            }
            Event::Text(text) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                    let value = text.unescape().map_err(Error::xml)?.into_owned();
                    entry.assign(field, value);
                }
            }
            Event::End(end) => {
                if end.name().as_ref() == b"image"
                    && let Some(entry) = current.take()
                {
                    entries.push(entry.finish(image_host)?);
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}
