//! RSS 2.0 parsing for forum feeds.
//!
//! Documents fetched over HTTP are parsed directly. Documents produced by the
//! headless browser are the browser's rendering of the feed, an HTML page
//! with the escaped XML inside a `<pre>` element, and are unwrapped first.

use crate::fetcher::{DocumentOrigin, FeedDocument};
use chrono::{DateTime, Utc};
use postwatch_core::{Category, CategoryFilter, FeedOrder, ParseError, Post};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// `&` followed by an optional entity reference; a bare `&` has no group 1.
static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#?\w+;)?").expect("ampersand pattern is valid"));

pub fn parse_document(document: &FeedDocument) -> Result<Vec<Post>, ParseError> {
    match document.origin {
        DocumentOrigin::Http => parse_feed(&document.body),
        DocumentOrigin::Browser => {
            let xml = unwrap_rendered_feed(&document.body)?;
            parse_feed(&xml)
        }
    }
}

/// Extracts and decodes the feed text from a browser-rendered page.
pub fn unwrap_rendered_feed(html: &str) -> Result<String, ParseError> {
    let lower = html.to_ascii_lowercase();
    let not_a_feed = || ParseError::NotAFeed {
        reason: "No <pre> tag found".to_string(),
    };

    let open = lower.find("<pre").ok_or_else(not_a_feed)?;
    let content_start = open + lower[open..].find('>').ok_or_else(not_a_feed)? + 1;
    let content_end = content_start
        + lower[content_start..]
            .find("</pre>")
            .ok_or_else(not_a_feed)?;

    let escaped = &html[content_start..content_end];
    let decoded = unescape_with(escaped, resolve_html5_entity).map_err(|e| {
        ParseError::NotAFeed {
            reason: format!("could not decode <pre> content: {}", e),
        }
    })?;

    Ok(decoded.into_owned())
}

/// Parses an RSS document, retrying once with bare ampersands escaped.
pub fn parse_feed(xml: &str) -> Result<Vec<Post>, ParseError> {
    let first_error = match parse_rss(xml) {
        Ok(posts) => return Ok(posts),
        Err(e @ ParseError::Xml { .. }) => e,
        Err(e) => return Err(e),
    };

    match repair_ampersands(xml) {
        Cow::Borrowed(_) => Err(first_error),
        Cow::Owned(repaired) => {
            debug!("Retrying feed parse after escaping bare ampersands");
            parse_rss(&repaired)
        }
    }
}

pub fn repair_ampersands(xml: &str) -> Cow<'_, str> {
    AMPERSAND.replace_all(xml, |caps: &Captures| match caps.get(1) {
        Some(_) => caps[0].to_string(),
        None => "&amp;".to_string(),
    })
}

/// Reverses the feed into oldest-first order when it lists newest first.
pub fn into_chronological(mut posts: Vec<Post>, order: FeedOrder) -> Vec<Post> {
    if order == FeedOrder::NewestFirst {
        posts.reverse();
    }
    posts
}

/// Keeps only posts filed under the given category.
pub fn filter_category(posts: Vec<Post>, filter: &CategoryFilter) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|post| {
            post.categories.iter().any(|category| {
                category.name.trim() == filter.name.trim()
                    && filter
                        .domain
                        .as_ref()
                        .map_or(true, |domain| category.domain.as_ref() == Some(domain))
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Link,
    Guid,
    PubDate,
    Category,
}

impl ItemField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"guid" => Some(Self::Guid),
            b"pubDate" => Some(Self::PubDate),
            b"category" => Some(Self::Category),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    pub_date: Option<String>,
    categories: Vec<Category>,
    category_domain: Option<String>,
}

impl ItemBuilder {
    fn set(&mut self, field: ItemField, text: String) {
        let text = text.trim().to_string();
        match field {
            ItemField::Title => self.title = Some(text),
            ItemField::Link => self.link = Some(text),
            ItemField::Guid => self.guid = Some(text),
            ItemField::PubDate => self.pub_date = Some(text),
            ItemField::Category => {
                let domain = self.category_domain.take();
                if !text.is_empty() {
                    self.categories.push(Category { name: text, domain });
                }
            }
        }
    }

    fn build(self, index: usize) -> Result<Post, ParseError> {
        let missing = |field: &str| ParseError::MissingField {
            index,
            field: field.to_string(),
        };

        let title = self.title.ok_or_else(|| missing("title"))?;
        let link_text = self
            .link
            .filter(|link| !link.is_empty())
            .ok_or_else(|| missing("link"))?;
        let link = Url::parse(&link_text).map_err(|_| ParseError::InvalidLink {
            index,
            value: link_text.clone(),
        })?;
        let id = self
            .guid
            .filter(|guid| !guid.is_empty())
            .unwrap_or_else(|| link_text.clone());

        let date_text = self.pub_date.ok_or_else(|| missing("pubDate"))?;
        let published_at = DateTime::parse_from_rfc2822(&date_text)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|_| ParseError::InvalidDate {
                index,
                value: date_text.clone(),
            })?;

        Ok(Post {
            id,
            title,
            link,
            published_at,
            categories: self.categories,
        })
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// Converts a byte offset into a 1-based line and column plus the line text.
fn locate(source: &str, offset: usize) -> (usize, usize, Option<String>) {
    let prefix = &source.as_bytes()[..offset.min(source.len())];
    let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = prefix
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1);
    let column = prefix.len() - line_start + 1;
    let excerpt = source.lines().nth(line - 1).map(str::to_string);
    (line, column, excerpt)
}

fn xml_error(source: &str, offset: usize, message: String) -> ParseError {
    let (line, column, excerpt) = locate(source, offset);
    ParseError::Xml {
        line,
        column,
        message,
        excerpt,
    }
}

fn parse_rss(xml: &str) -> Result<Vec<Post>, ParseError> {
    // Whole fields are trimmed in ItemBuilder::set, never single events.
    let mut reader = Reader::from_str(xml);

    let mut posts = Vec::new();
    let mut depth = 0usize;
    let mut channel_depth: Option<usize> = None;
    let mut item: Option<(usize, ItemBuilder)> = None;
    let mut field: Option<(ItemField, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            xml_error(xml, reader.error_position() as usize, e.to_string())
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                let name = name.as_ref();

                if name == b"channel" && channel_depth.is_none() {
                    channel_depth = Some(depth);
                } else if name == b"item" && channel_depth.is_some() && item.is_none() {
                    item = Some((depth, ItemBuilder::default()));
                } else if let Some((item_depth, builder)) = item.as_mut() {
                    if depth == *item_depth + 1 {
                        if let Some(kind) = ItemField::from_name(name) {
                            if kind == ItemField::Category {
                                builder.category_domain = attribute(&e, b"domain");
                            }
                            field = Some((kind, String::new()));
                        }
                    }
                }
            }
            Event::End(_) => {
                match item.as_ref().map(|(item_depth, _)| *item_depth) {
                    Some(item_depth) if depth == item_depth + 1 => {
                        if let (Some((kind, text)), Some((_, builder))) =
                            (field.take(), item.as_mut())
                        {
                            builder.set(kind, text);
                        }
                    }
                    Some(item_depth) if depth == item_depth => {
                        if let Some((_, builder)) = item.take() {
                            posts.push(builder.build(posts.len())?);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) => {
                if let Some((_, text)) = field.as_mut() {
                    let decoded = e.unescape_with(resolve_html5_entity).map_err(|err| {
                        xml_error(xml, reader.buffer_position() as usize, err.to_string())
                    })?;
                    text.push_str(&decoded);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(xml_error(
            xml,
            xml.len(),
            format!("unexpected end of document, {} element(s) left open", depth),
        ));
    }
    if channel_depth.is_none() {
        return Err(ParseError::MissingChannel);
    }

    debug!("Parsed {} items from feed", posts.len());
    Ok(posts)
}
