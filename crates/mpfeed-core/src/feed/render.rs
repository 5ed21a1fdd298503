//! Feed document rendering
//!
//! Atom 1.0 and RSS 2.0 are written with `quick_xml::Writer`; JSON Feed 1.1 is
//! serialized with serde. All three carry the same items: title, link to the
//! article on the platform, publish time and cover image.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use super::models::{from_unix, Article, Feed, FeedFormat};
use crate::config::AppConfig;
use crate::{Error, Result};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";
const GENERATOR: &str = "mpfeed";

/// Channel-level metadata of a rendered feed
#[derive(Debug, Clone)]
pub struct FeedMeta {
    pub title: String,
    pub description: String,
    /// Public URL of this document
    pub self_url: String,
    /// Human-facing page of the channel
    pub link: String,
    pub image: Option<String>,
    pub updated: DateTime<Utc>,
}

impl FeedMeta {
    /// Metadata of a single subscribed feed
    pub fn for_feed(feed: &Feed, config: &AppConfig, format: FeedFormat) -> Self {
        Self {
            title: feed.mp_name.clone(),
            description: feed.mp_intro.clone(),
            self_url: config.feed_url(&feed.id, format),
            link: config.origin().to_string(),
            image: Some(feed.mp_cover.clone()).filter(|c| !c.is_empty()),
            updated: from_unix(feed.sync_time.max(feed.update_time)),
        }
    }

    /// Metadata of the aggregate feed over all subscriptions
    pub fn aggregate(config: &AppConfig, format: FeedFormat, updated: DateTime<Utc>) -> Self {
        Self {
            title: config.feeds.title.clone(),
            description: format!("{} - all subscriptions", config.feeds.title),
            self_url: config.feed_url("all", format),
            link: config.origin().to_string(),
            image: None,
            updated,
        }
    }
}

/// An article plus the name of the account that published it
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub article: Article,
    pub author: Option<String>,
}

/// Render a feed document in the requested format
pub fn render(meta: &FeedMeta, items: &[FeedItem], format: FeedFormat) -> Result<String> {
    match format {
        FeedFormat::Atom => render_atom(meta, items),
        FeedFormat::Rss => render_rss(meta, items),
        FeedFormat::Json => render_json(meta, items),
    }
}

fn rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// HTML body shown by readers: the cover image when one exists
fn item_html(article: &Article) -> Option<String> {
    if article.pic_url.is_empty() {
        return None;
    }
    Some(format!(
        "<p><img src=\"{}\" alt=\"{}\"/></p>",
        html_attr(&article.pic_url),
        html_attr(&article.title)
    ))
}

fn html_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_writer() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

fn finish(writer: XmlWriter) -> Result<String> {
    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty_element(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attr in attrs {
        element.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn render_atom(meta: &FeedMeta, items: &[FeedItem]) -> Result<String> {
    let mut writer = new_writer()?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", ATOM_NS));
    writer.write_event(Event::Start(feed))?;

    text_element(&mut writer, "id", &meta.self_url)?;
    text_element(&mut writer, "title", &meta.title)?;
    if !meta.description.is_empty() {
        text_element(&mut writer, "subtitle", &meta.description)?;
    }
    text_element(&mut writer, "updated", &rfc3339(meta.updated))?;
    text_element(&mut writer, "generator", GENERATOR)?;
    empty_element(&mut writer, "link", &[("rel", "self"), ("href", meta.self_url.as_str())])?;
    empty_element(&mut writer, "link", &[("rel", "alternate"), ("href", meta.link.as_str())])?;
    if let Some(image) = &meta.image {
        text_element(&mut writer, "icon", image)?;
        text_element(&mut writer, "logo", image)?;
    }
    writer.write_event(Event::Start(BytesStart::new("author")))?;
    text_element(&mut writer, "name", &meta.title)?;
    writer.write_event(Event::End(BytesEnd::new("author")))?;

    for item in items {
        let article = &item.article;
        let link = article.link();
        let published = rfc3339(article.published_at());

        writer.write_event(Event::Start(BytesStart::new("entry")))?;
        text_element(&mut writer, "id", &link)?;
        text_element(&mut writer, "title", &article.title)?;
        empty_element(&mut writer, "link", &[("rel", "alternate"), ("href", link.as_str())])?;
        text_element(&mut writer, "published", &published)?;
        text_element(&mut writer, "updated", &published)?;
        if let Some(author) = &item.author {
            writer.write_event(Event::Start(BytesStart::new("author")))?;
            text_element(&mut writer, "name", author)?;
            writer.write_event(Event::End(BytesEnd::new("author")))?;
        }
        if let Some(html) = item_html(article) {
            let mut content = BytesStart::new("content");
            content.push_attribute(("type", "html"));
            writer.write_event(Event::Start(content))?;
            writer.write_event(Event::Text(BytesText::new(&html)))?;
            writer.write_event(Event::End(BytesEnd::new("content")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("entry")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("feed")))?;
    finish(writer)
}

fn render_rss(meta: &FeedMeta, items: &[FeedItem]) -> Result<String> {
    let mut writer = new_writer()?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "link", &meta.link)?;
    text_element(&mut writer, "description", &meta.description)?;
    text_element(&mut writer, "lastBuildDate", &meta.updated.to_rfc2822())?;
    text_element(&mut writer, "generator", GENERATOR)?;
    empty_element(
        &mut writer,
        "atom:link",
        &[
            ("href", meta.self_url.as_str()),
            ("rel", "self"),
            ("type", "application/rss+xml"),
        ],
    )?;
    if let Some(image) = &meta.image {
        writer.write_event(Event::Start(BytesStart::new("image")))?;
        text_element(&mut writer, "url", image)?;
        text_element(&mut writer, "title", &meta.title)?;
        text_element(&mut writer, "link", &meta.link)?;
        writer.write_event(Event::End(BytesEnd::new("image")))?;
    }

    for item in items {
        let article = &item.article;
        let link = article.link();

        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &article.title)?;
        text_element(&mut writer, "link", &link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&link)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        text_element(&mut writer, "pubDate", &article.published_at().to_rfc2822())?;
        if let Some(html) = item_html(article) {
            text_element(&mut writer, "description", &html)?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    finish(writer)
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    feed_url: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    items: Vec<JsonFeedItem<'a>>,
}

#[derive(Serialize)]
struct JsonFeedItem<'a> {
    id: String,
    url: String,
    title: &'a str,
    content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    date_published: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authors: Vec<JsonFeedAuthor<'a>>,
}

#[derive(Serialize)]
struct JsonFeedAuthor<'a> {
    name: &'a str,
}

fn render_json(meta: &FeedMeta, items: &[FeedItem]) -> Result<String> {
    let doc = JsonFeed {
        version: JSON_FEED_VERSION,
        title: &meta.title,
        home_page_url: &meta.link,
        feed_url: &meta.self_url,
        description: &meta.description,
        icon: meta.image.as_deref(),
        items: items
            .iter()
            .map(|item| {
                let article = &item.article;
                JsonFeedItem {
                    id: article.link(),
                    url: article.link(),
                    title: &article.title,
                    content_html: item_html(article).unwrap_or_default(),
                    image: Some(article.pic_url.as_str()).filter(|p| !p.is_empty()),
                    date_published: rfc3339(article.published_at()),
                    authors: item
                        .author
                        .as_deref()
                        .map(|name| vec![JsonFeedAuthor { name }])
                        .unwrap_or_default(),
                }
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&doc)?)
}
