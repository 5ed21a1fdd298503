use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::models::{Feed, FeedFormat};
use crate::config::AppConfig;
use crate::{Error, Result};

/// File name offered for OPML downloads
pub const OPML_FILE_NAME: &str = "MpFeed-All.opml";

/// An `<outline>` entry of an OPML document
#[derive(Debug, Clone, PartialEq)]
pub struct OpmlOutline {
    pub text: String,
    pub xml_url: String,
    pub html_url: Option<String>,
}

/// Build the OPML 2.0 document listing every feed with its Atom endpoint
pub fn export_opml(feeds: &[Feed], config: &AppConfig) -> Result<String> {
    if feeds.is_empty() {
        return Err(Error::Validation("no subscriptions to export".to_string()));
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut opml = BytesStart::new("opml");
    opml.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(opml))?;

    let title = format!("{} all subscriptions", config.feeds.title);
    writer.write_event(Event::Start(BytesStart::new("head")))?;
    writer.write_event(Event::Start(BytesStart::new("title")))?;
    writer.write_event(Event::Text(BytesText::new(&title)))?;
    writer.write_event(Event::End(BytesEnd::new("title")))?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("body")))?;

    for feed in feeds {
        let url = config.feed_url(&feed.id, FeedFormat::Atom);
        let mut outline = BytesStart::new("outline");
        outline.push_attribute(("text", feed.mp_name.as_str()));
        outline.push_attribute(("type", "rss"));
        outline.push_attribute(("xmlUrl", url.as_str()));
        outline.push_attribute(("htmlUrl", url.as_str()));
        writer.write_event(Event::Empty(outline))?;
    }

    writer.write_event(Event::End(BytesEnd::new("body")))?;
    writer.write_event(Event::End(BytesEnd::new("opml")))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

/// Parse OPML content and return every outline that carries an `xmlUrl`
pub fn parse_opml(content: &str) -> Result<Vec<OpmlOutline>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut outlines = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                let mut xml_url = None;
                let mut html_url = None;
                let mut text = None;

                for attr in e.attributes().flatten() {
                    let value = attr.decode_and_unescape_value(reader.decoder())?.to_string();
                    match attr.key.as_ref() {
                        b"xmlUrl" => xml_url = Some(value),
                        b"htmlUrl" => html_url = Some(value),
                        b"title" => text = Some(value),
                        b"text" if text.is_none() => text = Some(value),
                        _ => {}
                    }
                }

                // Category outlines have no xmlUrl
                if let Some(xml_url) = xml_url {
                    outlines.push(OpmlOutline {
                        text: text.unwrap_or_default(),
                        xml_url,
                        html_url,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Failed to parse OPML: {}", e))),
            _ => {}
        }
    }

    Ok(outlines)
}

/// Extract the feed id from a `.../feeds/<id>.<ext>` URL
pub fn feed_id_from_url(url: &str) -> Option<&str> {
    let file = url.rsplit('/').next()?;
    FeedFormat::split_file_name(file).map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn feed(id: &str, name: &str) -> Feed {
        Feed {
            id: id.to_string(),
            mp_name: name.to_string(),
            mp_cover: String::new(),
            mp_intro: String::new(),
            status: 1,
            sync_time: 0,
            update_time: 0,
            has_history: 1,
            folder_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_export_one_outline_per_feed() {
        let config = AppConfig::default();
        let feeds = vec![feed("MP_WXS_1", "First"), feed("MP_WXS_2", "Second")];

        let opml = export_opml(&feeds, &config).unwrap();
        assert!(opml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(opml.contains("<opml version=\"2.0\">"));

        let outlines = parse_opml(&opml).unwrap();
        assert_eq!(outlines.len(), 2);
        for (outline, feed) in outlines.iter().zip(&feeds) {
            assert_eq!(outline.text, feed.mp_name);
            assert_eq!(
                outline.xml_url,
                format!("http://localhost:4000/feeds/{}.atom", feed.id)
            );
            assert_eq!(outline.html_url.as_deref(), Some(outline.xml_url.as_str()));
            assert_eq!(feed_id_from_url(&outline.xml_url), Some(feed.id.as_str()));
        }
    }

    #[test]
    fn test_export_escapes_names() {
        let config = AppConfig::default();
        let feeds = vec![feed("MP_WXS_3", "Tom & \"Jerry\" <daily>")];

        let opml = export_opml(&feeds, &config).unwrap();
        assert!(opml.contains("Tom &amp; &quot;Jerry&quot; &lt;daily&gt;"));

        let outlines = parse_opml(&opml).unwrap();
        assert_eq!(outlines[0].text, "Tom & \"Jerry\" <daily>");
    }

    #[test]
    fn test_export_empty_is_error() {
        let config = AppConfig::default();
        assert!(matches!(
            export_opml(&[], &config),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_parse_skips_categories() {
        let opml = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="2.0">
  <body>
    <outline text="Category">
      <outline text="Feed 1" title="Feed One" xmlUrl="https://example.com/feeds/a.atom" type="rss"/>
    </outline>
    <outline text="Empty Category"/>
  </body>
</opml>"#;

        let outlines = parse_opml(opml).unwrap();
        assert_eq!(outlines.len(), 1);
        assert_eq!(outlines[0].text, "Feed One");
        assert_eq!(outlines[0].html_url, None);
    }
}
