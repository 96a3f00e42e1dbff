pub mod timestamp;

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::app::{FeedwatchError, Result};
use crate::domain::item::non_blank;
use crate::domain::FeedItem;

pub use timestamp::normalize_timestamp;

pub const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// Converts RSS 2.0 and Atom documents into [`FeedItem`]s.
///
/// RSS `channel/item` entries anywhere in the document win; Atom `entry`
/// elements directly under the root are only used when there are none.
/// Entries that do not yield a guid are skipped rather than failing the feed.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<Vec<FeedItem>> {
        let (format, entries) = scan_document(body)?;

        let total = entries.len();
        let items: Vec<FeedItem> = entries.into_iter().filter_map(RawEntry::into_item).collect();

        tracing::debug!(
            "Parsed {:?} feed: {} entries, {} kept",
            format,
            total,
            items.len()
        );

        Ok(items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    None,
    Atom,
    Other,
}

impl Ns {
    fn of(resolved: &ResolveResult) -> Self {
        match resolved {
            ResolveResult::Unbound => Ns::None,
            ResolveResult::Bound(ns) if ns.as_ref() == ATOM_NS => Ns::Atom,
            _ => Ns::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    AtomId,
    PubDate,
    Published,
}

impl Field {
    /// RSS items only know un-namespaced children, Atom entries only Atom ones.
    fn classify(format: FeedFormat, ns: Ns, local: &[u8]) -> Option<Self> {
        match (format, ns, local) {
            (FeedFormat::Rss, Ns::None, b"title") => Some(Field::Title),
            (FeedFormat::Rss, Ns::None, b"link") => Some(Field::Link),
            (FeedFormat::Rss, Ns::None, b"guid") => Some(Field::Guid),
            (FeedFormat::Rss, Ns::None, b"pubDate") => Some(Field::PubDate),
            (FeedFormat::Atom, Ns::Atom, b"title") => Some(Field::Title),
            (FeedFormat::Atom, Ns::Atom, b"link") => Some(Field::Link),
            (FeedFormat::Atom, Ns::Atom, b"id") => Some(Field::AtomId),
            (FeedFormat::Atom, Ns::Atom, b"published") => Some(Field::Published),
            _ => None,
        }
    }
}

/// Values of the first matching child element of one entry, untrimmed.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    atom_id: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
}

impl RawEntry {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
            Field::AtomId => &mut self.atom_id,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
        }
    }

    fn into_item(self) -> Option<FeedItem> {
        let guid = non_blank(self.guid.as_deref()).or(non_blank(self.atom_id.as_deref()));
        let published_at = [self.pub_date.as_deref(), self.published.as_deref()]
            .into_iter()
            .find_map(|raw| raw.filter(|v| !v.trim().is_empty()))
            .map(normalize_timestamp);

        FeedItem::from_entry(
            self.title.as_deref(),
            self.link.as_deref(),
            guid,
            published_at,
        )
    }
}

struct OpenEntry {
    format: FeedFormat,
    depth: usize,
    raw: RawEntry,
}

struct Capture {
    field: Field,
    depth: usize,
}

/// Walks the document once, collecting RSS and Atom entries side by side.
fn scan_document(body: &[u8]) -> Result<(FeedFormat, Vec<RawEntry>)> {
    let mut reader = NsReader::from_reader(body);

    let mut buf = Vec::new();
    let mut stack: Vec<(Ns, Vec<u8>)> = Vec::new();
    let mut seen_root = false;
    let mut entry: Option<OpenEntry> = None;
    let mut capture: Option<Capture> = None;
    let mut rss_entries = Vec::new();
    let mut atom_entries = Vec::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| FeedwatchError::FeedParse(e.to_string()))?;
        let ns = Ns::of(&resolved);

        match event {
            Event::Start(_) | Event::Empty(_) if stack.is_empty() && seen_root => {
                return Err(FeedwatchError::FeedParse(
                    "multiple root elements".to_string(),
                ));
            }
            Event::Start(e) => {
                seen_root = true;
                open_element(&e, ns, &stack, &mut entry, &mut capture);
                stack.push((ns, e.local_name().as_ref().to_vec()));
            }
            Event::Empty(e) => {
                seen_root = true;
                open_element(&e, ns, &stack, &mut entry, &mut capture);
                // Self-closing: the element ends right away.
                let depth = stack.len() + 1;
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    capture = None;
                }
                close_entry(depth, &mut entry, &mut rss_entries, &mut atom_entries);
            }
            Event::End(_) => {
                let depth = stack.len();
                stack.pop();
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    capture = None;
                }
                close_entry(depth, &mut entry, &mut rss_entries, &mut atom_entries);
            }
            Event::Text(t) if stack.is_empty() && t.iter().all(u8::is_ascii_whitespace) => {}
            Event::Text(t) => {
                if stack.is_empty() {
                    return Err(FeedwatchError::FeedParse(
                        "text outside of the root element".to_string(),
                    ));
                }
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => {
                        let raw = String::from_utf8_lossy(&t);
                        html_escape::decode_html_entities(&raw).into_owned()
                    }
                };
                append_text(&stack, &capture, &mut entry, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c);
                append_text(&stack, &capture, &mut entry, &text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(FeedwatchError::FeedParse("no root element".to_string()));
    }
    if !stack.is_empty() {
        return Err(FeedwatchError::FeedParse(format!(
            "unexpected end of document, {} element(s) left open",
            stack.len()
        )));
    }

    if rss_entries.is_empty() && !atom_entries.is_empty() {
        Ok((FeedFormat::Atom, atom_entries))
    } else {
        Ok((FeedFormat::Rss, rss_entries))
    }
}

/// Handle an opening tag whose parent chain is `stack`.
fn open_element(
    e: &BytesStart,
    ns: Ns,
    stack: &[(Ns, Vec<u8>)],
    entry: &mut Option<OpenEntry>,
    capture: &mut Option<Capture>,
) {
    let local = e.local_name();
    let local = local.as_ref();
    let depth = stack.len() + 1;

    if entry.is_none() {
        if let Some(format) = entry_format(ns, local, stack) {
            *entry = Some(OpenEntry {
                format,
                depth,
                raw: RawEntry::default(),
            });
        }
        return;
    }
    let Some(open) = entry.as_mut() else {
        return;
    };

    if depth != open.depth + 1 {
        return;
    }
    let Some(field) = Field::classify(open.format, ns, local) else {
        return;
    };
    let slot = open.raw.slot(field);
    if slot.is_some() {
        return;
    }

    if field == Field::Link {
        if let Some(href) = attribute(e, b"href") {
            *slot = Some(href);
            return;
        }
    }

    *slot = Some(String::new());
    *capture = Some(Capture { field, depth });
}

/// RSS items sit directly under a `channel`; Atom entries directly under the root.
fn entry_format(ns: Ns, local: &[u8], stack: &[(Ns, Vec<u8>)]) -> Option<FeedFormat> {
    let parent = stack.last();
    if ns == Ns::None
        && local == b"item"
        && parent.is_some_and(|(pns, name)| *pns == Ns::None && name.as_slice() == b"channel")
    {
        Some(FeedFormat::Rss)
    } else if ns == Ns::Atom && local == b"entry" && stack.len() == 1 {
        Some(FeedFormat::Atom)
    } else {
        None
    }
}

fn close_entry(
    depth: usize,
    entry: &mut Option<OpenEntry>,
    rss_entries: &mut Vec<RawEntry>,
    atom_entries: &mut Vec<RawEntry>,
) {
    if !entry.as_ref().is_some_and(|open| open.depth == depth) {
        return;
    }
    if let Some(open) = entry.take() {
        match open.format {
            FeedFormat::Rss => rss_entries.push(open.raw),
            FeedFormat::Atom => atom_entries.push(open.raw),
        }
    }
}

fn append_text(
    stack: &[(Ns, Vec<u8>)],
    capture: &Option<Capture>,
    entry: &mut Option<OpenEntry>,
    text: &str,
) {
    let (Some(capture), Some(open)) = (capture, entry) else {
        return;
    };
    if capture.depth != stack.len() {
        return;
    }
    if let Some(value) = open.raw.slot(capture.field) {
        value.push_str(text);
    }
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| {
            attr.unescape_value()
                .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(&attr.value).into_owned()))
                .into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PLACEHOLDER;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com/</link>
    <atom:link href="https://example.com/feed.rss" rel="self"/>
    <item>
      <title>Test Item 1</title>
      <link>https://example.com/item1</link>
      <guid isPermaLink="false">item-1</guid>
      <pubDate>Wed, 14 May 2025 11:05:36 +0000</pubDate>
      <description>This is item 1</description>
    </item>
    <item>
      <title><![CDATA[Tom & Jerry]]></title>
      <link>
        https://example.com/item2
      </link>
    </item>
    <item>
      <title>No link</title>
      <guid>item-3</guid>
    </item>
    <item>
      <title>Nothing to identify me</title>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <id>urn:feed</id>
  <entry>
    <title>Atom Entry 1</title>
    <link rel="alternate" href="https://example.com/atom1"/>
    <link rel="replies" href="https://example.com/atom1#comments"/>
    <id>atom-entry-1</id>
    <published>2024-01-01T00:00:00Z</published>
    <updated>2024-01-02T00:00:00Z</updated>
  </entry>
  <entry>
    <title type="html">A &amp;amp; B</title>
    <link href="https://example.com/atom2"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let items = Normalizer::new().normalize(RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Test Item 1");
        assert_eq!(items[0].link, "https://example.com/item1");
        assert_eq!(items[0].guid, "item-1");
        assert_eq!(items[0].published_at.as_deref(), Some("2025-05-14 19:05:36"));

        assert_eq!(items[1].title, "Tom & Jerry");
        assert_eq!(items[1].guid, "https://example.com/item2");
        assert_eq!(items[1].published_at, None);

        assert_eq!(items[2].guid, "item-3");
        assert_eq!(items[2].link, PLACEHOLDER);
    }

    #[test]
    fn test_parse_atom() {
        let items = Normalizer::new().normalize(ATOM_SAMPLE.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Atom Entry 1");
        assert_eq!(items[0].link, "https://example.com/atom1");
        assert_eq!(items[0].guid, "atom-entry-1");
        assert_eq!(items[0].published_at.as_deref(), Some("2024-01-01 08:00:00"));

        assert_eq!(items[1].title, "A &amp; B");
        assert_eq!(items[1].guid, "https://example.com/atom2");
    }

    #[test]
    fn test_rss_items_win_over_atom_entries() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>atom-1</id><title>Atom</title></entry>
  <x:wrapper xmlns:x="urn:x">
    <channel xmlns=""><item><guid>rss-1</guid><title>Rss</title></item></channel>
  </x:wrapper>
</feed>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "rss-1");
    }

    #[test]
    fn test_atom_entry_without_namespace_is_ignored() {
        let xml = r#"<?xml version="1.0"?>
<feed><entry><id>e1</id><title>T</title></entry></feed>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_only_direct_children_are_fields() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item>
  <source><title>Nested title</title><guid>nested</guid></source>
  <link>https://example.com/x</link>
</item></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, PLACEHOLDER);
        assert_eq!(items[0].guid, "https://example.com/x");
    }

    #[test]
    fn test_blank_guid_falls_back_to_link() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item>
  <title>T</title><guid>   </guid><link>https://example.com/y</link>
</item></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].guid, "https://example.com/y");
    }

    #[test]
    fn test_unknown_entity_is_decoded_leniently() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item><title>a&nbsp;b</title><guid>g</guid></item></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].title, "a\u{a0}b");
    }

    #[test]
    fn test_unparseable_date_is_kept() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item><guid>g</guid><pubDate>yesterday</pubDate></item></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].published_at.as_deref(), Some("yesterday"));
    }

    #[test]
    fn test_unparseable_date_keeps_surrounding_whitespace() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item><guid>g</guid><pubDate> soon </pubDate></item></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].published_at.as_deref(), Some(" soon "));
    }

    #[test]
    fn test_mixed_text_and_cdata_keep_inner_spaces() {
        let xml = r#"<?xml version="1.0"?>
<rss><channel><item>
  <title>  Tom <![CDATA[&]]> Jerry<!-- note --> and friends </title>
  <guid>g</guid>
</item></channel></rss>
"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].title, "Tom & Jerry and friends");
    }

    #[test]
    fn test_atom_link_inside_rss_item_is_ignored() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"><channel>
  <item>
    <atom:title>Wrong title</atom:title>
    <atom:link href="https://example.com/self" rel="self"/>
    <link>https://example.com/real</link>
    <title>Right title</title>
  </item>
  <item>
    <atom:link href="https://example.com/self" rel="self"/>
    <link>https://example.com/other</link>
  </item>
</channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Right title");
        assert_eq!(items[0].link, "https://example.com/real");
        assert_eq!(items[0].guid, "https://example.com/real");
        assert_eq!(items[1].guid, "https://example.com/other");
    }

    #[test]
    fn test_unnamespaced_children_of_atom_entry_are_ignored() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <link xmlns="" href="https://example.com/plain"/>
    <link href="https://example.com/atom"/>
    <id>e1</id>
  </entry>
</feed>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert_eq!(items[0].link, "https://example.com/atom");
    }

    #[test]
    fn test_structurally_empty_feed() {
        let xml = r#"<?xml version="1.0"?><rss><channel><title>t</title></channel></rss>"#;
        let items = Normalizer::new().normalize(xml.as_bytes()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        let normalizer = Normalizer::new();
        for xml in [
            "<?xml version=\"1.0\"?><rss><channel></rss>",
            "<?xml version=\"1.0\"?><rss><channel>",
            "<?xml version=\"1.0\"?>",
            "<?xml version=\"1.0\"?><a/><b/>",
        ] {
            let err = normalizer.normalize(xml.as_bytes()).unwrap_err();
            assert!(matches!(err, FeedwatchError::FeedParse(_)), "{xml}: {err}");
        }
    }
}
