//! Fetching and parsing the news RSS feed.
//!
//! Items are RSS 2.0 `<item>` elements carrying a `title`, a `pubDate`, the
//! article body in a `full-text` element of the Yandex news namespace, and an
//! optional `<enclosure url="...">` picture.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use reqwest::Client;
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::FeedError;
use crate::models::FeedItem;

/// Namespace of the `full-text` extension element.
pub const YANDEX_NEWS_NS: &[u8] = b"http://news.yandex.ru";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsShorts/1.0)";

/// Somewhere a feed document can be read from
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        tracing::debug!("Fetching RSS feed from: {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status,
                url: self.url.clone(),
            });
        }

        let bytes = response.bytes().await?;
        let items = parse_feed(&bytes)?;

        tracing::debug!("Parsed {} items from RSS feed", items.len());
        Ok(items)
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// A feed document saved on disk
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FeedError::Read {
                path: self.path.clone(),
                source,
            })?;

        parse_feed(&bytes)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    PubDate,
    FullText,
}

/// Item being assembled while its element is open.
#[derive(Default)]
struct ItemBuilder {
    item: FeedItem,
    /// Elements currently open below `<item>`.
    depth: usize,
    /// Field the innermost direct child feeds into.
    field: Option<Field>,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.item.title,
            Field::PubDate => &mut self.item.pub_date,
            Field::FullText => &mut self.item.full_text,
        }
    }

    fn open(&mut self, ns: &ResolveResult, element: &BytesStart) {
        self.depth += 1;

        if self.depth > 1 {
            self.separate();
            return;
        }

        self.field = classify(ns, element.local_name().as_ref());
        if let Some(field) = self.field {
            // First occurrence wins
            if self.slot(field).is_some() {
                self.field = None;
            }
        }
        self.read_enclosure(element);
    }

    /// Markup nested inside a field: keep words apart.
    fn separate(&mut self) {
        if let Some(field) = self.field {
            if let Some(text) = self.slot(field) {
                text.push(' ');
            }
        }
    }

    fn close(&mut self) {
        self.depth -= 1;
        if self.depth == 0 {
            self.field = None;
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(field) = self.field {
            self.slot(field)
                .get_or_insert_with(String::new)
                .push_str(text);
        }
    }

    fn read_enclosure(&mut self, element: &BytesStart) {
        if element.local_name().as_ref() != b"enclosure" || self.item.image_url.is_some() {
            return;
        }

        for attr in element.attributes().flatten() {
            if attr.key.local_name().as_ref() == b"url" {
                let value = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                if !value.trim().is_empty() {
                    self.item.image_url = Some(value);
                }
            }
        }
    }

    fn build(self) -> FeedItem {
        let FeedItem {
            title,
            pub_date,
            full_text,
            image_url,
        } = self.item;

        FeedItem {
            title: title.filter(|t| !t.trim().is_empty()),
            pub_date: pub_date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            full_text: full_text.filter(|t| !t.trim().is_empty()),
            image_url,
        }
    }
}

fn classify(ns: &ResolveResult, local: &[u8]) -> Option<Field> {
    match (ns, local) {
        (ResolveResult::Unbound, b"title") => Some(Field::Title),
        (ResolveResult::Unbound, b"pubDate") => Some(Field::PubDate),
        (ResolveResult::Bound(namespace), b"full-text") if namespace.as_ref() == YANDEX_NEWS_NS => {
            Some(Field::FullText)
        }
        // Feeds that use the prefix without declaring it
        (ResolveResult::Unknown(prefix), b"full-text") if prefix.as_slice() == b"yandex" => {
            Some(Field::FullText)
        }
        _ => None,
    }
}

/// Encoding named in the `<?xml ... encoding="..."?>` declaration, if any.
fn declared_encoding(xml: &[u8]) -> Option<&'static Encoding> {
    let start = xml.iter().position(|b| !b.is_ascii_whitespace())?;
    let prolog = &xml[start..];
    if !prolog.starts_with(b"<?xml") {
        return None;
    }
    let end = prolog.windows(2).position(|w| w == b"?>")?;
    let declaration = String::from_utf8_lossy(&prolog[..end]);

    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let label = &after[1..];
    let label = &label[..label.find(quote)?];

    Encoding::for_label(label.trim().as_bytes())
}

/// Decode the document to UTF-8. A byte-order mark wins over the
/// declaration; without either the document is taken as UTF-8.
fn decode_document(xml: &[u8]) -> Cow<'_, str> {
    let encoding = declared_encoding(xml).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(xml);
    if had_errors {
        tracing::warn!("Feed contains bytes that are not valid {}", used.name());
    }
    text
}

/// Parse an RSS document into its items, in document order.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let document = decode_document(xml);
    let mut reader = NsReader::from_reader(document.as_bytes());

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<ItemBuilder> = None;

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => match current.as_mut() {
                Some(builder) => builder.open(&ns, &e),
                None => {
                    if e.local_name().as_ref() == b"item" {
                        current = Some(ItemBuilder::default());
                    }
                }
            },
            Ok((_, Event::Empty(e))) => {
                if let Some(builder) = current.as_mut() {
                    if builder.depth == 0 {
                        builder.read_enclosure(&e);
                    } else {
                        builder.separate();
                    }
                }
            }
            Ok((_, Event::End(_))) => {
                let closes_item = current.as_ref().is_some_and(|b| b.depth == 0);
                if closes_item {
                    if let Some(builder) = current.take() {
                        items.push(builder.build());
                    }
                } else if let Some(builder) = current.as_mut() {
                    builder.close();
                }
            }
            Ok((_, Event::Text(e))) => {
                if let Some(builder) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    builder.push_text(&text);
                }
            }
            Ok((_, Event::CData(e))) => {
                if let Some(builder) = current.as_mut() {
                    builder.push_text(&String::from_utf8_lossy(&e));
                }
            }
            Ok((_, Event::Eof)) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}
