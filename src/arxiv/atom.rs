//! Atom feed decoding for arXiv query responses.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::warn;

use super::ArxivError;
use crate::paper::{PaperRecord, normalize_whitespace};

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

/// Atom elements, or unqualified ones for feeds that omit the namespace declaration.
fn is_atom(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == ATOM_NS,
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Id,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"summary" => Some(Field::Summary),
            b"id" => Some(Field::Id),
            _ => None,
        }
    }
}

#[derive(Default)]
struct EntryFields {
    title: Option<String>,
    summary: Option<String>,
    id: Option<String>,
    bad_text: bool,
}

impl EntryFields {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Id => &mut self.id,
        }
    }

    fn push_text(&mut self, field: Field, text: &str) {
        let slot = self.slot(field).get_or_insert_with(String::new);
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    fn into_record(self) -> Result<PaperRecord, &'static str> {
        if self.bad_text {
            return Err("undecodable text");
        }
        let title = self
            .title
            .map(|t| normalize_whitespace(&t))
            .filter(|t| !t.is_empty())
            .ok_or("missing title")?;
        let summary = self
            .summary
            .map(|s| normalize_whitespace(&s))
            .ok_or("missing summary")?;
        let link = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or("missing id")?;
        Ok(PaperRecord::new(title, summary, link))
    }
}

#[derive(Debug, Default)]
pub(super) struct Feed {
    pub records: Vec<PaperRecord>,
    pub skipped: usize,
}

/// Decode every `<entry>` of an Atom feed. Only direct Atom children of an entry are
/// read, so `<author><name>` and elements from other namespaces never leak into the
/// record. Entries lacking a required field are counted in `skipped` instead of
/// failing the whole feed.
pub(super) fn parse_feed(xml: &str) -> Result<Feed, ArxivError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut entry: Option<EntryFields> = None;
    // Element depth below the open <entry>.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;

    loop {
        let resolved = reader
            .read_resolved_event()
            .map(|(ns, event)| (is_atom(&ns), event));
        let (atom, event) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                return Err(ArxivError::Decode(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )));
            }
        };

        match event {
            Event::Start(e) => {
                let Some(current) = entry.as_mut() else {
                    if atom && e.local_name().as_ref() == b"entry" {
                        entry = Some(EntryFields::default());
                        depth = 0;
                    }
                    continue;
                };
                depth += 1;
                if depth == 1 {
                    field = atom
                        .then(|| Field::from_local_name(e.local_name().as_ref()))
                        .flatten();
                    if let Some(f) = field {
                        current.slot(f).get_or_insert_with(String::new);
                    }
                }
            }
            Event::Empty(e) => {
                if depth == 0
                    && atom
                    && let Some(current) = entry.as_mut()
                    && let Some(f) = Field::from_local_name(e.local_name().as_ref())
                {
                    current.slot(f).get_or_insert_with(String::new);
                }
            }
            Event::End(_) => {
                if entry.is_none() {
                    continue;
                }
                if depth == 0 {
                    if let Some(done) = entry.take() {
                        match done.into_record() {
                            Ok(record) => feed.records.push(record),
                            Err(reason) => {
                                warn!(reason, "skipping malformed arXiv entry");
                                feed.skipped += 1;
                            }
                        }
                    }
                } else {
                    depth -= 1;
                    if depth == 0 {
                        field = None;
                    }
                }
            }
            Event::Text(e) => {
                if depth == 1
                    && let (Some(f), Some(current)) = (field, entry.as_mut())
                {
                    match e.unescape() {
                        Ok(text) => current.push_text(f, &text),
                        Err(_) => current.bad_text = true,
                    }
                }
            }
            Event::CData(e) => {
                if depth == 1
                    && let (Some(f), Some(current)) = (field, entry.as_mut())
                {
                    current.push_text(f, &String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}
