//! Stack-based extraction of bus lines from a schedule table.
//!
//! The place page lists one table row per line direction:
//!
//! ```text
//! <tr>
//!   <td class="tppjln-short"><div style="background:#cc0000;"><div>23</div></div></td>
//!   <td class="tppjdh">Downtown</td>
//!   <td class="time">5:45pm</td><td class="time nextday">12:10am</td>
//! </tr>
//! <tr><td class="tppjdh">Airport</td><td class="time">6:15pm</td></tr>
//! ```
//!
//! The line label cell only appears on a line's first row. A row without
//! a label is the opposite direction of the line above it and inherits
//! its label and color.
//!
//! Cell classes decide which field a cell's text feeds. Text only counts
//! when the stack of open tags ends with the shape expected for that field,
//! which separates the visible label from decorative siblings and keeps
//! text nested inside a direction cell out of the direction.

use std::cell::RefCell;
use std::sync::OnceLock;

use html5ever::Attribute;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{BusLine, Departure};

/// Start of the schedule table on a place page.
pub const TABLE_ANCHOR: &str = r#"<table class="tppjt""#;

const TABLE_END: &str = "</table>";

/// Which row field the text of the current cell feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Time,
    NextDayTime,
    Direction,
    LineLabel,
}

impl Field {
    /// Field declared by a cell's class list.
    ///
    /// Classes match by exact token. `nextday` wins over `time` since
    /// next-day cells carry both.
    pub fn from_classes(class_attr: &str) -> Option<Self> {
        let has = |name: &str| class_attr.split_ascii_whitespace().any(|c| c == name);
        if has("nextday") {
            Some(Field::NextDayTime)
        } else if has("time") {
            Some(Field::Time)
        } else if has("tppjdh") {
            Some(Field::Direction)
        } else if has("tppjln-short") {
            Some(Field::LineLabel)
        } else {
            None
        }
    }

    /// Innermost open tags required for text to count toward this field.
    pub fn context(self) -> &'static [&'static str] {
        match self {
            Field::Time | Field::NextDayTime => &["td"],
            Field::Direction => &["tr", "td"],
            Field::LineLabel => &["td", "div", "div"],
        }
    }

    fn accepts(self, stack: &[String]) -> bool {
        let shape = self.context();
        stack.len() >= shape.len()
            && stack[stack.len() - shape.len()..]
                .iter()
                .zip(shape)
                .all(|(open, want)| open == want)
    }
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"background(?:-color)?\s*:\s*(#[0-9a-fA-F]{6})").unwrap())
}

fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

/// Elements that never have content or an end tag.
fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Tokenizer state for elements whose content is not markup.
fn raw_text_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// A row being accumulated.
#[derive(Debug, Default)]
struct RowBuilder {
    label: Option<String>,
    direction: Option<String>,
    color: Option<String>,
    departures: Vec<Departure>,
}

/// Streaming extractor state.
///
/// Feed tags and character data in document order, then call
/// [`finish`](Self::finish). Adjacent character data is joined before it
/// reaches a field.
#[derive(Debug, Default)]
pub struct ScheduleExtractor {
    stack: Vec<String>,
    text: String,
    field: Option<Field>,
    row: Option<RowBuilder>,
    lines: Vec<BusLine>,
    dropped_rows: usize,
}

impl ScheduleExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, tag: &Tag) {
        self.flush_text();
        match tag.kind {
            TagKind::StartTag => {
                self.start_tag(&tag.name, &tag.attrs);
                if tag.self_closing || is_void_element(&tag.name) {
                    self.end_tag(&tag.name);
                }
            }
            TagKind::EndTag => self.end_tag(&tag.name),
        }
    }

    pub fn characters(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Lines completed so far, in document order.
    ///
    /// An unclosed trailing row is discarded.
    pub fn finish(mut self) -> Vec<BusLine> {
        self.flush_text();
        if self.dropped_rows > 0 {
            debug!(
                dropped = self.dropped_rows,
                "schedule rows without a line label to inherit"
            );
        }
        self.lines
    }

    fn start_tag(&mut self, name: &str, attrs: &[Attribute]) {
        self.stack.push(name.to_string());

        match name {
            "tr" => self.row = Some(RowBuilder::default()),
            "td" => self.field = attr(attrs, "class").and_then(Field::from_classes),
            "div" => {
                let color = attr(attrs, "style")
                    .and_then(|style| color_pattern().captures(style))
                    .map(|caps| caps[1].to_string());
                if let (Some(color), Some(row)) = (color, self.row.as_mut()) {
                    row.color = Some(color);
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        // Close back to the matching open tag; ignore unmatched end tags.
        let Some(depth) = self.stack.iter().rposition(|open| open == name) else {
            return;
        };
        self.stack.truncate(depth);

        match name {
            "td" => self.field = None,
            "tr" => self.close_row(),
            _ => {}
        }
    }

    fn flush_text(&mut self) {
        let pending = std::mem::take(&mut self.text);
        let text = pending.trim();
        if text.is_empty() {
            return;
        }
        let (Some(field), Some(row)) = (self.field, self.row.as_mut()) else {
            return;
        };
        if !field.accepts(&self.stack) {
            return;
        }

        match field {
            Field::Time | Field::NextDayTime => {
                if let Some(dep) = Departure::find_in(text, field == Field::NextDayTime) {
                    row.departures.push(dep);
                }
            }
            Field::Direction => row.direction = Some(text.to_string()),
            Field::LineLabel => row.label = Some(text.to_string()),
        }
    }

    fn close_row(&mut self) {
        self.field = None;
        let Some(row) = self.row.take() else {
            return;
        };

        let (label, color) = match row.label {
            Some(label) => (label, row.color),
            None => match self.lines.last() {
                Some(prev) => (prev.label.clone(), prev.color.clone()),
                None => {
                    self.dropped_rows += 1;
                    return;
                }
            },
        };

        self.lines.push(BusLine {
            label,
            direction: row.direction,
            color,
            departures: row.departures,
        });
    }
}

/// Routes tokenizer output into a [`ScheduleExtractor`].
#[derive(Default)]
struct ExtractorSink {
    extractor: RefCell<ScheduleExtractor>,
}

impl TokenSink for ExtractorSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let mut extractor = self.extractor.borrow_mut();
        match token {
            Token::TagToken(tag) => {
                extractor.tag(&tag);
                if tag.kind == TagKind::StartTag && !tag.self_closing {
                    if let Some(kind) = raw_text_kind(&tag.name) {
                        return TokenSinkResult::RawData(kind);
                    }
                }
            }
            Token::CharacterTokens(text) => extractor.characters(&text),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Extract bus lines from a schedule table fragment.
pub fn extract_lines(fragment: &str) -> Vec<BusLine> {
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(fragment));

    let tokenizer = Tokenizer::new(ExtractorSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    tokenizer.sink.extractor.take().finish()
}

/// The schedule table on a place page, from its anchor through `</table>`.
pub fn schedule_fragment(page: &str) -> Option<&str> {
    let start = page.find(TABLE_ANCHOR)?;
    let end = page[start..]
        .find(TABLE_END)
        .map_or(page.len(), |i| start + i + TABLE_END.len());
    Some(&page[start..end])
}

/// Extract bus lines from a full place page.
///
/// A page without a schedule table yields no lines.
pub fn extract_schedule(page: &str) -> Vec<BusLine> {
    match schedule_fragment(page) {
        Some(fragment) => extract_lines(fragment),
        None => {
            warn!(len = page.len(), "place page has no schedule table");
            Vec::new()
        }
    }
}
