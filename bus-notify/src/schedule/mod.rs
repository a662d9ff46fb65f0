//! Schedule table extraction from place pages.
//!
//! The place page is HTML with one table (class `tppjt`) listing every line
//! serving the stop. Extraction is a single pass of html5ever's tokenizer
//! over that table: no DOM is built and nothing is backtracked.
//! Unrecognized cells and malformed times are skipped, so extraction never
//! fails outright.

mod extract;


pub use extract::{
    Field, ScheduleExtractor, TABLE_ANCHOR, extract_lines, extract_schedule, schedule_fragment,
};
