use std::borrow::Cow;

use pcload_datastore::SourceRow;

use crate::errors::InvalidDisplayCap;

/// How many characters of text a record keeps unless told otherwise.
pub const DEFAULT_DISPLAY_CAP: usize = 50;

/// Caps below this leave no room for text next to the ellipsis.
pub const MIN_DISPLAY_CAP: usize = 3;

pub const ELLIPSIS: char = '\u{2026}';

/// What the pipeline emits for each row: the id, and text which is at most the display cap long.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamRecord {
    pub id: i64,
    pub text: String,
}

impl StreamRecord {
    /// Field names, in the order they are serialized.
    pub const FIELDS: [&'static str; 2] = ["id", "text"];
}

/// Shorten `text` to at most `cap` characters.
///
/// Text of `cap` characters or fewer comes back as is.  Longer text keeps its first `cap - 1` characters followed by
/// [ELLIPSIS], for exactly `cap` characters in total.  Lengths are counted in Unicode scalar values, never bytes, so
/// multi-byte text is never split inside a character.
pub fn abbreviate(text: &str, cap: usize) -> Cow<'_, str> {
    if text.chars().nth(cap).is_none() {
        return Cow::Borrowed(text);
    }

    let mut shortened: String = text.chars().take(cap.saturating_sub(1)).collect();
    shortened.push(ELLIPSIS);
    Cow::Owned(shortened)
}

/// Turns source rows into stream records.
///
/// The mapping of a row depends on nothing but that row.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RecordMapper {
    display_cap: usize,
}

impl RecordMapper {
    pub fn new(display_cap: usize) -> Result<RecordMapper, InvalidDisplayCap> {
        if display_cap < MIN_DISPLAY_CAP {
            return Err(InvalidDisplayCap(display_cap));
        }

        Ok(RecordMapper { display_cap })
    }

    pub fn get_display_cap(&self) -> usize {
        self.display_cap
    }

    pub fn map_row(&self, row: SourceRow) -> StreamRecord {
        let shortened = match abbreviate(&row.text, self.display_cap) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };

        StreamRecord {
            id: row.id,
            text: shortened.unwrap_or(row.text),
        }
    }
}

impl Default for RecordMapper {
    fn default() -> RecordMapper {
        RecordMapper {
            display_cap: DEFAULT_DISPLAY_CAP,
        }
    }
}
