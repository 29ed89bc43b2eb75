//! Segment and part file names.
//!
//! A whole segment is `<id base36>.m4s`, an individual LL-HLS part is
//! `<id base36>.<part index>.m4s`.

use std::fmt;

/// File extension shared by segments and parts.
pub const EXTENSION: &str = "m4s";

/// A parsed segment or part file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentName {
    /// Segment id.
    pub id: u64,
    /// Part index, or `None` for the whole segment.
    pub part: Option<u32>,
}

impl SegmentName {
    pub fn segment(id: u64) -> Self {
        Self { id, part: None }
    }

    pub fn part(id: u64, part: u32) -> Self {
        Self {
            id,
            part: Some(part),
        }
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            Some(part) => write!(f, "{}.{}.{}", format_base36(self.id), part, EXTENSION),
            None => write!(f, "{}.{}", format_base36(self.id), EXTENSION),
        }
    }
}

/// Format `id` in lowercase base 36.
pub fn format_base36(mut id: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if id == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while id > 0 {
        out.push(DIGITS[(id % 36) as usize]);
        id /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// File name of a whole segment.
pub fn segment_name(id: u64) -> String {
    SegmentName::segment(id).to_string()
}

/// File name of one part of a segment.
pub fn part_name(id: u64, part: u32) -> String {
    SegmentName::part(id, part).to_string()
}

/// Parse a name produced by [`segment_name`] or [`part_name`].
pub fn parse_name(name: &str) -> Option<SegmentName> {
    let components: Vec<&str> = name.split('.').collect();
    if !(2..=3).contains(&components.len()) || components[components.len() - 1] != EXTENSION {
        return None;
    }
    let id = u64::from_str_radix(components[0], 36).ok()?;
    let part = match components.len() {
        3 => Some(components[1].parse::<u32>().ok()?),
        _ => None,
    };
    Some(SegmentName { id, part })
}
