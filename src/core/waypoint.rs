//! Waypoints, local variables, and the alphabetical waypoint encoding

use crate::core::WaypointId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Map cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapCell {
    pub x: u16,
    pub y: u16,
}

impl MapCell {
    pub fn new(x: u16, y: u16) -> Self {
        MapCell { x, y }
    }
}

impl fmt::Display for MapCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub cell: MapCell,
}

impl Waypoint {
    pub fn new(id: u32, cell: MapCell) -> Self {
        Waypoint {
            id: WaypointId::new(id),
            cell,
        }
    }
}

/// A per-document named flag usable in scripted conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVariable {
    pub index: u32,
    pub name: String,
    pub initial: i32,
}

impl LocalVariable {
    pub fn new(index: u32, name: impl Into<String>, initial: i32) -> Self {
        LocalVariable {
            index,
            name: name.into(),
            initial,
        }
    }
}

/// Encode a waypoint number as letters: 0 = "A", 25 = "Z", 26 = "AA", 701 = "ZZ"
pub fn waypoint_to_alpha(n: u32) -> String {
    let mut n = n as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Decode the alphabetical form; `None` for anything but ASCII letters
pub fn alpha_to_waypoint(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || s.len() > 6 {
        return None;
    }
    let mut n: u64 = 0;
    for b in s.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        n = n * 26 + (b.to_ascii_uppercase() - b'A') as u64 + 1;
    }
    u32::try_from(n - 1).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_encoding_boundaries() {
        assert_eq!(waypoint_to_alpha(0), "A");
        assert_eq!(waypoint_to_alpha(25), "Z");
        assert_eq!(waypoint_to_alpha(26), "AA");
        assert_eq!(waypoint_to_alpha(27), "AB");
        assert_eq!(waypoint_to_alpha(701), "ZZ");
        assert_eq!(waypoint_to_alpha(702), "AAA");
    }

    #[test]
    fn test_alpha_decoding() {
        assert_eq!(alpha_to_waypoint("A"), Some(0));
        assert_eq!(alpha_to_waypoint("ab"), Some(27));
        assert_eq!(alpha_to_waypoint("ZZ"), Some(701));
        assert_eq!(alpha_to_waypoint("12"), None);
        assert_eq!(alpha_to_waypoint(""), None);
    }
}
