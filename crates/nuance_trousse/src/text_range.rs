//! Byte ranges into authored stylesheet text.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into the stylesheet source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_string(&TextRange::new(1, 5)).unwrap();
        assert_eq!(json, r#"{"start":1,"end":5}"#);
    }
}
