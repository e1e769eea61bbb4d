// src/sourcemap.rs

//! Minimal source map (revision 3) builder.
//!
//! The script and style tasks only ever move, drop or rewrite whole lines,
//! so a line-granular map is sufficient: each output line carries at most
//! one segment pointing at column 0 of its origin line. Mappings use the
//! standard base64 VLQ encoding.

use std::path::Path;

/// Records, per output line, which source file and line it came from.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    /// One entry per output line: `Some((source index, source line))` or
    /// `None` for generated lines with no origin.
    lines: Vec<Option<(usize, u32)>>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file, returning its index. Repeated registration
    /// of the same name returns the existing index.
    pub fn add_source(&mut self, name: &str) -> usize {
        if let Some(idx) = self.sources.iter().position(|s| s == name) {
            return idx;
        }
        self.sources.push(name.to_string());
        self.sources.len() - 1
    }

    /// Append an output line mapped to `(source, line)` (both zero-based).
    pub fn push_mapped(&mut self, source: usize, line: u32) {
        self.lines.push(Some((source, line)));
    }

    /// Append an output line with no origin.
    pub fn push_unmapped(&mut self) {
        self.lines.push(None);
    }

    /// Render the map as JSON. `file` is the generated file's name.
    pub fn build(&self, file: &str) -> String {
        let mut mappings = String::new();
        let mut prev_source: i64 = 0;
        let mut prev_line: i64 = 0;
        let mut first_segment = true;

        for (i, entry) in self.lines.iter().enumerate() {
            if i > 0 {
                mappings.push(';');
            }
            let Some((source, line)) = entry else { continue };
            // Segment: [generated column, source index, source line, source column].
            // Generated column is always 0 and resets per line; the others are
            // deltas against the previous segment.
            encode_vlq(0, &mut mappings);
            if first_segment {
                encode_vlq(*source as i64, &mut mappings);
                encode_vlq(*line as i64, &mut mappings);
                first_segment = false;
            } else {
                encode_vlq(*source as i64 - prev_source, &mut mappings);
                encode_vlq(*line as i64 - prev_line, &mut mappings);
            }
            encode_vlq(0, &mut mappings);
            prev_source = *source as i64;
            prev_line = *line as i64;
        }

        serde_json::json!({
            "version": 3,
            "file": file,
            "sources": self.sources,
            "names": [],
            "mappings": mappings,
        })
        .to_string()
    }
}

/// Footer comment pointing a generated JS file at its map.
pub fn js_footer(map_name: &str) -> String {
    format!("//# sourceMappingURL={map_name}\n")
}

/// Footer comment pointing a generated CSS file at its map.
pub fn css_footer(map_name: &str) -> String {
    format!("/*# sourceMappingURL={map_name} */\n")
}

/// Display name for a source path inside a map: root-relative with forward
/// slashes where possible, the bare file name otherwise.
pub fn source_name(root: &Path, path: &Path) -> String {
    crate::fsx::relative_str(root, path).unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(value: i64, out: &mut String) {
    let mut v: u64 = if value < 0 {
        (((-value) as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (v & 0b1_1111) as usize;
        v >>= 5;
        if v > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if v == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(v: i64) -> String {
        let mut s = String::new();
        encode_vlq(v, &mut s);
        s
    }

    #[test]
    fn vlq_known_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(123), "2H");
    }

    #[test]
    fn identity_map_of_three_lines() {
        let mut b = SourceMapBuilder::new();
        let src = b.add_source("main.js");
        b.push_mapped(src, 0);
        b.push_mapped(src, 1);
        b.push_mapped(src, 2);
        let json = b.build("main.js");
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["version"], 3);
        assert_eq!(v["sources"][0], "main.js");
        assert_eq!(v["mappings"], "AAAA;AACA;AACA");
    }

    #[test]
    fn dropped_line_leaves_empty_group() {
        let mut b = SourceMapBuilder::new();
        let src = b.add_source("main.js");
        b.push_mapped(src, 0);
        b.push_unmapped();
        b.push_mapped(src, 2);
        let json = b.build("main.js");
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["mappings"], "AAAA;;AAEA");
    }
}
