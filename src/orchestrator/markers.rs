// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Incremental detection of marked fragments in a streamed reply.
//!
//! The scanner only looks at text it has not examined yet; a marker split across two deltas is
//! found once its last byte arrives. Consumed text is dropped so the buffer stays small on long
//! replies.

use std::ops::Range;

/// Start/end spelling of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    start: String,
    end: String,
    /// The start marker only counts when followed by whitespace, `>` or `/` (tag names).
    delimited: bool,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self { start: start.into(), end: end.into(), delimited: false }
    }

    /// `<name ...>` up to `</name>`.
    pub fn tag(name: &str) -> Self {
        Self { start: format!("<{name}"), end: format!("</{name}>"), delimited: true }
    }

    /// A fenced code block tagged `lang`.
    pub fn fence(lang: &str) -> Self {
        Self::new(format!("```{lang}"), "```")
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

/// A complete fragment, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedFragment {
    pub text: String,
    /// Byte range of `text` within the whole stream.
    pub span: Range<usize>,
    start_len: usize,
    end_len: usize,
}

impl MarkedFragment {
    /// Text between the markers.
    pub fn inner(&self) -> &str {
        &self.text[self.start_len..self.text.len() - self.end_len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    AwaitingMarker,
    Accumulating,
    Ended,
}

enum StartMatch {
    Found(usize),
    /// A possible marker begins here but the deciding bytes have not arrived.
    Pending(usize),
    Absent,
}

#[derive(Debug, Clone)]
pub struct MarkerScanner {
    markers: MarkerPair,
    buffer: String,
    /// Stream offset of `buffer[0]`.
    base: usize,
    /// Next buffer index to examine.
    cursor: usize,
    fragment_start: usize,
    state: ScanState,
}

impl MarkerScanner {
    pub fn new(markers: MarkerPair) -> Self {
        Self {
            markers,
            buffer: String::new(),
            base: 0,
            cursor: 0,
            fragment_start: 0,
            state: ScanState::AwaitingMarker,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Bytes currently retained.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one delta and returns every fragment it completed.
    pub fn push(&mut self, delta: &str) -> Vec<MarkedFragment> {
        if self.state == ScanState::Ended {
            return Vec::new();
        }
        self.buffer.push_str(delta);

        let mut fragments = Vec::new();
        loop {
            match self.state {
                ScanState::AwaitingMarker => match self.find_start() {
                    StartMatch::Found(position) => {
                        self.fragment_start = position;
                        self.cursor = position + self.markers.start.len();
                        self.state = ScanState::Accumulating;
                    }
                    StartMatch::Pending(position) => {
                        self.cursor = position;
                        break;
                    }
                    StartMatch::Absent => {
                        self.cursor = self.buffer.len();
                        break;
                    }
                },
                ScanState::Accumulating => {
                    let Some(found) = self.buffer[self.cursor..].find(&self.markers.end) else {
                        let keep = self.markers.end.len().saturating_sub(1);
                        let floor = self.fragment_start + self.markers.start.len();
                        self.cursor = self.floor_boundary(self.buffer.len().saturating_sub(keep).max(floor));
                        break;
                    };
                    let end = self.cursor + found + self.markers.end.len();
                    fragments.push(MarkedFragment {
                        text: self.buffer[self.fragment_start..end].to_owned(),
                        span: self.base + self.fragment_start..self.base + end,
                        start_len: self.markers.start.len(),
                        end_len: self.markers.end.len(),
                    });
                    self.cursor = end;
                    self.state = ScanState::AwaitingMarker;
                }
                ScanState::Ended => break,
            }
        }
        self.compact();
        fragments
    }

    /// Ends the stream. Returns the unfinished fragment, if one was open; it is discarded.
    pub fn finish(&mut self) -> Option<String> {
        let partial = (self.state == ScanState::Accumulating)
            .then(|| self.buffer[self.fragment_start..].to_owned());
        self.state = ScanState::Ended;
        self.buffer.clear();
        partial
    }

    fn find_start(&self) -> StartMatch {
        let start = self.markers.start.as_str();
        let mut from = self.cursor;
        while let Some(found) = self.buffer[from..].find(start) {
            let position = from + found;
            let after = position + start.len();
            if !self.markers.delimited {
                return StartMatch::Found(position);
            }
            match self.buffer[after..].chars().next() {
                None => return StartMatch::Pending(position),
                Some(ch) if ch.is_whitespace() || ch == '>' || ch == '/' => {
                    return StartMatch::Found(position);
                }
                Some(_) => from = position + 1,
            }
        }

        // A prefix of the marker at the very end may still complete.
        for len in (1..start.len()).rev() {
            let Some(position) = self.buffer.len().checked_sub(len) else {
                continue;
            };
            if position >= from
                && self.buffer.is_char_boundary(position)
                && start.starts_with(&self.buffer[position..])
            {
                return StartMatch::Pending(position);
            }
        }
        StartMatch::Absent
    }

    fn floor_boundary(&self, mut index: usize) -> usize {
        while index > 0 && !self.buffer.is_char_boundary(index) {
            index -= 1;
        }
        index
    }

    fn compact(&mut self) {
        let keep_from = match self.state {
            ScanState::Accumulating => self.fragment_start,
            ScanState::AwaitingMarker | ScanState::Ended => self.cursor,
        };
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.base += keep_from;
        self.cursor -= keep_from;
        self.fragment_start = self.fragment_start.saturating_sub(keep_from);
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerPair, MarkerScanner, ScanState};

    fn feed(scanner: &mut MarkerScanner, deltas: &[&str]) -> Vec<String> {
        deltas
            .iter()
            .flat_map(|delta| scanner.push(delta))
            .map(|fragment| fragment.text)
            .collect()
    }

    #[test]
    fn marker_that_never_arrives_yields_nothing_and_keeps_little() {
        let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
        let prose = "I considered several layouts but will not draw anything today. ";
        for _ in 0..50 {
            assert!(scanner.push(prose).is_empty());
        }
        assert!(scanner.buffered() < prose.len());
        assert_eq!(scanner.state(), ScanState::AwaitingMarker);
        assert_eq!(scanner.finish(), None);
    }

    #[test]
    fn markers_split_across_deltas_are_found() {
        let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
        let fragments = feed(&mut scanner, &["Analysis first. <mx", "fi", "le host=\"x\"><diagram/></mx", "file", ">tail"]);
        assert_eq!(fragments, [r#"<mxfile host="x"><diagram/></mxfile>"#]);
        assert_eq!(scanner.state(), ScanState::AwaitingMarker);
    }

    #[test]
    fn undelimited_lookalikes_are_skipped() {
        let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
        let fragments = feed(&mut scanner, &["see <mxfiles> and <mxfile", ">", "</mxfile>"]);
        assert_eq!(fragments, ["<mxfile></mxfile>"]);
    }

    #[test]
    fn multiple_fragments_in_one_stream() {
        let mut scanner = MarkerScanner::new(MarkerPair::fence("xml"));
        let fragments =
            feed(&mut scanner, &["a ```xml\n<a id=\"1\"/>\n``` b ``", "`xml\n<b id=\"2\"/>\n`", "``"]);
        assert_eq!(fragments, ["```xml\n<a id=\"1\"/>\n```", "```xml\n<b id=\"2\"/>\n```"]);
    }

    #[test]
    fn spans_and_inner_text_refer_to_the_whole_stream() {
        let mut scanner = MarkerScanner::new(MarkerPair::fence("xml"));
        let mut fragments = Vec::new();
        for delta in ["0123456789", "```xml<x/>", "```"] {
            fragments.extend(scanner.push(delta));
        }
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].span, 10..23);
        assert_eq!(fragments[0].inner(), "<x/>");
    }

    #[test]
    fn partial_fragment_is_returned_on_finish_and_scanning_stops() {
        let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
        assert!(scanner.push("<mxfile><diagram>").is_empty());
        assert_eq!(scanner.state(), ScanState::Accumulating);
        assert_eq!(scanner.finish().as_deref(), Some("<mxfile><diagram>"));
        assert_eq!(scanner.state(), ScanState::Ended);
        assert!(scanner.push("</diagram></mxfile>").is_empty());
    }

    #[test]
    fn multibyte_text_around_markers() {
        let mut scanner = MarkerScanner::new(MarkerPair::tag("mxfile"));
        let fragments = feed(&mut scanner, &["分析：", "<mxfile>图", "</mxf", "ile>完成"]);
        assert_eq!(fragments, ["<mxfile>图</mxfile>"]);
    }
}
