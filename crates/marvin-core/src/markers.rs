//! Incremental directive parsing
//!
//! Streamed assistant text may embed `[CHART:<title>]` and `[ARTIFACT:<id>]`
//! directives, possibly split across any number of chunks. [`MarkerParser`]
//! accumulates the text, resolves each complete directive exactly once, and
//! keeps a display rendering with every complete directive removed.
//!
//! Each directive kind is matched by its own pattern with its own scan
//! cursor, so a malformed tag of one kind never hides a complete tag of the
//! other; spans of different kinds may overlap and the display text drops
//! their union. Per pattern, matches are non-overlapping, leftmost-first and
//! never span a newline, so neither the end of the last match nor a newline
//! can be crossed by a future match of that kind and the cursor moves past
//! both. The result is identical to rerunning both patterns over the whole
//! buffer after every chunk.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::chart::ChartDescriptor;

// Tag keywords are case-insensitive, parameters are taken verbatim.
const CHART_PATTERN: &str = r"\[(?i:chart):(.*?)\]";
const ARTIFACT_PATTERN: &str = r"\[(?i:artifact):(.*?)\]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Chart,
    Artifact,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 2] = [DirectiveKind::Chart, DirectiveKind::Artifact];

    fn regex(self) -> &'static Regex {
        static CHART: OnceLock<Regex> = OnceLock::new();
        static ARTIFACT: OnceLock<Regex> = OnceLock::new();
        let (cell, pattern) = match self {
            DirectiveKind::Chart => (&CHART, CHART_PATTERN),
            DirectiveKind::Artifact => (&ARTIFACT, ARTIFACT_PATTERN),
        };
        cell.get_or_init(|| Regex::new(pattern).expect("directive pattern compiles"))
    }

    fn slot(self) -> usize {
        match self {
            DirectiveKind::Chart => 0,
            DirectiveKind::Artifact => 1,
        }
    }
}

/// A directive as found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMarker {
    pub kind: DirectiveKind,
    pub parameter: String,
    /// Byte range of the whole directive in the accumulated text
    pub span: Range<usize>,
}

/// UI side effect requested by a directive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Directive {
    RenderChart(ChartDescriptor),
    OpenArtifact { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub marker: DirectiveMarker,
    pub directive: Directive,
}

/// Result of feeding one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkUpdate {
    pub display_text: String,
    pub resolved: Vec<Resolution>,
}

#[derive(Debug, Default)]
pub struct MarkerParser {
    full: String,
    /// Display rendering of `full[..clean_to]`
    clean: String,
    clean_to: usize,
    /// Per kind: no future match of that kind starts before this offset
    scan_from: [usize; 2],
    /// Every matched span, ordered by start
    spans: Vec<Range<usize>>,
    resolved: Vec<Resolution>,
    charts: usize,
}

impl MarkerParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded token and resolve any directive it completes.
    pub fn on_chunk(&mut self, token: &str) -> ChunkUpdate {
        self.full.push_str(token);
        let resolved = self.scan();
        ChunkUpdate {
            display_text: self.display_text(),
            resolved,
        }
    }

    /// Bring the parser in line with a fully assembled text.
    ///
    /// Text that extends what was already seen only resolves the new
    /// directives; re-feeding the same text resolves nothing. Unrelated text
    /// starts a fresh turn.
    pub fn sync(&mut self, text: &str) -> ChunkUpdate {
        if !text.starts_with(self.full.as_str()) {
            *self = Self::new();
        }
        let suffix = &text[self.full.len()..];
        self.on_chunk(suffix)
    }

    fn scan(&mut self) -> Vec<Resolution> {
        let mut markers = Vec::new();

        // Cursors only move forward past matched spans, so every match
        // found here is new.
        for kind in DirectiveKind::ALL {
            let from = self.scan_from[kind.slot()];
            let mut cursor = from;
            for caps in kind.regex().captures_iter(&self.full[from..]) {
                let Some(whole) = caps.get(0) else { continue };
                cursor = from + whole.end();
                markers.push(DirectiveMarker {
                    kind,
                    parameter: caps[1].to_string(),
                    span: from + whole.start()..cursor,
                });
            }
            self.scan_from[kind.slot()] = match self.full[cursor..].rfind('\n') {
                Some(i) => cursor + i + 1,
                None => cursor,
            };
        }
        markers.sort_by_key(|m| m.span.start);

        let mut fresh = Vec::with_capacity(markers.len());
        for marker in markers {
            let at = self.spans.partition_point(|s| s.start < marker.span.start);
            self.spans.insert(at, marker.span.clone());

            if marker.kind == DirectiveKind::Chart {
                self.charts += 1;
            }
            let directive = resolve(&marker, self.charts);
            debug!(kind = ?marker.kind, parameter = %marker.parameter, "resolved directive");
            fresh.push(Resolution { marker, directive });
        }
        self.resolved.extend(fresh.iter().cloned());

        let settled_to = self.scan_from[0].min(self.scan_from[1]);
        let settled = self.strip(self.clean_to..settled_to);
        self.clean.push_str(&settled);
        self.clean_to = settled_to;

        fresh
    }

    /// `full[range]` with every matched span cut out
    fn strip(&self, range: Range<usize>) -> String {
        let mut text = String::new();
        let mut pos = range.start;
        for span in &self.spans {
            if span.start >= range.end {
                break;
            }
            if span.end <= pos {
                continue;
            }
            if span.start > pos {
                text.push_str(&self.full[pos..span.start]);
            }
            pos = span.end;
        }
        if pos < range.end {
            text.push_str(&self.full[pos..range.end]);
        }
        text
    }

    pub fn full_text(&self) -> &str {
        &self.full
    }

    /// Accumulated text with every complete directive removed.
    ///
    /// An unterminated directive at the tail stays visible until it closes.
    pub fn display_text(&self) -> String {
        let mut text = self.clean.clone();
        text.push_str(&self.strip(self.clean_to..self.full.len()));
        text
    }

    /// Prefix of the display text that later chunks cannot change
    pub fn settled_text(&self) -> String {
        let stable = self.full[self.clean_to..]
            .find('[')
            .map_or(self.full.len(), |i| self.clean_to + i);
        let mut text = self.clean.clone();
        text.push_str(&self.strip(self.clean_to..stable));
        text
    }

    /// Every directive resolved so far, in text order
    pub fn resolved(&self) -> &[Resolution] {
        &self.resolved
    }
}

fn resolve(marker: &DirectiveMarker, chart_seq: usize) -> Directive {
    match marker.kind {
        DirectiveKind::Chart => {
            let id = format!("chart-{}-{}", chrono::Utc::now().timestamp_millis(), chart_seq);
            Directive::RenderChart(ChartDescriptor::from_title(id, &marker.parameter))
        }
        DirectiveKind::Artifact => {
            // Millisecond timestamps can collide for two empty ids in one instant.
            let id = if marker.parameter.is_empty() {
                chrono::Utc::now().timestamp_millis().to_string()
            } else {
                marker.parameter.clone()
            };
            Directive::OpenArtifact { id }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::reply::{select_reply, tokenize};
    use proptest::prelude::*;

    fn feed_reply(question: &str) -> (MarkerParser, Vec<Resolution>, &'static str) {
        let (_, reply) = select_reply(question);
        let mut parser = MarkerParser::new();
        let mut resolved = Vec::new();
        for token in tokenize(reply) {
            resolved.extend(parser.on_chunk(&format!("{token} ")).resolved);
        }
        (parser, resolved, reply)
    }

    #[test]
    fn test_revenue_reply_resolves_line_chart_and_artifact() {
        let (parser, resolved, _) = feed_reply("Why did revenue fall?");
        assert_eq!(resolved.len(), 2);

        match &resolved[0].directive {
            Directive::RenderChart(chart) => {
                assert_eq!(chart.kind, ChartKind::Line);
                assert_eq!(chart.title, "Revenue Trend");
                assert_eq!(chart.len(), 7);
            }
            other => panic!("expected chart, got {other:?}"),
        }
        assert_eq!(
            resolved[1].directive,
            Directive::OpenArtifact { id: "revenue-analysis".to_string() }
        );

        let display = parser.display_text();
        assert!(!display.contains("[CHART:"));
        assert!(!display.contains("[ARTIFACT:"));
        assert!(display.contains("~10%)\n\n\n\nI've prepared"));
    }

    #[test]
    fn test_campaign_reply_resolves_bar_chart() {
        let (_, resolved, _) = feed_reply("Tell me about the marketing campaign");
        assert_eq!(resolved.len(), 1);
        assert!(matches!(
            &resolved[0].directive,
            Directive::RenderChart(chart) if chart.kind == ChartKind::Bar && chart.title == "Campaign Performance"
        ));
    }

    #[test]
    fn test_plain_reply_passes_through() {
        let (parser, resolved, reply) = feed_reply("hello");
        assert!(resolved.is_empty());
        assert_eq!(parser.display_text(), format!("{reply} "));
    }

    #[test]
    fn test_partial_marker_stays_visible_until_closed() {
        let mut parser = MarkerParser::new();
        let update = parser.on_chunk("See [CHART:Reve");
        assert!(update.resolved.is_empty());
        assert_eq!(update.display_text, "See [CHART:Reve");
        assert_eq!(parser.settled_text(), "See ");

        let update = parser.on_chunk("nue Trend] now");
        assert_eq!(update.resolved.len(), 1);
        assert_eq!(update.display_text, "See  now");
        assert_eq!(update.resolved[0].marker.span, 4..25);
    }

    #[test]
    fn test_resync_does_not_reemit() {
        let (mut parser, resolved, _) = feed_reply("Why did revenue fall?");
        assert_eq!(resolved.len(), 2);
        let full = parser.full_text().to_string();

        let update = parser.sync(&full);
        assert!(update.resolved.is_empty());
        assert_eq!(parser.resolved().len(), 2);

        let mut fresh = MarkerParser::new();
        assert_eq!(fresh.sync(&full).resolved.len(), 2);
        assert!(fresh.sync(&full).resolved.is_empty());
    }

    #[test]
    fn test_sync_with_unrelated_text_restarts() {
        let mut parser = MarkerParser::new();
        parser.on_chunk("[CHART:Revenue]");
        let update = parser.sync("other [ARTIFACT:x]");
        assert_eq!(update.resolved.len(), 1);
        assert_eq!(update.display_text, "other ");
        assert_eq!(parser.resolved().len(), 1);
    }

    #[test]
    fn test_tag_is_case_insensitive() {
        let mut parser = MarkerParser::new();
        let update = parser.on_chunk("[chart:Sales Mix] [Artifact:Q3-Report]");
        assert_eq!(update.resolved.len(), 2);
        assert_eq!(update.resolved[0].marker.kind, DirectiveKind::Chart);
        assert_eq!(update.resolved[1].marker.parameter, "Q3-Report");
        assert_eq!(update.display_text, " ");
    }

    #[test]
    fn test_empty_artifact_id_gets_placeholder() {
        let mut parser = MarkerParser::new();
        let update = parser.on_chunk("[ARTIFACT:]");
        match &update.resolved[0].directive {
            Directive::OpenArtifact { id } => {
                assert!(!id.is_empty());
                assert!(id.chars().all(|c| c.is_ascii_digit()));
            }
            other => panic!("expected artifact, got {other:?}"),
        }
    }

    #[test]
    fn test_markers_do_not_cross_newlines() {
        let mut parser = MarkerParser::new();
        let update = parser.on_chunk("[CHART:broken\nstill broken] [CHART:ok]");
        assert_eq!(update.resolved.len(), 1);
        assert_eq!(update.resolved[0].marker.parameter, "ok");
        assert_eq!(update.display_text, "[CHART:broken\nstill broken] ");
    }

    #[test]
    fn test_unterminated_tag_mixed_with_another() {
        let mut parser = MarkerParser::new();
        let update = parser.on_chunk("[CHART:a [ARTIFACT:b] tail");
        assert_eq!(update.resolved.len(), 2);
        assert_eq!(update.resolved[0].marker.kind, DirectiveKind::Chart);
        assert_eq!(update.resolved[0].marker.parameter, "a [ARTIFACT:b");
        assert_eq!(update.resolved[1].directive, Directive::OpenArtifact { id: "b".to_string() });
        assert_eq!(update.display_text, " tail");
    }

    #[test]
    fn test_malformed_artifact_does_not_hide_chart() {
        let mut parser = MarkerParser::new();
        parser.on_chunk("[ARTIFACT:x ");
        let update = parser.on_chunk("[CHART:Revenue] tail");

        assert_eq!(update.resolved.len(), 2);
        assert_eq!(update.resolved[0].marker.parameter, "x [CHART:Revenue");
        assert_eq!(update.resolved[1].marker.span, 12..27);
        assert!(matches!(
            &update.resolved[1].directive,
            Directive::RenderChart(chart) if chart.kind == ChartKind::Line && chart.title == "Revenue"
        ));
        assert_eq!(update.display_text, " tail");
        assert_eq!(parser.settled_text(), " tail");
    }

    #[test]
    fn test_resolved_once_across_later_chunks() {
        let mut parser = MarkerParser::new();
        assert_eq!(parser.on_chunk("[CHART:Revenue]").resolved.len(), 1);
        for chunk in ["", " more", "\n", "[ARTIFACT:", "r1]"] {
            let update = parser.on_chunk(chunk);
            assert!(update.resolved.iter().all(|r| r.marker.kind == DirectiveKind::Artifact));
        }
        assert_eq!(parser.resolved().len(), 2);
        assert_eq!(parser.display_text(), " more\n");
    }

    fn fragment() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "[CHART:", "[chart:", "[ARTIFACT:", "[artifact:", "]", "[", "\n", "Revenue", " ", "x", "é",
        ])
    }

    proptest! {
        #[test]
        fn prop_matches_full_rescan(parts in prop::collection::vec(fragment(), 0..40), cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6)) {
            let text: String = parts.concat();
            let mut points: Vec<usize> = cuts
                .iter()
                .map(|c| c.index(text.len() + 1))
                .filter(|&i| text.is_char_boundary(i))
                .collect();
            points.push(0);
            points.push(text.len());
            points.sort_unstable();
            points.dedup();

            let mut parser = MarkerParser::new();
            let mut count = 0;
            for pair in points.windows(2) {
                count += parser.on_chunk(&text[pair[0]..pair[1]]).resolved.len();
            }

            let mut expected: Vec<(DirectiveKind, Range<usize>)> = DirectiveKind::ALL
                .iter()
                .flat_map(|&kind| kind.regex().find_iter(&text).map(move |m| (kind, m.range())))
                .collect();
            expected.sort_by_key(|(_, span)| span.start);
            let display: String = text
                .char_indices()
                .filter(|(i, _)| !expected.iter().any(|(_, span)| span.contains(i)))
                .map(|(_, c)| c)
                .collect();

            prop_assert_eq!(count, expected.len());
            prop_assert_eq!(parser.display_text(), display);
            prop_assert!(parser.display_text().starts_with(&parser.settled_text()));
            let found: Vec<(DirectiveKind, Range<usize>)> = parser
                .resolved()
                .iter()
                .map(|r| (r.marker.kind, r.marker.span.clone()))
                .collect();
            prop_assert_eq!(found, expected);
        }
    }
}
