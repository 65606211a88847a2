//! README document model.
//!
//! A README is parsed into a preamble (title + intro), an ordered list of
//! level-2 sections and an optional footer. Block structure comes from
//! `pulldown-cmark`, so ATX and setext headings are both recognized and
//! heading-like lines inside code blocks, block quotes or lists are not.
//! Deeper headings stay inside the body of their enclosing section.

use std::fmt;
use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Section kinds
// ---------------------------------------------------------------------------

/// The ten required README sections, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionKind {
    Overview,
    Features,
    LiveDemo,
    SetupInstallation,
    Usage,
    TechnicalDetails,
    CodeStructure,
    Development,
    License,
    Author,
}

impl SectionKind {
    pub const ALL: [SectionKind; 10] = [
        SectionKind::Overview,
        SectionKind::Features,
        SectionKind::LiveDemo,
        SectionKind::SetupInstallation,
        SectionKind::Usage,
        SectionKind::TechnicalDetails,
        SectionKind::CodeStructure,
        SectionKind::Development,
        SectionKind::License,
        SectionKind::Author,
    ];

    /// Sections an update pass must leave byte-identical.
    pub const PROTECTED: [SectionKind; 3] = [
        SectionKind::License,
        SectionKind::SetupInstallation,
        SectionKind::Author,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Overview => "Overview",
            SectionKind::Features => "Features",
            SectionKind::LiveDemo => "Live Demo",
            SectionKind::SetupInstallation => "Setup & Installation",
            SectionKind::Usage => "Usage",
            SectionKind::TechnicalDetails => "Technical Details",
            SectionKind::CodeStructure => "Code Structure",
            SectionKind::Development => "Development",
            SectionKind::License => "License",
            SectionKind::Author => "Author",
        }
    }

    /// Position in the canonical order.
    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn is_protected(&self) -> bool {
        Self::PROTECTED.contains(self)
    }

    /// Whole words in a revision brief that lift this section's protection.
    pub fn exemption_keywords(&self) -> &'static [&'static str] {
        match self {
            SectionKind::License => &["license", "licence", "licensing", "licenses"],
            SectionKind::SetupInstallation => &["setup", "install", "installation", "installing"],
            SectionKind::Author => &["author", "authors", "authorship"],
            _ => &[],
        }
    }

    /// Does `brief` name this section? Matches whole words only, so
    /// "authorization" or "reinstall" do not count.
    pub fn is_named_in(&self, brief: &str) -> bool {
        let keywords = self.exemption_keywords();
        brief
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| keywords.iter().any(|kw| word.eq_ignore_ascii_case(kw)))
    }

    /// Resolve a heading (already normalized by [`normalize_heading`]).
    fn from_normalized(name: &str) -> Option<SectionKind> {
        let kind = match name {
            "overview" => SectionKind::Overview,
            "features" => SectionKind::Features,
            "live demo" | "demo" => SectionKind::LiveDemo,
            "setup and installation" | "installation" | "setup" | "getting started"
            | "installation and setup" => SectionKind::SetupInstallation,
            "usage" => SectionKind::Usage,
            "technical details" => SectionKind::TechnicalDetails,
            "code structure" | "project structure" => SectionKind::CodeStructure,
            "development" | "contributing" => SectionKind::Development,
            "license" | "licence" => SectionKind::License,
            "author" | "authors" => SectionKind::Author,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Identity of a level-2 section: one of the required kinds, or an addition
/// keyed by its normalized heading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    Known(SectionKind),
    Other(String),
}

impl SectionKey {
    pub fn from_heading(heading: &str) -> Self {
        let name = normalize_heading(heading);
        match SectionKind::from_normalized(&name) {
            Some(kind) => SectionKey::Known(kind),
            None => SectionKey::Other(name),
        }
    }

    pub fn kind(&self) -> Option<SectionKind> {
        match self {
            SectionKey::Known(kind) => Some(*kind),
            SectionKey::Other(_) => None,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKey::Known(kind) => kind.fmt(f),
            SectionKey::Other(name) => f.write_str(name),
        }
    }
}

/// Lowercase, drop leading emoji/punctuation and trailing punctuation,
/// treat `&` as `and`, collapse whitespace.
pub fn normalize_heading(heading: &str) -> String {
    let trimmed = heading
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| !c.is_alphanumeric());
    trimmed
        .to_lowercase()
        .replace('&', " and ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One level-2 section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: SectionKey,
    /// The heading as written, e.g. `## 📄 License`. A setext heading keeps
    /// both its text line and its underline.
    pub heading_line: String,
    /// Text between this heading and the next, byte for byte.
    pub body: String,
    /// 1-based line number of the heading.
    pub line: usize,
    /// Byte range of heading plus body in the parsed source.
    pub range: Range<usize>,
}

impl Section {
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Heading and body exactly as written, minus the blank lines that
    /// separate this section from whatever follows it. Protected sections are
    /// compared on this.
    pub fn content(&self) -> String {
        let mut out = String::with_capacity(self.heading_line.len() + self.body.len() + 1);
        out.push_str(&self.heading_line);
        out.push('\n');
        out.push_str(&self.body);
        let kept = out.trim_end_matches('\n').len();
        out.truncate(kept);
        out
    }
}

/// A heading that does not belong where it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrayHeading {
    pub line: usize,
    pub text: String,
}

/// A parsed README.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeDocument {
    /// Everything before the first level-2 heading.
    pub preamble: String,
    pub sections: Vec<Section>,
    /// Thematic break plus trailing text at the end of the last section.
    pub footer: Option<String>,
    /// Level-1 headings after the preamble and empty heading markers.
    pub stray_headings: Vec<StrayHeading>,
    source: String,
}

impl ReadmeDocument {
    /// Parse already-normalized Markdown. Never fails; structural problems are
    /// recorded for the reconciler to judge.
    pub fn parse(text: &str) -> Self {
        let blocks = scan_blocks(text);

        let mut stray_headings = Vec::new();
        let mut starts: Vec<(&HeadingMark, usize)> = Vec::new();
        for heading in &blocks.headings {
            let line = line_number(text, heading.span.start);
            if heading.title.is_empty() || (heading.level == HeadingLevel::H1 && !starts.is_empty()) {
                stray_headings.push(StrayHeading {
                    line,
                    text: text[heading.span.clone()].trim_end().to_string(),
                });
            } else if heading.level == HeadingLevel::H2 {
                starts.push((heading, line));
            }
        }

        let preamble_end = starts.first().map_or(text.len(), |(h, _)| h.span.start);
        let mut sections = Vec::with_capacity(starts.len());
        for (idx, (heading, line)) in starts.iter().enumerate() {
            let end = starts.get(idx + 1).map_or(text.len(), |(next, _)| next.span.start);
            sections.push(Section {
                key: SectionKey::from_heading(&heading.title),
                heading_line: text[heading.span.clone()].trim_end_matches('\n').to_string(),
                body: text[heading.span.end..end].to_string(),
                line: *line,
                range: heading.span.start..end,
            });
        }

        let footer = sections.last_mut().and_then(|last| split_footer(text, last, &blocks));

        ReadmeDocument {
            preamble: text[..preamble_end].to_string(),
            sections,
            footer,
            stray_headings,
            source: text.to_string(),
        }
    }

    /// The normalized text this document was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn into_string(self) -> String {
        self.source
    }

    /// First section resolving to `kind`.
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == SectionKey::Known(kind))
    }

    /// Required kinds in order of first appearance.
    pub fn known_kinds(&self) -> Vec<SectionKind> {
        let mut seen = Vec::new();
        for kind in self.sections.iter().filter_map(|s| s.key.kind()) {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        seen
    }
}

/// Normalize raw model output into README text.
///
/// CRLF → LF, strip a fence wrapping the whole document (```` ``` ```` or
/// ```` ```markdown ````), trim outer whitespace, end with exactly one newline.
/// Returns an empty string when nothing is left.
pub fn normalize_candidate(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let (info, body) = rest.split_once('\n').unwrap_or((rest, ""));
        let info = info.trim();
        if info.is_empty() || info.eq_ignore_ascii_case("markdown") || info.eq_ignore_ascii_case("md") {
            if let Some(inner) = body.trim_end().strip_suffix("```") {
                text = inner.trim();
            }
        }
    }

    if text.is_empty() {
        return String::new();
    }
    let mut out = text.to_string();
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Block scan
// ---------------------------------------------------------------------------

/// A top-level heading; `span` covers whole lines, trailing newline included.
#[derive(Debug)]
struct HeadingMark {
    level: HeadingLevel,
    title: String,
    span: Range<usize>,
}

/// Top-level headings and thematic breaks, in document order.
#[derive(Debug, Default)]
struct Blocks {
    headings: Vec<HeadingMark>,
    breaks: Vec<Range<usize>>,
}

fn scan_blocks(text: &str) -> Blocks {
    let mut blocks = Blocks::default();
    let mut depth = 0usize;
    let mut open: Option<HeadingMark> = None;

    for (event, range) in Parser::new(text).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) if depth == 0 => {
                open = Some(HeadingMark {
                    level,
                    title: String::new(),
                    span: whole_lines(text, range),
                });
                depth += 1;
            }
            Event::End(TagEnd::Heading(_)) if depth == 1 => {
                if let Some(mut heading) = open.take() {
                    heading.title = heading.title.trim().to_string();
                    heading.span = with_underline(text, heading.span);
                    blocks.headings.push(heading);
                }
                depth = 0;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(fragment) | Event::Code(fragment) => {
                if let Some(heading) = open.as_mut() {
                    heading.title.push_str(&fragment);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = open.as_mut() {
                    heading.title.push(' ');
                }
            }
            Event::Rule if depth == 0 => blocks.breaks.push(whole_lines(text, range)),
            _ => {}
        }
    }
    blocks
}

/// Widen a byte range to the start of its first line and past the newline
/// ending its last line.
fn whole_lines(text: &str, range: Range<usize>) -> Range<usize> {
    let start = text[..range.start].rfind('\n').map_or(0, |idx| idx + 1);
    let end = if range.end > range.start && text[..range.end].ends_with('\n') {
        range.end
    } else {
        text[range.end..]
            .find('\n')
            .map_or(text.len(), |idx| range.end + idx + 1)
    };
    start..end
}

/// Extend a setext heading's span over its underline if the parser's range
/// stopped at the text line.
fn with_underline(text: &str, span: Range<usize>) -> Range<usize> {
    let block = &text[span.clone()];
    if block.trim_start().starts_with('#') || block.lines().last().is_some_and(is_underline) {
        return span;
    }
    match text[span.end..].split_inclusive('\n').next() {
        Some(next) if is_underline(next) => span.start..span.end + next.len(),
        _ => span,
    }
}

fn is_underline(line: &str) -> bool {
    let line = line.trim_end();
    let body = line.trim_start_matches(' ');
    if line.len() - body.len() > 3 {
        return false;
    }
    let Some(ch) = body.chars().next() else {
        return false;
    };
    (ch == '=' || ch == '-') && body.chars().all(|c| c == ch)
}

fn line_number(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Split a trailing thematic break + text footer off the last section. Any
/// heading after the break means it is part of the body.
fn split_footer(text: &str, section: &mut Section, blocks: &Blocks) -> Option<String> {
    let body_start = section.range.end - section.body.len();
    let rule = blocks
        .breaks
        .iter()
        .rev()
        .find(|rule| rule.start >= body_start && rule.end <= section.range.end)?;
    if blocks.headings.iter().any(|h| h.span.start > rule.start) {
        return None;
    }
    if text[rule.end..section.range.end].trim().is_empty() {
        return None;
    }
    let footer = text[rule.start..section.range.end].to_string();
    section.body.truncate(rule.start - body_start);
    section.range.end = rule.start;
    Some(footer)
}
