//! README reconciler: accept or reject a generated README.
//!
//! Pure: no I/O, no clock, no randomness. Feeding the same inputs twice yields
//! the same outcome.
//!
//! Rules run in order and the first failure wins:
//!
//! 1. Every expected section is present once, in canonical order.
//! 2. Update only: protected sections are unchanged unless the brief names them.
//! 3. Scaffold only: every section has content.
//! 4. No stray or duplicate headings.
//! 5. Checklist criteria are reflected in Features (when criteria are given).

use std::collections::HashSet;
use std::fmt;

use crate::readme::{normalize_candidate, ReadmeDocument, SectionKey, SectionKind};

/// Words ignored when extracting checklist keywords.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "must", "should", "shall", "can", "will",
    "are", "has", "have", "when", "from", "into", "its", "all", "any", "each", "use", "uses",
    "using", "page", "app", "application", "user", "users", "able", "not", "via",
];

/// Which reconciliation pass is running.
#[derive(Debug, Clone, Copy)]
pub enum ReconcileMode<'a> {
    Scaffold {
        /// Criteria Features must cover; empty disables rule 5.
        criteria: &'a [String],
    },
    Update {
        revision_brief: &'a str,
        criteria: &'a [String],
    },
}

impl ReconcileMode<'_> {
    fn criteria(&self) -> &[String] {
        match self {
            ReconcileMode::Scaffold { criteria } | ReconcileMode::Update { criteria, .. } => {
                criteria
            }
        }
    }
}

/// Why a candidate README was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyDocument,
    MissingSection { section: SectionKind },
    SectionOrder { section: SectionKind, after: SectionKind },
    SectionDrift { section: SectionKind },
    EmptySection { section: SectionKind },
    StrayHeading { line: usize, heading: String },
    DuplicateSection { section: String, line: usize },
    ChecklistNotCovered { criterion: String },
}

impl Rejection {
    /// Whether the candidate rewrote a section it had to leave alone.
    pub fn is_drift(&self) -> bool {
        matches!(self, Rejection::SectionDrift { .. })
    }

    /// Stable snake_case label for logs and wire responses.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::EmptyDocument => "empty_document",
            Rejection::MissingSection { .. } => "missing_section",
            Rejection::SectionOrder { .. } => "section_order",
            Rejection::SectionDrift { .. } => "section_drift",
            Rejection::EmptySection { .. } => "empty_section",
            Rejection::StrayHeading { .. } => "stray_heading",
            Rejection::DuplicateSection { .. } => "duplicate_section",
            Rejection::ChecklistNotCovered { .. } => "checklist_not_covered",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyDocument => write!(f, "candidate is empty"),
            Rejection::MissingSection { section } => {
                write!(f, "required section `{section}` is missing")
            }
            Rejection::SectionOrder { section, after } => {
                write!(f, "section `{section}` must come before `{after}`")
            }
            Rejection::SectionDrift { section } => {
                write!(f, "protected section `{section}` was modified")
            }
            Rejection::EmptySection { section } => write!(f, "section `{section}` is empty"),
            Rejection::StrayHeading { line, heading } => {
                write!(f, "stray heading on line {line}: {heading:?}")
            }
            Rejection::DuplicateSection { section, line } => {
                write!(f, "section `{section}` repeated on line {line}")
            }
            Rejection::ChecklistNotCovered { criterion } => {
                write!(f, "Features does not cover criterion {criterion:?}")
            }
        }
    }
}

/// Validate `candidate` against `previous` (empty for scaffold).
///
/// On acceptance the returned document holds the normalized candidate text.
pub fn reconcile(
    mode: ReconcileMode<'_>,
    previous: &str,
    candidate: &str,
) -> Result<ReadmeDocument, Rejection> {
    let text = normalize_candidate(candidate);
    if text.is_empty() {
        return Err(Rejection::EmptyDocument);
    }
    let doc = ReadmeDocument::parse(&text);

    let previous_doc = match mode {
        ReconcileMode::Update { .. } => Some(ReadmeDocument::parse(&normalize_candidate(previous))),
        ReconcileMode::Scaffold { .. } => None,
    };

    // Rule 1: structure.
    let expected: Vec<SectionKind> = match &previous_doc {
        Some(prev) => prev.known_kinds(),
        None => SectionKind::ALL.to_vec(),
    };
    check_structure(&doc, &expected)?;

    // Rule 2: protected sections.
    if let (ReconcileMode::Update { revision_brief, .. }, Some(prev)) = (mode, &previous_doc) {
        check_protected(&doc, prev, revision_brief)?;
    }

    // Rule 3: content.
    if matches!(mode, ReconcileMode::Scaffold { .. }) {
        if let Some(section) = SectionKind::ALL
            .iter()
            .find(|kind| doc.section(**kind).is_some_and(|s| s.is_empty()))
        {
            return Err(Rejection::EmptySection { section: *section });
        }
    }

    // Rule 4: well-formedness.
    check_well_formed(&doc)?;

    // Rule 5: checklist coverage.
    check_checklist(&doc, mode.criteria())?;

    Ok(doc)
}

fn check_structure(doc: &ReadmeDocument, expected: &[SectionKind]) -> Result<(), Rejection> {
    let present = doc.known_kinds();
    if let Some(missing) = expected.iter().find(|kind| !present.contains(kind)) {
        return Err(Rejection::MissingSection { section: *missing });
    }
    let mut seen = Vec::with_capacity(present.len());
    for section in &doc.sections {
        let Some(kind) = section.key.kind() else {
            continue;
        };
        if seen.contains(&kind) {
            return Err(Rejection::DuplicateSection {
                section: kind.to_string(),
                line: section.line,
            });
        }
        seen.push(kind);
    }
    for pair in present.windows(2) {
        if pair[1].rank() < pair[0].rank() {
            return Err(Rejection::SectionOrder {
                section: pair[1],
                after: pair[0],
            });
        }
    }
    Ok(())
}

fn check_protected(
    doc: &ReadmeDocument,
    previous: &ReadmeDocument,
    revision_brief: &str,
) -> Result<(), Rejection> {
    for kind in SectionKind::PROTECTED {
        if kind.is_named_in(revision_brief) {
            continue;
        }
        let Some(before) = previous.section(kind) else {
            continue;
        };
        let unchanged = doc
            .section(kind)
            .is_some_and(|after| after.content() == before.content());
        if !unchanged {
            return Err(Rejection::SectionDrift { section: kind });
        }
    }
    Ok(())
}

fn check_well_formed(doc: &ReadmeDocument) -> Result<(), Rejection> {
    let mut seen: HashSet<&SectionKey> = HashSet::new();
    let duplicate = doc
        .sections
        .iter()
        .find(|s| !seen.insert(&s.key))
        .map(|s| (s.line, s.key.to_string()));
    let stray = doc.stray_headings.first();

    match (stray, duplicate) {
        (Some(stray), Some((line, _))) if stray.line < line => Err(stray_rejection(stray)),
        (_, Some((line, section))) => Err(Rejection::DuplicateSection { section, line }),
        (Some(stray), None) => Err(stray_rejection(stray)),
        (None, None) => Ok(()),
    }
}

fn stray_rejection(stray: &crate::readme::StrayHeading) -> Rejection {
    Rejection::StrayHeading {
        line: stray.line,
        heading: stray.text.clone(),
    }
}

fn check_checklist(doc: &ReadmeDocument, criteria: &[String]) -> Result<(), Rejection> {
    if criteria.is_empty() {
        return Ok(());
    }
    let features = doc
        .section(SectionKind::Features)
        .map(|s| s.body.to_lowercase())
        .unwrap_or_default();
    for criterion in criteria {
        if !criterion_covered(&features, criterion) {
            return Err(Rejection::ChecklistNotCovered {
                criterion: criterion.clone(),
            });
        }
    }
    Ok(())
}

/// Keywords of a criterion: alphanumeric words of three or more letters that
/// are not stop words, lowercased and deduplicated.
pub fn criterion_keywords(criterion: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in criterion
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(w))
    {
        if !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
    }
    out
}

fn criterion_covered(features_lower: &str, criterion: &str) -> bool {
    let keywords = criterion_keywords(criterion);
    if keywords.is_empty() {
        return true;
    }
    let hits = keywords
        .iter()
        .filter(|kw| features_lower.contains(kw.as_str()))
        .count();
    hits * 2 >= keywords.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn readme(features: &str, license: &str) -> String {
        let mut out = String::from("# Color Picker\n\nPick colours in the browser.\n\n");
        for kind in SectionKind::ALL {
            out.push_str(&format!("## {}\n\n", kind.title()));
            let body = match kind {
                SectionKind::Features => features.to_string(),
                SectionKind::License => license.to_string(),
                _ => format!("{} text.", kind.title()),
            };
            out.push_str(&body);
            out.push_str("\n\n");
        }
        out
    }

    /// Replace the body of `kind` in `text`, keeping everything else as is.
    fn rewrite(text: &str, kind: SectionKind, body: &str) -> String {
        let doc = ReadmeDocument::parse(text);
        let section = doc.section(kind).expect("section present");
        format!(
            "{}{}\n\n{body}\n\n{}",
            &text[..section.range.start],
            section.heading_line,
            &text[section.range.end..]
        )
    }

    const NO_CRITERIA: &[String] = &[];

    fn scaffold() -> ReconcileMode<'static> {
        ReconcileMode::Scaffold { criteria: NO_CRITERIA }
    }

    #[test]
    fn complete_scaffold_is_accepted() {
        let doc = reconcile(scaffold(), "", &readme("- Hex input", "MIT")).expect("accepted");
        assert_eq!(doc.known_kinds().len(), 10);
        assert!(doc.as_str().ends_with("Author text.\n"));
    }

    #[test]
    fn missing_section_is_rejected() {
        let text = readme("- Hex input", "MIT").replace("## Usage\n\nUsage text.\n\n", "");
        assert_eq!(
            reconcile(scaffold(), "", &text).unwrap_err(),
            Rejection::MissingSection { section: SectionKind::Usage }
        );
    }

    #[test]
    fn reordered_sections_are_rejected() {
        let text = readme("- Hex input", "MIT")
            .replace("## Overview\n\nOverview text.\n\n", "")
            .replace("## Usage\n\n", "## Usage\n\nUsage text.\n\n## Overview\n\n");
        let err = reconcile(scaffold(), "", &text).unwrap_err();
        assert!(matches!(err, Rejection::SectionOrder { section: SectionKind::Overview, .. }), "got: {err}");
    }

    #[test]
    fn empty_section_is_rejected_on_scaffold() {
        let text = readme("", "MIT");
        assert_eq!(
            reconcile(scaffold(), "", &text).unwrap_err(),
            Rejection::EmptySection { section: SectionKind::Features }
        );
    }

    #[test]
    fn license_drift_is_rejected_on_update() {
        let previous = readme("- Hex input", "MIT");
        let candidate = readme("- Hex input\n- Dark mode toggle", "Apache-2.0");
        let mode = ReconcileMode::Update { revision_brief: "add dark mode toggle", criteria: NO_CRITERIA };
        let err = reconcile(mode, &previous, &candidate).unwrap_err();
        assert!(err.is_drift());
        assert_eq!(err, Rejection::SectionDrift { section: SectionKind::License });
    }

    #[test]
    fn brief_mentioning_license_lifts_protection() {
        let previous = readme("- Hex input", "MIT");
        let candidate = readme("- Hex input", "Apache-2.0");
        let mode = ReconcileMode::Update { revision_brief: "switch the License to Apache", criteria: NO_CRITERIA };
        reconcile(mode, &previous, &candidate).expect("license change allowed");
    }

    #[test]
    fn unknown_section_is_an_allowed_addition_once() {
        let base = readme("- Hex input", "MIT");
        let once = base.replace("## Usage", "## Roadmap\n\nLater.\n\n## Usage");
        reconcile(scaffold(), "", &once).expect("addition accepted");

        let twice = once.replace("## Usage", "## Roadmap\n\nAgain.\n\n## Usage");
        let err = reconcile(scaffold(), "", &twice).unwrap_err();
        assert!(matches!(err, Rejection::DuplicateSection { ref section, .. } if section == "roadmap"), "got: {err}");
    }

    #[test]
    fn duplicate_required_section_is_rejected() {
        let text = readme("- Hex input", "MIT").replace("## Usage", "## Features\n\nMore.\n\n## Usage");
        let err = reconcile(scaffold(), "", &text).unwrap_err();
        assert!(matches!(err, Rejection::DuplicateSection { .. }), "got: {err}");
    }

    #[test]
    fn stray_level_one_heading_is_rejected() {
        let text = readme("- Hex input", "MIT").replace("## Usage", "# Oops\n\n## Usage");
        let err = reconcile(scaffold(), "", &text).unwrap_err();
        assert!(matches!(err, Rejection::StrayHeading { .. }), "got: {err}");
    }

    #[test]
    fn checklist_coverage() {
        let criteria = vec!["must support hex input".to_string(), "must show live preview".to_string()];
        let mode = ReconcileMode::Scaffold { criteria: &criteria };
        let ok = readme("- Hex input field\n- Live preview swatch", "MIT");
        reconcile(mode, "", &ok).expect("covered");

        let missing = readme("- Hex input field", "MIT");
        assert_eq!(
            reconcile(mode, "", &missing).unwrap_err(),
            Rejection::ChecklistNotCovered { criterion: "must show live preview".to_string() }
        );
    }

    #[test]
    fn keywords_skip_stop_words_and_short_words() {
        assert_eq!(criterion_keywords("Must support a hex input"), vec!["support", "hex", "input"]);
        assert!(criterion_keywords("it is ok").is_empty());
    }

    #[test]
    fn rejection_is_idempotent() {
        let text = readme("", "MIT");
        let first = reconcile(scaffold(), "", &text).unwrap_err();
        let second = reconcile(scaffold(), "", &text).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn fenced_candidate_is_normalized_before_checks() {
        let fenced = format!("```markdown\r\n{}```", readme("- Hex input", "MIT").replace('\n', "\r\n"));
        let doc = reconcile(scaffold(), "", &fenced).expect("accepted");
        assert!(!doc.as_str().contains('\r'));
        assert!(doc.as_str().starts_with("# Color Picker"));
    }

    #[rstest]
    #[case::authorization_is_not_author("add OAuth authorization to the login form", SectionKind::Author)]
    #[case::reinstall_is_not_install("mention a reinstall hint for the cache", SectionKind::SetupInstallation)]
    #[case::unlicensed_is_not_license("list unlicensed assets separately", SectionKind::License)]
    fn protection_holds_for_words_containing_a_section_name(
        #[case] brief: &str,
        #[case] kind: SectionKind,
    ) {
        let previous = readme("- Hex input", "MIT");
        let candidate = rewrite(&previous, kind, "Rewritten by the model.");
        let mode = ReconcileMode::Update { revision_brief: brief, criteria: NO_CRITERIA };
        assert_eq!(
            reconcile(mode, &previous, &candidate).unwrap_err(),
            Rejection::SectionDrift { section: kind }
        );
    }

    #[rstest]
    #[case::author("update the author bio", SectionKind::Author)]
    #[case::install("simplify the install steps", SectionKind::SetupInstallation)]
    #[case::licence("British spelling: change the licence", SectionKind::License)]
    fn brief_naming_a_protected_section_lifts_its_protection(
        #[case] brief: &str,
        #[case] kind: SectionKind,
    ) {
        let previous = readme("- Hex input", "MIT");
        let candidate = rewrite(&previous, kind, "Rewritten by the model.");
        let mode = ReconcileMode::Update { revision_brief: brief, criteria: NO_CRITERIA };
        reconcile(mode, &previous, &candidate).expect("named section may change");
    }

    #[test]
    fn trailing_spaces_in_protected_section_are_drift() {
        let previous = readme("- Hex input", "MIT");
        let candidate = readme("- Hex input\n- Dark mode toggle", "MIT   ");
        let mode = ReconcileMode::Update { revision_brief: "add dark mode toggle", criteria: NO_CRITERIA };
        assert_eq!(
            reconcile(mode, &previous, &candidate).unwrap_err(),
            Rejection::SectionDrift { section: SectionKind::License }
        );
    }

    #[test]
    fn accepted_update_keeps_protected_sections_exact() {
        let previous = readme("- Hex input", "MIT\n\n2024 Ada");
        let candidate = readme("- Hex input\n- Dark mode toggle", "MIT\n\n2024 Ada\n");
        let mode = ReconcileMode::Update { revision_brief: "add dark mode toggle", criteria: NO_CRITERIA };
        let doc = reconcile(mode, &previous, &candidate).expect("accepted");
        let before = ReadmeDocument::parse(&previous);
        for kind in SectionKind::PROTECTED {
            let section = doc.section(kind).unwrap();
            let old = before.section(kind).unwrap();
            assert_eq!(section.content(), old.content());
            assert!(previous.contains(&section.content()));
        }
    }

    #[test]
    fn setext_license_before_usage_is_a_duplicate() {
        let text = readme("- Hex input", "MIT").replace(
            "## Usage",
            "License\n-------\n\nProprietary, all rights reserved.\n\n## Usage",
        );
        let line = text.lines().position(|l| l == "License").unwrap() + 1;
        let err = reconcile(scaffold(), "", &text).unwrap_err();
        assert_eq!(err, Rejection::DuplicateSection { section: "License".into(), line });
    }

    #[test]
    fn second_setext_license_is_a_duplicate() {
        let text = readme("- Hex input", "MIT").replace(
            "## Author",
            "License\n-------\n\nProprietary, all rights reserved.\n\n## Author",
        );
        let err = reconcile(scaffold(), "", &text).unwrap_err();
        assert!(
            matches!(err, Rejection::DuplicateSection { ref section, .. } if section == "License"),
            "got: {err}"
        );
    }
}
