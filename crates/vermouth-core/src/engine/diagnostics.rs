use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// What was skipped or left out of the coarse-grained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnknownResidue,
    UnmatchedFragment,
    DroppedBead,
    DroppedTerm,
    MissingParameter,
    UnmappedAtom,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownResidue => "unknown-residue",
            Self::UnmatchedFragment => "unmatched-fragment",
            Self::DroppedBead => "dropped-bead",
            Self::DroppedTerm => "dropped-term",
            Self::MissingParameter => "missing-parameter",
            Self::UnmappedAtom => "unmapped-atom",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Fragment or term the entry refers to, e.g. `A:12 SER`.
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Everything a mapping run skipped, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    entries: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Number of entries per kind.
    pub fn summary(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Writes the report as CSV with a `kind,location,message` header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.entries.is_empty() {
            csv_writer.write_record(["kind", "location", "message"])?;
        }
        for entry in &self.entries {
            csv_writer.serialize(entry)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DiagnosticReport {
        let mut report = DiagnosticReport::new();
        report.push(Diagnostic::new(
            DiagnosticKind::UnmatchedFragment,
            "A:3 SER",
            "No template matches A:3 SER",
        ));
        report.push(Diagnostic::new(
            DiagnosticKind::UnmappedAtom,
            "A:4 ALA",
            "heavy atom CX is not part of any bead",
        ));
        report.push(Diagnostic::new(
            DiagnosticKind::UnmappedAtom,
            "A:5 ALA",
            "heavy atom CY is not part of any bead",
        ));
        report
    }

    #[test]
    fn summary_counts_entries_per_kind() {
        let summary = report().summary();
        assert_eq!(summary.get(&DiagnosticKind::UnmatchedFragment), Some(&1));
        assert_eq!(summary.get(&DiagnosticKind::UnmappedAtom), Some(&2));
        assert_eq!(summary.get(&DiagnosticKind::DroppedTerm), None);
    }

    #[test]
    fn write_csv_emits_header_and_rows() {
        let mut buffer = Vec::new();
        report().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "kind,location,message");
        assert_eq!(lines[1], "unmatched-fragment,A:3 SER,No template matches A:3 SER");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn write_csv_of_empty_report_has_only_header() {
        let mut buffer = Vec::new();
        DiagnosticReport::new().write_csv(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "kind,location,message\n");
    }
}
