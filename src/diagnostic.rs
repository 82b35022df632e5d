use std::ops::Range;

use crate::error::GenError;

/// A user-facing report built from a `GenError`.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Byte range in the model file, when the failure has a position.
    pub span: Option<Range<usize>>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span: None,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Build a diagnostic for `err`. `source` is the model file text, used
    /// to turn parse positions into byte offsets.
    pub fn from_error(err: &GenError, source: &str) -> Self {
        let d = Diagnostic::error(err.to_string());
        match err {
            GenError::Parse { line, column, .. } => {
                let offset = offset_of(source, *line, *column);
                d.with_span(offset..(offset + 1).min(source.len()).max(offset))
            }
            GenError::Structure { .. } => d.with_help(
                "each LUT layer's input_dim must equal the previous layer's n_luts, \
                 and the model must end in one aggregation layer"
                    .to_string(),
            ),
            GenError::TableIncomplete { .. } => d
                .with_note(
                    "tables must define one 0/1 output for every input pattern".to_string(),
                )
                .with_help(
                    "discretize the trained LUTs before exporting the model".to_string(),
                ),
            GenError::Wiring { .. } => d.with_note(
                "a neuron may only read signals of the layer directly before it".to_string(),
            ),
            GenError::Emission { .. } => {
                d.with_help("pass --name to choose a different model name".to_string())
            }
            GenError::Io { .. } | GenError::Config(_) => d,
        }
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let start = self.span.as_ref().map_or(0, |s| s.start);
        let mut report = Report::build(kind, filename, start).with_message(&self.message);
        if let Some(span) = &self.span {
            report = report.with_label(
                Label::new((filename, span.clone()))
                    .with_message(&self.message)
                    .with_color(color),
            );
        }

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        if report
            .finish()
            .eprint((filename, Source::from(source)))
            .is_err()
        {
            eprintln!("error: {}", self.message);
        }
    }
}

/// Byte offset of a 1-based line/column position, clamped to `source`.
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            return (offset + column.saturating_sub(1)).min(source.len());
        }
        offset += text.len();
    }
    source.len()
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
