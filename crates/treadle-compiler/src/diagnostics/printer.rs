//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use treadle_core::{SourceMap, Span};

use super::collection::Diagnostics;
use super::message::{Note, Severity};

/// Builder for rendering diagnostics with various options.
pub struct DiagnosticsPrinter<'d, 's> {
    diagnostics: &'d Diagnostics,
    sources: Option<&'s SourceMap>,
    colored: bool,
}

impl<'d, 's> DiagnosticsPrinter<'d, 's> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            sources: None,
            colored: false,
        }
    }

    pub fn sources(mut self, sources: &'s SourceMap) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let Some(sources) = self.sources else {
            return self.format_plain(w);
        };

        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            let Some(file) = sources.get(diag.span.source) else {
                // Synthetic span: no source to annotate, fall back to text.
                if i > 0 {
                    w.write_char('\n')?;
                }
                writeln!(w, "{}", diag)?;
                continue;
            };

            let mut snippet = Snippet::source(&file.text)
                .line_start(1)
                .path(&file.name)
                .annotation(
                    AnnotationKind::Primary
                        .span(adjust_range(diag.span, file.text.len()))
                        .label(&diag.message),
                );

            // Span notes in the same file become context annotations; text
            // notes get their own group below the primary snippet.
            let mut trailing: Vec<Group> = Vec::new();
            for note in &diag.notes {
                match note {
                    Note::Text(text) => {
                        trailing.push(Group::with_title(Level::NOTE.secondary_title(text)));
                    }
                    Note::Span(span) if span.source == diag.span.source => {
                        snippet = snippet.annotation(
                            AnnotationKind::Context
                                .span(adjust_range(*span, file.text.len()))
                                .label("relevant code here"),
                        );
                    }
                    Note::Span(span) => {
                        if let Some(other) = sources.get(span.source) {
                            trailing.push(
                                Level::NOTE.secondary_title("relevant code here").element(
                                    Snippet::source(&other.text)
                                        .line_start(1)
                                        .path(&other.name)
                                        .annotation(
                                            AnnotationKind::Context
                                                .span(adjust_range(*span, other.text.len()))
                                                .label("relevant code here"),
                                        ),
                                ),
                            );
                        }
                    }
                }
            }

            let level = severity_to_level(diag.severity);
            let mut report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];
            report.extend(trailing);

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", diag)?;
        }
        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let start = span.start as usize;
    let end = span.end as usize;

    // Zero-width spans still need one highlighted character.
    if start == end {
        return start..(start + 1).min(limit);
    }

    start..end.min(limit)
}

impl Diagnostics {
    pub fn printer(&self) -> DiagnosticsPrinter<'_, '_> {
        DiagnosticsPrinter::new(self)
    }
}
