use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    /// A rewrite rule found the tree in a shape it cannot handle. This is a
    /// resolver/collector contract breach, never a user error.
    #[error("Rewrite error: {msg}")]
    Rewrite { msg: String, span: Span },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn rewrite(msg: impl Into<String>, span: Span) -> Self {
        Self::Rewrite { msg: msg.into(), span }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } | Self::Rewrite { span, .. } if !span.is_dummy() => Some(*span),
            _ => None,
        }
    }

    /// The bare message, without the kind prefix `Display` adds.
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { msg, .. } | Self::Rewrite { msg, .. } | Self::Io { msg, .. } => msg,
        }
    }
}

/// Render a CompileError with ariadne for nice terminal output.
pub fn render_error(source: &str, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match (err, err.span()) {
        (CompileError::Io { msg, path }, _) => {
            eprintln!("error: {msg}");
            eprintln!("  --> {}", path.display());
        }
        (_, None) => eprintln!("error: {err}"),
        (_, Some(span)) => {
            let kind_str = if err.is_syntax() { "syntax" } else { "rewrite" };
            let msg = err.message();
            let report = Report::build(ReportKind::Error, (), span.start)
                .with_message(format!("{kind_str} error in {filename}"))
                .with_label(Label::new(clamp(&span, source)).with_message(msg))
                .finish();
            if let Err(e) = report.eprint(Source::from(source)) {
                eprintln!("error: {msg} (could not render report: {e})");
            }
        }
    }
}

/// Render a span-carrying error to an uncoloured string. Used by tests and
/// by callers that capture diagnostics.
pub fn render_to_string(source: &str, err: &CompileError) -> String {
    use ariadne::{Config, Label, Report, ReportKind, Source};

    let Some(span) = err.span() else {
        return format!("error: {err}\n");
    };
    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, (), span.start)
        .with_config(Config::default().with_color(false))
        .with_message(err.to_string())
        .with_label(Label::new(clamp(&span, source)).with_message(err.message()))
        .finish()
        .write(Source::from(source), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("error: {err}\n"),
    }
}

fn clamp(span: &Span, source: &str) -> std::ops::Range<usize> {
    let end = span.end.min(source.len());
    span.start.min(end)..end
}
