use serde::{Serialize, Deserialize};

/// Byte-offset span in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    /// Span covering `self` through `other`.
    pub fn to(self, other: Span) -> Self {
        Self { start: self.start.min(other.start), end: self.end.max(other.end) }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// A value annotated with its source span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self { node, span: Span::dummy() }
    }

    /// Keep the span, swap the payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned { node: f(self.node), span: self.span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
    }

    #[test]
    fn test_span_dummy() {
        let span = Span::dummy();
        assert_eq!(span.start, 0);
        assert_eq!(span.end, 0);
        assert!(span.is_dummy());
    }

    #[test]
    fn test_span_to_covers_both() {
        let a = Span::new(4, 8);
        let b = Span::new(12, 20);
        assert_eq!(a.to(b), Span::new(4, 20));
        assert_eq!(b.to(a), Span::new(4, 20));
    }

    #[test]
    fn test_span_copy() {
        let span = Span::new(10, 20);
        let copied = span;
        assert_eq!(span, copied);
        assert_eq!(span.start, 10);
    }

    #[test]
    fn test_spanned_new() {
        let span = Span::new(5, 10);
        let spanned = Spanned::new(42, span);
        assert_eq!(spanned.node, 42);
        assert_eq!(spanned.span, span);
    }

    #[test]
    fn test_spanned_map_keeps_span() {
        let spanned = Spanned::new("abc", Span::new(1, 4));
        let mapped = spanned.map(|s| s.len());
        assert_eq!(mapped.node, 3);
        assert_eq!(mapped.span, Span::new(1, 4));
    }

    #[test]
    fn test_spanned_equality() {
        let span = Span::new(10, 20);
        assert_eq!(Spanned::new(42, span), Spanned::new(42, span));
        assert_ne!(Spanned::new(42, span), Spanned::new(43, span));
        assert_ne!(Spanned::new(42, span), Spanned::new(42, Span::new(10, 21)));
    }

    #[test]
    fn test_span_roundtrip() {
        let span = Span::new(5, 15);
        let json = serde_json::to_string(&span).unwrap();
        let deserialized: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(span, deserialized);
    }

    #[test]
    fn test_spanned_deserialize() {
        let json = r#"{"node":42,"span":{"start":10,"end":20}}"#;
        let spanned: Spanned<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(spanned.node, 42);
        assert_eq!(spanned.span.start, 10);
        assert_eq!(spanned.span.end, 20);
    }
}
