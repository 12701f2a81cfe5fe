//! Markdown rendering seam for document view output.

/// Error from markdown rendering.
#[derive(Debug, Clone)]
pub struct MarkdownError(pub String);

impl std::fmt::Display for MarkdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MarkdownError {}

/// Renderer abstraction: convert markdown to HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError>;
}

/// Default implementation using pulldown-cmark.
pub struct PulldownMarkdownRenderer;

impl MarkdownRenderer for PulldownMarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError> {
        use pulldown_cmark::{Parser, html};
        let mut out = String::new();
        html::push_html(&mut out, Parser::new(markdown));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulldown_renderer_produces_html() {
        let html = PulldownMarkdownRenderer
            .render("# Hi\n**bold**")
            .expect("render");
        assert!(html.contains("<h1>") && html.contains("Hi"));
        assert!(html.contains("<strong>") && html.contains("bold"));
    }

    #[test]
    fn renderers_are_substitutable() {
        struct Upper;
        impl MarkdownRenderer for Upper {
            fn render(&self, markdown: &str) -> Result<String, MarkdownError> {
                Ok(markdown.to_uppercase())
            }
        }
        let renderer: &dyn MarkdownRenderer = &Upper;
        assert_eq!(renderer.render("abc").expect("render"), "ABC");
    }
}
