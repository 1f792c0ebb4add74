//! Template layer for the index page, content pages and the shared stylesheet.
//!
//! Templates use `minijinja` syntax. Undefined variables are errors, and the `.html`
//! templates auto-escape every value except the markup fragments, which are handed
//! over as safe strings.

use std::sync::OnceLock;

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

use crate::error::Result;

pub(crate) const DEFAULT_INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
pub(crate) const DEFAULT_PAGE_TEMPLATE: &str = include_str!("../templates/page.html");
pub(crate) const DEFAULT_CSS: &str = include_str!("../templates/stylesheet.css");

/// Compiled index and page templates plus the stylesheet text.
#[derive(Debug)]
pub struct TemplateSet {
    env: Environment<'static>,
    css: String,
}

impl TemplateSet {
    pub const INDEX: &'static str = "index.html";
    pub const PAGE: &'static str = "page.html";

    /// Compiles the given sources. Syntax errors surface here as [`Error::Template`](crate::error::Error::Template).
    pub fn new(
        index_source: impl Into<String>,
        page_source: impl Into<String>,
        css: impl Into<String>,
    ) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|name| {
            if name.ends_with(".html") {
                AutoEscape::Html
            } else {
                AutoEscape::None
            }
        });
        env.add_template_owned(Self::INDEX, index_source.into())?;
        env.add_template_owned(Self::PAGE, page_source.into())?;
        Ok(Self {
            env,
            css: css.into(),
        })
    }

    /// The templates shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::new(DEFAULT_INDEX_TEMPLATE, DEFAULT_PAGE_TEMPLATE, DEFAULT_CSS)
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn render_index(&self, context: Value) -> Result<String> {
        Ok(self.env.get_template(Self::INDEX)?.render(context)?)
    }

    pub fn render_page(&self, context: Value) -> Result<String> {
        Ok(self.env.get_template(Self::PAGE)?.render(context)?)
    }
}

/// Wraps `render` as a zero-argument template function.
///
/// The markup is produced the first time the template calls the function and
/// reused afterwards; a template that never calls it never pays for it.
pub fn deferred_markup<F>(render: F) -> Value
where
    F: Fn() -> String + Send + Sync + 'static,
{
    let cached: OnceLock<String> = OnceLock::new();
    Value::from_function(move || -> Value {
        Value::from_safe_string(cached.get_or_init(&render).clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use minijinja::context;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builtin_templates_compile() {
        let templates = TemplateSet::builtin().unwrap();
        assert!(templates.css().contains("body"));
    }

    #[test]
    fn test_syntax_error_is_template_error() {
        let result = TemplateSet::new("{% if %}", "", "");
        assert!(matches!(result, Err(Error::Template(_))));
    }

    #[test]
    fn test_undefined_variable_is_template_error() {
        let templates = TemplateSet::new("{{ missing }}", "", "").unwrap();
        let result = templates.render_index(context! { present => 1 });
        assert!(matches!(result, Err(Error::Template(_))));
    }

    #[test]
    fn test_deferred_markup_runs_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let toc = deferred_markup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "<ul></ul>".to_string()
        });

        let templates = TemplateSet::new("", "{{ toc() }}|{{ toc() }}", "").unwrap();
        let rendered = templates.render_page(context! { toc => toc.clone() }).unwrap();
        assert_eq!(rendered, "<ul></ul>|<ul></ul>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let unused = Arc::new(AtomicUsize::new(0));
        let counter = unused.clone();
        let toc = deferred_markup(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            String::new()
        });
        templates.render_index(context! { toc => toc }).unwrap();
        assert_eq!(unused.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_plain_values_are_escaped_markup_is_not() {
        let templates = TemplateSet::new("{{ title }} {{ body }}", "", "").unwrap();
        let rendered = templates
            .render_index(context! {
                title => "A & B",
                body => Value::from_safe_string("<p>x</p>".to_string()),
            })
            .unwrap();
        assert_eq!(rendered, "A &amp; B <p>x</p>");
    }
}
