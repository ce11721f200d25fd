use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::{Arena, format_html, options::Options, parse_document};
use lol_html::{
    RewriteStrSettings, doc_comments, element, html_content::ContentType, rewrite_str,
};

use super::{ContentRenderer, RenderError};

const BLOCK_ELEMENTS: &str =
    "p, div, br, li, tr, pre, blockquote, h1, h2, h3, h4, h5, h6, hr, table, ul, ol";

/// Comrak-backed renderer with an ammonia allow-list tuned for discussion
/// posts.
pub struct MarkdownRenderer {
    options: Options<'static>,
    sanitizer: AmmoniaBuilder<'static>,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn markdown_to_html(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        Ok(self.sanitizer.clean(&html).to_string())
    }

    fn html_to_text(&self, html: &str) -> Result<String, RenderError> {
        let stripped = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("script, style", |el| {
                        el.remove();
                        Ok(())
                    }),
                    element!(BLOCK_ELEMENTS, |el| {
                        el.after("\n", ContentType::Text);
                        Ok(())
                    }),
                    element!("*", |el| {
                        if !el.removed() {
                            el.remove_and_keep_content();
                        }
                        Ok(())
                    }),
                ],
                document_content_handlers: vec![doc_comments!(|comment| {
                    comment.remove();
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|err| RenderError::Document {
            message: err.to_string(),
        })?;

        let text = decode_entities(&stripped);
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        Ok(lines.join("\n"))
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;

    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "img",
        "input",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "span",
        "strong",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    builder.add_tag_attributes("img", &["title", "width", "height", "alt"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
