//! Markdown rendering for model answers
//!
//! Converts answer markdown to HTML with raw HTML neutralised and a copy
//! button attached to every code block. Also renders a whole conversation as
//! a standalone page for export.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::llm::{Message, Role};

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Link schemes allowed through to the rendered page
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Replace link and image targets with an unsafe scheme by `#`.
///
/// Relative targets have no scheme and pass unchanged.
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    // Browsers skip whitespace and control characters inside a scheme
    let compact: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme = compact
        .find([':', '/', '?', '#'])
        .filter(|&i| compact[i..].starts_with(':'))
        .map(|i| &compact[..i]);

    match scheme {
        Some(scheme) if !SAFE_SCHEMES.iter().any(|s| *s == scheme) => CowStr::Borrowed("#"),
        _ => url,
    }
}

fn code_block_html(lang: Option<&str>, code: &str) -> String {
    let escaped = escape_html(code);
    let class = lang
        .filter(|l| !l.is_empty())
        .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
        .unwrap_or_default();
    format!(
        "<div class=\"code-block\"><button class=\"copy-button\" data-copy=\"{escaped}\">Copy</button><pre><code{class}>{escaped}</code></pre></div>\n"
    )
}

/// Render markdown to sanitised HTML.
pub fn render_markdown(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options);

    let mut events: Vec<Event> = Vec::new();
    let mut code: Option<(Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, body)) = code.take() {
                    events.push(Event::Html(CowStr::from(code_block_html(lang.as_deref(), &body))));
                }
            }
            Event::Text(t) if code.is_some() => {
                if let Some((_, body)) = code.as_mut() {
                    body.push_str(&t);
                }
            }
            Event::Start(Tag::Link { link_type, dest_url, title, id }) => {
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                }));
            }
            Event::Start(Tag::Image { link_type, dest_url, title, id }) => {
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: safe_url(dest_url),
                    title,
                    id,
                }));
            }
            // Raw HTML from the model is shown as text, never interpreted
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// Render a conversation as a standalone HTML page.
pub fn render_conversation(title: &str, messages: &[Message]) -> String {
    let mut body = String::new();
    for message in messages {
        let content = match message.role {
            Role::Model => render_markdown(&message.content),
            Role::User | Role::System => format!("<p>{}</p>", escape_html(&message.content)),
        };
        body.push_str(&format!(
            "<div class=\"message {}\">{}</div>\n",
            message.role.as_str(),
            content
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = render_markdown("**bold** and *em*\n\n- one\n- two");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));

        let block = render_markdown("<div onclick=\"x\">block</div>\n");
        assert!(!block.contains("<div onclick"));
    }

    #[test]
    fn test_script_links_are_neutralised() {
        let html = render_markdown("[click](javascript:alert(1)) ![x](javascript:alert(2))");
        assert_eq!(html, "<p><a href=\"#\">click</a> <img src=\"#\" alt=\"x\" /></p>\n");

        let html = render_markdown("[a](JavaScript:x) [b](data:text/html,hi) [c]( vbscript:x)");
        assert!(!html.contains("script:"));
        assert!(!html.contains("data:"));
    }

    #[test]
    fn test_safe_links_are_kept() {
        let html = render_markdown(
            "[docs](https://ai.google.dev/pricing) [mail](mailto:a@b.c) [rel](faq.html#keys) [top](#intro)",
        );
        assert!(html.contains("href=\"https://ai.google.dev/pricing\""));
        assert!(html.contains("href=\"mailto:a@b.c\""));
        assert!(html.contains("href=\"faq.html#keys\""));
        assert!(html.contains("href=\"#intro\""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&\"</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&quot;&lt;/a&gt;");
    }

    #[test]
    fn test_code_block_gets_copy_button() {
        let html = render_markdown("```rust\nlet a = \"<b>\";\n```\n");
        assert!(html.contains("class=\"copy-button\""));
        assert!(html.contains("class=\"language-rust\""));
        assert!(html.contains("data-copy=\"let a = &quot;&lt;b&gt;&quot;;\n\""));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_conversation_page() {
        let messages = vec![
            Message::system("Loaded \"doc.pdf\""),
            Message::user("What <is> it?"),
            Message::model("It is **this**."),
        ];
        let page = render_conversation("doc.pdf", &messages);
        assert!(page.contains("<title>doc.pdf</title>"));
        assert!(page.contains("<div class=\"message user\"><p>What &lt;is&gt; it?</p></div>"));
        assert!(page.contains("<strong>this</strong>"));
        assert!(page.contains("class=\"message system\""));
    }
}
