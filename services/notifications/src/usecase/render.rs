use anyhow::Context as _;
use handlebars::{Handlebars, html_escape};
use pulldown_cmark::{Options, Parser, html};
use serde_json::json;

use courier_core::error::RuntimeError;
use courier_domain::message::{MARKDOWN_MAX_LEN, MessageBodyMarkdown};
use courier_domain::sender::SenderMetadata;

const EMAIL_TEMPLATE_NAME: &str = "email";
const TEXT_WIDTH: usize = 80;
/// Wide enough for any nesting a valid markdown body can produce.
const WIDE_TEXT_WIDTH: usize = 2 * MARKDOWN_MAX_LEN;

const EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta http-equiv="Content-Type" content="text/html; charset=UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{title}}</title>
</head>
<body style="margin:0;padding:0;background-color:#ffffff;font-family:Helvetica,Arial,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" border="0">
<tr><td style="padding:24px;">
<p style="font-size:14px;color:#5c6f82;margin:0;">{{organization_name}}</p>
<p style="font-size:14px;color:#5c6f82;margin:0 0 24px 0;">{{{service_line}}}</p>
<h1 style="font-size:24px;color:#17324d;">{{title}}</h1>
<div style="font-size:16px;color:#17324d;line-height:1.5;">{{{body}}}</div>
</td></tr>
</table>
</body>
</html>
"#;

/// Rendered email bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Turns a markdown message into the HTML and plain-text email bodies.
pub struct EmailRenderer {
    registry: Handlebars<'static>,
}

impl EmailRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(EMAIL_TEMPLATE_NAME, EMAIL_TEMPLATE)
            .context("register email template")?;
        Ok(Self { registry })
    }

    /// A template failure will recur on every attempt, so it is permanent.
    pub fn render(
        &self,
        subject: &str,
        markdown: &MessageBodyMarkdown,
        sender: &SenderMetadata,
    ) -> Result<RenderedEmail, RuntimeError> {
        let service_line = format!(
            "{}<br />{}",
            html_escape(&sender.department_name),
            html_escape(&sender.service_name)
        );
        let data = json!({
            "title": subject,
            "organization_name": sender.organization_name,
            "service_line": service_line,
            "body": markdown_to_html(markdown.as_str()),
        });
        let html = self
            .registry
            .render(EMAIL_TEMPLATE_NAME, &data)
            .map_err(|e| RuntimeError::permanent(format!("render email template: {e}")))?;
        let text = html_to_text(&html);
        Ok(RenderedEmail { html, text })
    }
}

/// Plain-text rendering of an HTML body. Falls back to a wider layout, then
/// to the bare text content, when the markup nests too deep to fit.
pub fn html_to_text(html: &str) -> String {
    for width in [TEXT_WIDTH, WIDE_TEXT_WIDTH] {
        match html2text::config::plain().string_from_read(html.as_bytes(), width) {
            Ok(text) => return text,
            Err(e) => tracing::debug!(width, error = %e, "html to text conversion failed"),
        }
    }
    strip_tags(html)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// CommonMark with tables and strikethrough.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
