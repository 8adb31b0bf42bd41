use ammonia::Builder;
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};

pub struct MarkdownRenderer {
    sanitizer: Builder<'static>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut tags = Builder::default().clone_tags();
        tags.insert("pre");
        tags.insert("code");
        tags.insert("table");
        tags.insert("thead");
        tags.insert("tbody");
        tags.insert("tr");
        tags.insert("th");
        tags.insert("td");
        tags.insert("del");

        let mut attrs = Builder::default().clone_tag_attributes();
        attrs.insert(
            "img",
            ["src", "alt", "title", "width", "height", "loading"]
                .iter()
                .cloned()
                .collect(),
        );

        let mut sanitizer = Builder::default();
        sanitizer
            .tags(tags)
            .tag_attributes(attrs)
            .link_rel(Some("noopener noreferrer"));

        Self { sanitizer }
    }

    /// Markdown to sanitised HTML.
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(markdown, options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        self.sanitizer.clean(&out).to_string()
    }

    /// Plain text of the markdown, truncated to `max_words` words with an
    /// ellipsis when something was cut.
    pub fn generate_excerpt(&self, markdown: &str, max_words: usize) -> String {
        let text = plain_text(markdown);
        truncate_words(&text, max_words)
    }
}

/// The readable text of a markdown document: headings and code blocks are
/// dropped, inline markup is flattened.
pub fn plain_text(markdown: &str) -> String {
    let mut text = String::new();
    let mut skip_depth = 0usize;

    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Heading { .. }) | Event::Start(Tag::CodeBlock(_)) => {
                skip_depth += 1;
            }
            Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(t) | Event::Code(t) if skip_depth == 0 => {
                text.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak | Event::End(TagEnd::Paragraph)
                if skip_depth == 0 =>
            {
                text.push(' ');
            }
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        words.join(" ")
    } else {
        format!("{} ...", words[..max_words].join(" "))
    }
}
