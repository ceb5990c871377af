use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Renders Reddit-flavoured markdown bodies to HTML.
///
/// Reddit ships comment bodies entity-encoded (`&gt;` for quotes), so the input is
/// decoded before parsing. Raw HTML in the source is dropped rather than passed
/// through, and `javascript:` link targets are neutralised.
#[derive(Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, input: &str) -> String {
        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_FOOTNOTES);

        let decoded = html_escape::decode_html_entities(input);
        let parser = Parser::new_ext(&decoded, opts).filter_map(sanitize);

        let mut out = String::with_capacity(decoded.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

fn sanitize(event: Event<'_>) -> Option<Event<'_>> {
    match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        other => Some(other),
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if scheme.starts_with("javascript:") || scheme.starts_with("data:") {
        CowStr::Borrowed("#")
    } else {
        url
    }
}
