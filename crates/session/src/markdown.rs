//! Markdown to HTML rendering for transcript turns.
//!
//! Parsing is done by `pulldown-cmark` with GFM tables and strikethrough;
//! the event stream is restyled so every element the dashboard styles
//! carries a fixed class list. Raw HTML in the input is shown as text.

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

use crate::transcript::Transcript;

const LINK_CLASS: &str = "text-blue-600 hover:underline";
const H1_CLASS: &str = "text-2xl font-bold mt-4 mb-2";
const H2_CLASS: &str = "text-xl font-bold mt-3 mb-2";
const H3_CLASS: &str = "text-lg font-bold mt-2 mb-1";
const PARAGRAPH_CLASS: &str = "mb-3";
const UNORDERED_LIST_CLASS: &str = "list-disc ml-6 mb-2 space-y-2";
const ORDERED_LIST_CLASS: &str = "list-decimal ml-6 mb-2 space-y-2";
const LIST_ITEM_CLASS: &str = "mb-1";
const TABLE_CLASS: &str = "border-collapse border rounded-xl border-gray-300 mb-2";
const TABLE_HEADER_CLASS: &str = "px-4 py-2 border-2 bg-gray-100 border-gray-300";
const TABLE_CELL_CLASS: &str = "px-4 border-2 py-2 border-gray-300";

const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];
const TRAILING_PUNCTUATION: [char; 7] = ['.', ',', ';', ':', '!', '?', ')'];

/// Renders one turn's markdown content as an HTML fragment.
pub fn render_markdown(content: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut styled = StyledEvents::default();
    for event in Parser::new_ext(content, options) {
        styled.push(event);
    }

    let mut out = String::with_capacity(content.len() * 2);
    html::push_html(&mut out, styled.finish().into_iter());
    out
}

/// Renders the whole chat area: the welcome screen before the conversation
/// starts, otherwise one block per turn plus a loading placeholder while a
/// reply is pending.
pub fn render_transcript(transcript: &Transcript, pending: bool) -> String {
    if !transcript.conversation_started() {
        return concat!(
            "<div class=\"h-full flex items-center justify-center p-6\">",
            "<div class=\"text-center\">",
            "<h2 class=\"text-lg md:text-2xl font-bold mb-4\">Welcome to Fieldtech Co-Intelligence</h2>",
            "<p class=\"text-muted-foreground mb-8\">Start a conversation to get assistance with your fiber installation and repair tasks.</p>",
            "</div></div>\n"
        )
        .to_string();
    }

    let mut out = String::from("<div class=\"space-y-6 p-6\">\n");
    for turn in transcript.turns() {
        let role = match turn.role() {
            crate::turn::Role::User => "user",
            crate::turn::Role::Assistant => "assistant",
        };
        out.push_str(&format!(
            "<div class=\"flex gap-4\" data-role=\"{role}\"><span class=\"avatar w-10 h-10\">{}</span><div class=\"flex-1\"><div class=\"rounded-lg bg-muted p-4\">\n",
            turn.role().avatar_label()
        ));
        out.push_str(&render_markdown(turn.content()));
        out.push_str("</div></div></div>\n");
    }
    if pending {
        out.push_str(concat!(
            "<div class=\"flex gap-4\" data-role=\"assistant\" aria-busy=\"true\">",
            "<span class=\"avatar w-10 h-10\">AI</span>",
            "<div class=\"flex-1\"><div class=\"space-y-3 rounded-lg bg-muted p-4\">",
            "<div class=\"skeleton h-3 w-3/5 rounded-lg\"></div>",
            "<div class=\"skeleton h-3 w-4/5 rounded-lg\"></div>",
            "<div class=\"skeleton h-3 w-2/5 rounded-lg\"></div>",
            "</div></div></div>\n"
        ));
    }
    out.push_str("</div>\n");
    out
}

/// Rewrites parser events into the styled stream handed to the HTML writer.
///
/// Adjacent text events are merged first so bare URLs split by the parser
/// are still linked as a whole.
#[derive(Default)]
struct StyledEvents<'a> {
    events: Vec<Event<'a>>,
    text: String,
    in_link: bool,
    in_code_block: bool,
    in_table_head: bool,
    table_body_open: bool,
}

impl<'a> StyledEvents<'a> {
    fn push(&mut self, event: Event<'a>) {
        match event {
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.text.push_str(&text);
            }
            Event::Start(tag) => {
                self.flush_text();
                self.start(tag);
            }
            Event::End(tag) => {
                self.flush_text();
                self.end(tag);
            }
            other => {
                self.flush_text();
                self.events.push(other);
            }
        }
    }

    fn finish(mut self) -> Vec<Event<'a>> {
        self.flush_text();
        self.events
    }

    fn markup(&mut self, html: impl Into<CowStr<'a>>) {
        self.events.push(Event::Html(html.into()));
    }

    fn start(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Paragraph | Tag::HtmlBlock => {
                self.markup(format!("<p class=\"{PARAGRAPH_CLASS}\">"));
            }
            Tag::Heading { level, .. } => match heading_class(level) {
                Some(class) => self.markup(format!("<{level} class=\"{class}\">")),
                None => self.markup(format!("<{level}>")),
            },
            Tag::List(None) => self.markup(format!("<ul class=\"{UNORDERED_LIST_CLASS}\">\n")),
            Tag::List(Some(first)) if first != 1 => self.markup(format!(
                "<ol class=\"{ORDERED_LIST_CLASS}\" start=\"{first}\">\n"
            )),
            Tag::List(Some(_)) => self.markup(format!("<ol class=\"{ORDERED_LIST_CLASS}\">\n")),
            Tag::Item => self.markup(format!("<li class=\"{LIST_ITEM_CLASS}\">")),
            Tag::Table(_) => {
                self.table_body_open = false;
                self.markup(format!("<table class=\"{TABLE_CLASS}\">\n"));
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.markup("<thead>\n<tr>");
            }
            Tag::TableRow => {
                if !self.table_body_open {
                    self.table_body_open = true;
                    self.markup("<tbody>\n");
                }
                self.markup("<tr>");
            }
            Tag::TableCell if self.in_table_head => {
                self.markup(format!("<th class=\"{TABLE_HEADER_CLASS}\">"));
            }
            Tag::TableCell => self.markup(format!("<td class=\"{TABLE_CELL_CLASS}\">")),
            Tag::Link { dest_url, .. } => {
                self.in_link = true;
                self.markup(anchor_open(&dest_url));
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => self.events.push(Event::Start(Tag::Image {
                link_type,
                dest_url: safe_href(&dest_url).into(),
                title,
                id,
            })),
            Tag::CodeBlock(kind) => {
                self.in_code_block = true;
                self.events.push(Event::Start(Tag::CodeBlock(kind)));
            }
            other => self.events.push(Event::Start(other)),
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock => self.markup("</p>\n"),
            TagEnd::Heading(level) => self.markup(format!("</{level}>\n")),
            TagEnd::List(true) => self.markup("</ol>\n"),
            TagEnd::List(false) => self.markup("</ul>\n"),
            TagEnd::Item => self.markup("</li>\n"),
            TagEnd::Table => {
                if self.table_body_open {
                    self.markup("</tbody>\n");
                }
                self.markup("</table>\n");
            }
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.markup("</tr>\n</thead>\n");
            }
            TagEnd::TableRow => self.markup("</tr>\n"),
            TagEnd::TableCell if self.in_table_head => self.markup("</th>"),
            TagEnd::TableCell => self.markup("</td>"),
            TagEnd::Link => {
                self.in_link = false;
                self.markup("</a>");
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.events.push(Event::End(TagEnd::CodeBlock));
            }
            other => self.events.push(Event::End(other)),
        }
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        if self.in_code_block {
            // Code is verbatim: undo only the hard-break suffix added to each turn line.
            self.events.push(Event::Text(text.replace("  \n", "\n").into()));
        } else if self.in_link {
            self.events.push(Event::Text(text.into()));
        } else {
            self.push_autolinked(&text);
        }
    }

    fn push_autolinked(&mut self, text: &str) {
        let mut rest = text;
        while let Some((start, end)) = next_web_url(rest) {
            if start > 0 {
                self.events.push(Event::Text(rest[..start].to_string().into()));
            }
            let url = &rest[start..end];
            self.markup(anchor_open(url));
            self.events.push(Event::Text(url.to_string().into()));
            self.markup("</a>");
            rest = &rest[end..];
        }
        if !rest.is_empty() {
            self.events.push(Event::Text(rest.to_string().into()));
        }
    }
}

fn heading_class(level: HeadingLevel) -> Option<&'static str> {
    match level {
        HeadingLevel::H1 => Some(H1_CLASS),
        HeadingLevel::H2 => Some(H2_CLASS),
        HeadingLevel::H3 => Some(H3_CLASS),
        _ => None,
    }
}

/// Byte range of the next bare `http(s)://` URL, minus trailing punctuation.
fn next_web_url(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find("http") {
        let start = offset + found;
        let candidate = &text[start..];
        let end = candidate
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(candidate.len());
        let url = candidate[..end].trim_end_matches(TRAILING_PUNCTUATION);
        let host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        if host.is_some_and(|host| !host.is_empty()) {
            return Some((start, start + url.len()));
        }
        offset = start + "http".len();
    }
    None
}

fn anchor_open(href: &str) -> String {
    format!(
        "<a href=\"{}\" class=\"{LINK_CLASS}\" target=\"_blank\" rel=\"noopener noreferrer\">",
        escape_attribute(&safe_href(href))
    )
}

fn safe_href(href: &str) -> String {
    let lowered = href.trim().to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return String::new();
    }
    href.trim().to_string()
}

fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::ChatTurn;

    const NESTED_STEPS: &str = "1. Strip the jacket\n   - use the 250um tool\n2. Cleave the fiber";
    const TABLE_THEN_NOTE: &str = "| Cable | Loss |\n|---|---|\n| SMF | 0.3 dB |\n\nMeasured at 1310 nm.";
    const LINKED_ITEMS: &str = "- see [the guide](https://example.com/guide)\n- call support";
    const LINKED_CELL: &str = "| Doc |\n|---|\n| [splicing](https://example.com/splice) |";

    fn link(href: &str, label: &str) -> String {
        format!(
            "<a href=\"{href}\" class=\"text-blue-600 hover:underline\" target=\"_blank\" rel=\"noopener noreferrer\">{label}</a>"
        )
    }

    #[test]
    fn rendering_is_idempotent() {
        let inputs = [
            "# Title\n\nSee [docs](https://example.com).\n\n- a\n- b\n\n| x | y |\n|---|---|\n| 1 | 2 |",
            "Title\n===\n\n__bold__ and ~~old~~",
            NESTED_STEPS,
            TABLE_THEN_NOTE,
            LINKED_ITEMS,
            LINKED_CELL,
        ];
        for input in inputs {
            assert_eq!(render_markdown(input), render_markdown(input), "{input}");
            let turn = ChatTurn::assistant(input);
            assert_eq!(
                render_markdown(turn.content()),
                render_markdown(turn.content()),
                "{input}"
            );
        }
    }

    #[test]
    fn links_open_in_new_browsing_context() {
        let html = render_markdown("Read [the guide](https://example.com/guide) first.");
        assert_eq!(
            html,
            format!(
                "<p class=\"mb-3\">Read {} first.</p>\n",
                link("https://example.com/guide", "the guide")
            )
        );
    }

    #[test]
    fn bare_urls_are_autolinked_without_trailing_punctuation() {
        let html = render_markdown("Visit https://example.com.");
        assert_eq!(
            html,
            format!(
                "<p class=\"mb-3\">Visit {}.</p>\n",
                link("https://example.com", "https://example.com")
            )
        );
        assert!(render_markdown("Visit <https://example.com>").contains(&link(
            "https://example.com",
            "https://example.com"
        )));
    }

    #[test]
    fn script_links_lose_their_target() {
        let html = render_markdown("[click](javascript:alert(1))");
        assert!(html.contains("<a href=\"\""));
        assert!(!html.contains("javascript"));
    }

    #[test]
    fn headings_carry_level_specific_classes() {
        let html = render_markdown("# One\n## Two\n### Three\n#### Four");
        assert_eq!(
            html,
            concat!(
                "<h1 class=\"text-2xl font-bold mt-4 mb-2\">One</h1>\n",
                "<h2 class=\"text-xl font-bold mt-3 mb-2\">Two</h2>\n",
                "<h3 class=\"text-lg font-bold mt-2 mb-1\">Three</h3>\n",
                "<h4>Four</h4>\n"
            )
        );
        assert!(render_markdown("#hashtag").starts_with("<p"));
    }

    #[test]
    fn setext_headings_and_gfm_inline_styles() {
        let html = render_markdown("Title\n===\n\n__bold__ and ~~old~~");
        assert_eq!(
            html,
            concat!(
                "<h1 class=\"text-2xl font-bold mt-4 mb-2\">Title</h1>\n",
                "<p class=\"mb-3\"><strong>bold</strong> and <del>old</del></p>\n"
            )
        );
    }

    #[test]
    fn normalized_line_breaks_become_hard_breaks() {
        let turn = ChatTurn::user("first\nsecond");
        assert_eq!(
            render_markdown(turn.content()),
            "<p class=\"mb-3\">first<br />\nsecond</p>\n"
        );
        assert_eq!(
            render_markdown("soft\nwrap"),
            "<p class=\"mb-3\">soft\nwrap</p>\n"
        );
    }

    #[test]
    fn lists_render_with_fixed_styles() {
        let html = render_markdown("Steps:\n1. Strip fiber\n2. Cleave\n\n- tool\n- tape");
        assert_eq!(
            html,
            concat!(
                "<p class=\"mb-3\">Steps:</p>\n",
                "<ol class=\"list-decimal ml-6 mb-2 space-y-2\">\n",
                "<li class=\"mb-1\">Strip fiber</li>\n",
                "<li class=\"mb-1\">Cleave</li>\n",
                "</ol>\n",
                "<ul class=\"list-disc ml-6 mb-2 space-y-2\">\n",
                "<li class=\"mb-1\">tool</li>\n",
                "<li class=\"mb-1\">tape</li>\n",
                "</ul>\n"
            )
        );
        assert!(render_markdown("3. third\n4. fourth").contains("start=\"3\""));
    }

    #[test]
    fn nested_bullets_stay_inside_ordered_item() {
        let turn = ChatTurn::assistant(NESTED_STEPS);
        let html = render_markdown(turn.content());

        assert_eq!(html.matches("<ol").count(), 1);
        assert_eq!(html.matches("</ol>").count(), 1);
        assert!(!html.contains("start="));
        let nested = html.find("<ul").unwrap();
        assert!(html.find("Strip the jacket").unwrap() < nested);
        assert!(nested < html.find("</li>").unwrap());
        assert!(html.find("</ul>").unwrap() < html.find("Cleave the fiber").unwrap());
    }

    #[test]
    fn pipe_tables_render_header_and_body() {
        let html = render_markdown("| Cable | Loss |\n| :--- | ---: |\n| SMF | 0.3 dB |");
        assert_eq!(
            html,
            concat!(
                "<table class=\"border-collapse border rounded-xl border-gray-300 mb-2\">\n",
                "<thead>\n<tr>",
                "<th class=\"px-4 py-2 border-2 bg-gray-100 border-gray-300\">Cable</th>",
                "<th class=\"px-4 py-2 border-2 bg-gray-100 border-gray-300\">Loss</th>",
                "</tr>\n</thead>\n<tbody>\n",
                "<tr><td class=\"px-4 border-2 py-2 border-gray-300\">SMF</td>",
                "<td class=\"px-4 border-2 py-2 border-gray-300\">0.3 dB</td></tr>\n",
                "</tbody>\n</table>\n"
            )
        );
    }

    #[test]
    fn table_followed_by_paragraph() {
        let html = render_markdown(TABLE_THEN_NOTE);
        assert!(html.contains("</table>\n<p class=\"mb-3\">Measured at 1310 nm.</p>\n"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }

    #[test]
    fn links_inside_list_items_and_cells() {
        let items = render_markdown(LINKED_ITEMS);
        assert!(items.contains(&format!(
            "<li class=\"mb-1\">see {}</li>",
            link("https://example.com/guide", "the guide")
        )));

        let cell = render_markdown(LINKED_CELL);
        assert!(cell.contains(&format!(
            "<td class=\"px-4 border-2 py-2 border-gray-300\">{}</td>",
            link("https://example.com/splice", "splicing")
        )));
    }

    #[test]
    fn normalized_table_rows_still_parse() {
        let turn = ChatTurn::assistant("| a | b |\n|---|---|\n| 1 | 2 |");
        let html = render_markdown(turn.content());
        assert!(html.starts_with("<table"));
        assert!(html.contains("<td class=\"px-4 border-2 py-2 border-gray-300\">2</td>"));
    }

    #[test]
    fn text_is_escaped_and_inline_styles_apply() {
        let html = render_markdown("Use a <b> tag: **bold** *em* `a<b`");
        assert_eq!(
            html,
            "<p class=\"mb-3\">Use a &lt;b&gt; tag: <strong>bold</strong> <em>em</em> <code>a&lt;b</code></p>\n"
        );
    }

    #[test]
    fn fenced_code_is_verbatim() {
        let turn = ChatTurn::assistant("```sh\nls -la\n# not a heading\n```");
        assert_eq!(
            render_markdown(turn.content()),
            "<pre><code class=\"language-sh\">ls -la\n# not a heading\n</code></pre>\n"
        );
    }

    #[test]
    fn code_keeps_its_own_trailing_spaces() {
        let turn = ChatTurn::assistant("```\nindent  \nnext\n```");
        assert_eq!(
            render_markdown(turn.content()),
            "<pre><code>indent  \nnext\n</code></pre>\n"
        );
    }

    #[test]
    fn transcript_shows_welcome_until_conversation_starts() {
        let mut transcript = Transcript::new();
        assert!(render_transcript(&transcript, false).contains("Welcome to Fieldtech Co-Intelligence"));

        transcript.append(ChatTurn::user("hi"));
        let html = render_transcript(&transcript, true);
        assert!(html.contains("data-role=\"user\""));
        assert!(html.contains("aria-busy=\"true\""));
        assert!(!render_transcript(&transcript, false).contains("aria-busy"));
    }
}
