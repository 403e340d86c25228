/*

Output buffer and style tracker
===============================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::mem;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Presenter;

/** Font flags of a text style */
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub proportional: bool,
}

impl Default for FontStyle {
    fn default() -> Self {
        FontStyle {
            bold: false,
            italic: false,
            underline: false,
            proportional: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Black => "black",
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::Cyan => "cyan",
            Color::White => "white",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ColorPair {
    pub text: Color,
    pub background: Color,
    /** Swap text and background, as the status line does */
    pub reverse: bool,
}

/** An element whose classes follow a window's style */
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StyleTarget {
    Window(u32),
    /** The line input prompt, which follows window 0 */
    Prompt,
}

/** A user supplied output filter. Returning `None` leaves the text alone */
pub trait OutputFilter {
    fn filter(&mut self, text: &str, style: FontStyle) -> Option<String>;
}

impl<F> OutputFilter for F
where F: FnMut(&str, FontStyle) -> Option<String> {
    fn filter(&mut self, text: &str, style: FontStyle) -> Option<String> {
        self(text, style)
    }
}

/** Text whose style changed before the window could take it */
struct HeldText {
    classes: Vec<String>,
    font: FontStyle,
    html: String,
}

struct WindowOutput {
    /** The last text appended ended with a carriage return */
    after_cr: bool,
    buffer: String,
    colors: ColorPair,
    font: FontStyle,
    held: Vec<HeldText>,
}

impl WindowOutput {
    fn new(win: u32) -> Self {
        WindowOutput {
            after_cr: false,
            buffer: String::new(),
            colors: ColorPair {
                reverse: win == 1,
                ..Default::default()
            },
            font: FontStyle::default(),
            held: Vec::new(),
        }
    }

    /** Set the buffered text aside with the style it was printed in */
    fn hold(&mut self) {
        if !self.buffer.is_empty() {
            self.held.push(HeldText {
                classes: self.classes(),
                font: self.font,
                html: mem::take(&mut self.buffer),
            });
        }
    }

    fn classes(&self) -> Vec<String> {
        let mut classes = Vec::new();
        if self.font.bold {
            classes.push("font-bold".to_string());
        }
        if self.font.italic {
            classes.push("font-italic".to_string());
        }
        if self.font.underline {
            classes.push("font-underline".to_string());
        }
        if !self.font.proportional {
            classes.push("font-monospace".to_string());
        }
        if self.colors.text != Color::Default {
            classes.push(format!("color-{}", self.colors.text.name()));
        }
        if self.colors.background != Color::Default {
            classes.push(format!("bgcolor-{}", self.colors.background.name()));
        }
        if self.colors.reverse {
            classes.push("reverse".to_string());
        }
        classes
    }
}

/** Per-window text waiting to be rendered, along with each window's current style */
#[derive(Default)]
pub struct OutputBuffer {
    filters: Vec<Box<dyn OutputFilter>>,
    text_printed: bool,
    windows: Vec<WindowOutput>,
}

impl OutputBuffer {
    fn window(&mut self, win: u32) -> &mut WindowOutput {
        let index = win as usize;
        while self.windows.len() <= index {
            let next = self.windows.len() as u32;
            self.windows.push(WindowOutput::new(next));
        }
        &mut self.windows[index]
    }

    pub fn add_filter(&mut self, filter: Box<dyn OutputFilter>) {
        self.filters.push(filter);
    }

    /** Buffer some text. Everything up to the last line break is flushed straight away */
    pub fn append(&mut self, text: &str, win: u32, presenter: &mut dyn Presenter) {
        if text.is_empty() {
            return;
        }
        let output = self.window(win);
        // A CRLF pair may be split across calls
        let text = match text.strip_prefix('\n') {
            Some(rest) if output.after_cr => rest,
            _ => text,
        };
        output.after_cr = text.ends_with('\r');
        let encoded = encode_html(text);
        let buffer = &mut output.buffer;
        buffer.push_str(&encoded);
        if let Some(index) = buffer.rfind('\n') {
            let tail = buffer.split_off(index + 1);
            self.flush_window(win, presenter);
            // If the window doesn't exist yet the head stays buffered in front of the tail
            self.window(win).buffer.push_str(&tail);
        }
    }

    pub fn newline(&mut self, win: u32, presenter: &mut dyn Presenter) {
        self.window(win).after_cr = false;
        self.append("\n", win, presenter);
    }

    /** Flush one window, or all of them */
    pub fn flush(&mut self, win: Option<u32>, presenter: &mut dyn Presenter) {
        match win {
            Some(win) => self.flush_window(win, presenter),
            None => {
                for win in 0..self.windows.len() as u32 {
                    self.flush_window(win, presenter);
                }
            },
        }
    }

    fn flush_window(&mut self, win: u32, presenter: &mut dyn Presenter) {
        let Some(output) = self.windows.get_mut(win as usize) else {
            return;
        };
        // Output can start before the window elements exist
        if !presenter.window_exists(win) {
            return;
        }
        output.hold();
        let held = mem::take(&mut output.held);
        if held.is_empty() {
            return;
        }
        for segment in held {
            let mut text = segment.html;
            for (i, filter) in self.filters.iter_mut().enumerate() {
                match filter.filter(&text, segment.font) {
                    Some(filtered) => text = filtered,
                    None => trace!(filter = i, "output filter left text unchanged"),
                }
            }
            presenter.window_append(win, &text, &segment.classes);
        }
        if win == 0 {
            self.text_printed = true;
        }
    }

    /** Whether any main window text has been rendered since the last call */
    pub fn take_text_printed(&mut self) -> bool {
        mem::take(&mut self.text_printed)
    }

    pub fn has_pending(&self, win: u32) -> bool {
        self.windows.get(win as usize).is_some_and(|output| !output.buffer.is_empty() || !output.held.is_empty())
    }

    pub fn colors(&self, win: u32) -> ColorPair {
        self.windows.get(win as usize).map_or_else(|| WindowOutput::new(win).colors, |output| output.colors)
    }

    pub fn font(&self, win: u32) -> FontStyle {
        self.windows.get(win as usize).map_or_else(FontStyle::default, |output| output.font)
    }

    /** Change a window's colours. Text already buffered keeps the old colours */
    pub fn set_colors(&mut self, win: u32, colors: ColorPair, presenter: &mut dyn Presenter) {
        self.flush_window(win, presenter);
        let output = self.window(win);
        output.hold();
        output.colors = colors;
        self.apply(win, presenter);
    }

    /** Change a window's font. Text already buffered keeps the old font */
    pub fn set_font(&mut self, win: u32, font: FontStyle, presenter: &mut dyn Presenter) {
        self.flush_window(win, presenter);
        let output = self.window(win);
        output.hold();
        output.font = font;
        self.apply(win, presenter);
    }

    /** Recompute the classes of a window's element (and the prompt, for window 0) */
    pub fn apply(&mut self, win: u32, presenter: &mut dyn Presenter) {
        let classes = self.window(win).classes();
        presenter.set_classes(StyleTarget::Window(win), &classes);
        if win == 0 {
            presenter.set_classes(StyleTarget::Prompt, &classes);
        }
    }

    /** Drop anything buffered for a window that is being cleared */
    pub fn discard(&mut self, win: u32) {
        if let Some(output) = self.windows.get_mut(win as usize) {
            output.after_cr = false;
            output.buffer.clear();
            output.held.clear();
        }
    }
}

/** Escape text for the DOM. Non-ASCII characters become numeric references, and carriage returns become line feeds */
pub fn encode_html(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '&' => encoded.push_str("&amp;"),
            '<' => encoded.push_str("&lt;"),
            '>' => encoded.push_str("&gt;"),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    encoded.push('\n');
                }
            },
            ch if (ch as u32) > 127 => encoded.push_str(&format!("&#{};", ch as u32)),
            ch => encoded.push(ch),
        }
    }
    encoded
}

/** The inverse of `encode_html` */
pub fn decode_html(html: &str) -> String {
    let mut decoded = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(index) = rest.find('&') {
        decoded.push_str(&rest[..index]);
        rest = &rest[index..];
        let entity_end = rest.find(';');
        let entity = entity_end.map(|end| &rest[1..end]);
        let ch = match entity {
            Some("amp") => Some('&'),
            Some("lt") => Some('<'),
            Some("gt") => Some('>'),
            Some(entity) => entity.strip_prefix('#')
                .and_then(|num| num.parse::<u32>().ok())
                .and_then(char::from_u32),
            None => None,
        };
        match (ch, entity_end) {
            (Some(ch), Some(end)) => {
                decoded.push(ch);
                rest = &rest[end + 1..];
            },
            _ => {
                decoded.push('&');
                rest = &rest[1..];
            },
        }
    }
    decoded.push_str(rest);
    decoded
}

/** Carriage return normalisation, as `encode_html` applies it */
pub fn normalise_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::headless::{AppendedHtml, HeadlessSystem};

    #[test]
    fn encoding() {
        assert_eq!(encode_html("a<b> & c"), "a&lt;b&gt; &amp; c");
        assert_eq!(encode_html("café\r\nx\ry"), "caf&#233;\nx\ny");
        assert_eq!(decode_html("caf&#233; &amp; &lt;&gt; & stray"), "café & <> & stray");
    }

    #[test]
    fn flushes_through_last_line_break() {
        let mut system = HeadlessSystem::default();
        let mut output = OutputBuffer::default();
        output.append("one\ntwo\nthr", 0, &mut system);
        assert_eq!(system.html(0), "one\ntwo\n");
        assert!(output.has_pending(0));
        output.append("ee", 0, &mut system);
        assert_eq!(system.html(0), "one\ntwo\n");
        output.flush(None, &mut system);
        assert_eq!(system.html(0), "one\ntwo\nthree");
        assert!(output.take_text_printed());
        assert!(!output.take_text_printed());
    }

    #[test]
    fn missing_window_keeps_buffer() {
        let mut system = HeadlessSystem::default();
        system.windows_ready = false;
        let mut output = OutputBuffer::default();
        output.append("early\nmore", 0, &mut system);
        assert!(system.appended.is_empty());
        system.windows_ready = true;
        output.flush(Some(0), &mut system);
        assert_eq!(system.html(0), "early\nmore");
    }

    #[test]
    fn style_change_flushes_first() {
        let mut system = HeadlessSystem::default();
        let mut output = OutputBuffer::default();
        output.append("plain ", 0, &mut system);
        output.set_font(0, FontStyle {bold: true, ..Default::default()}, &mut system);
        output.append("bold", 0, &mut system);
        output.flush(None, &mut system);
        assert_eq!(system.appended[0].html, "plain ");
        assert!(system.appended[0].classes.is_empty());
        assert_eq!(system.appended[1].html, "bold");
        assert_eq!(system.appended[1].classes, vec!["font-bold".to_string()]);
        assert_eq!(system.classes.get(&StyleTarget::Prompt), Some(&vec!["font-bold".to_string()]));
    }

    #[test]
    fn style_change_before_the_window_exists() {
        let mut system = HeadlessSystem::default();
        system.windows_ready = false;
        let mut output = OutputBuffer::default();
        output.append("plain ", 0, &mut system);
        output.set_font(0, FontStyle {italic: true, ..Default::default()}, &mut system);
        output.append("italic", 0, &mut system);
        assert!(system.appended.is_empty());
        system.windows_ready = true;
        output.flush(None, &mut system);
        assert_eq!(system.appended, vec![
            AppendedHtml {win: 0, html: "plain ".to_string(), classes: vec![]},
            AppendedHtml {win: 0, html: "italic".to_string(), classes: vec!["font-italic".to_string()]},
        ]);
        assert!(!output.has_pending(0));
    }

    #[test]
    fn newline_flushes() {
        let mut system = HeadlessSystem::default();
        let mut output = OutputBuffer::default();
        output.append("prompt>", 0, &mut system);
        output.newline(0, &mut system);
        assert_eq!(system.html(0), "prompt>\n");
        assert!(!output.has_pending(0));
        output.append("\r", 0, &mut system);
        output.newline(0, &mut system);
        assert_eq!(system.html(0), "prompt>\n\n\n");
    }

    #[test]
    fn split_crlf_is_one_line_break() {
        let mut system = HeadlessSystem::default();
        let mut output = OutputBuffer::default();
        for piece in ["x", "\r", "\n", "y\r", "\nz\r", "", "\n"] {
            output.append(piece, 0, &mut system);
        }
        output.flush(None, &mut system);
        assert_eq!(system.html(0), encode_html("x\r\ny\r\nz\r\n"));
        assert_eq!(system.html(0), "x\ny\nz\n");

        output.append("\r", 1, &mut system);
        output.append("a\n", 1, &mut system);
        assert_eq!(system.html(1), "\na\n");
    }

    #[test]
    fn discard_drops_everything_buffered() {
        let mut system = HeadlessSystem::default();
        system.windows_ready = false;
        let mut output = OutputBuffer::default();
        output.append("old\r", 0, &mut system);
        output.set_font(0, FontStyle {bold: true, ..Default::default()}, &mut system);
        output.append("er", 0, &mut system);
        output.discard(0);
        assert!(!output.has_pending(0));
        system.windows_ready = true;
        output.append("\nnew", 0, &mut system);
        output.flush(None, &mut system);
        assert_eq!(system.html(0), "\nnew");
    }

    #[test]
    fn filters_run_in_order() {
        let mut system = HeadlessSystem::default();
        let mut output = OutputBuffer::default();
        output.add_filter(Box::new(|text: &str, _: FontStyle| Some(text.to_uppercase())));
        output.add_filter(Box::new(|_: &str, _: FontStyle| None));
        output.add_filter(Box::new(|text: &str, style: FontStyle| {
            style.bold.then(|| format!("**{text}**"))
        }));
        output.append("hi\n", 0, &mut system);
        assert_eq!(system.html(0), "HI\n");
    }

    #[test]
    fn status_window_defaults_to_reverse() {
        let output = OutputBuffer::default();
        assert!(output.colors(1).reverse);
        assert!(!output.colors(0).reverse);
    }
}
