/*

Glk Windows
===========

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::mem;
use std::num::NonZeroU32;

use super::*;

/** The one text buffer window */
pub struct Window {
    pub echostr: Option<NonZeroU32>,
    /** Incremented each time an input request is made */
    pub gen: u32,
    pub hyperlink: u32,
    pub input: InputRequest,
    pub str: NonZeroU32,
    pub style: u32,
    pub wintype: WindowType,
    accum: Vec<ContentRun>,
    cleared: bool,
}

/** What kind of keyboard input the window is waiting for */
#[derive(Default)]
pub struct InputRequest {
    pub char_request: bool,
    pub char_request_uni: bool,
    /** Line input writes into this buffer */
    pub line_request: Option<LineRequest>,
    pub echo_line_input: bool,
}

pub struct LineRequest {
    pub buf: GlkOwnedBuffer,
    pub initlen: usize,
}

impl LineRequest {
    pub fn initial_text(&self) -> String {
        (0..self.initlen.min(self.buf.len()))
            .map(|i| char::from_u32(self.buf.get_u32(i)).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl Window {
    pub fn new(str: NonZeroU32) -> Self {
        Window {
            echostr: None,
            gen: 0,
            hyperlink: 0,
            input: InputRequest {
                echo_line_input: true,
                ..Default::default()
            },
            str,
            style: style_Normal,
            wintype: WindowType::Buffer,
            accum: Vec::new(),
            cleared: false,
        }
    }

    pub fn has_keyboard_request(&self) -> bool {
        self.input.char_request || self.input.line_request.is_some()
    }

    pub fn clear(&mut self) {
        self.accum.clear();
        self.cleared = true;
    }

    /** Accumulate text, joining it to the previous run if the style hasn't changed */
    pub fn put_string(&mut self, text: &str, style: Option<u32>) {
        let style = style_name(style.unwrap_or(self.style));
        match self.accum.last_mut() {
            Some(run) if run.style == style => run.text.push_str(text),
            _ => self.accum.push(ContentRun {
                style,
                text: text.to_string(),
            }),
        }
    }

    /** Turn the accumulated runs into a content update */
    pub fn deaccumulate(&mut self, id: u32) -> Option<ContentUpdate> {
        if self.accum.is_empty() && !self.cleared {
            return None;
        }
        Some(ContentUpdate {
            id,
            clear: mem::take(&mut self.cleared),
            text: mem::take(&mut self.accum),
        })
    }
}
