/*

A headless system
=================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::collections::HashMap;

use crate::glkapi::protocol::{FilePrompt, ResourceChunk};
use crate::output::{decode_html, StyleTarget};
use crate::scripting::ScriptValue;
use crate::{GlkSystem, Presenter};

pub type ScriptEvaluator = Box<dyn FnMut(&str) -> Result<ScriptValue, String>>;

#[derive(Clone, Debug, PartialEq)]
pub struct AppendedHtml {
    pub win: u32,
    pub html: String,
    pub classes: Vec<String>,
}

/** A system with no page, which records what it is asked to do */
pub struct HeadlessSystem {
    pub appended: Vec<AppendedHtml>,
    pub cancelled_lines: Vec<u32>,
    pub classes: HashMap<StyleTarget, Vec<String>>,
    pub evaluator: Option<ScriptEvaluator>,
    pub expect_keypress_count: u32,
    pub fatal_errors: Vec<String>,
    pub file_prompts: Vec<FilePrompt>,
    pub line_requests: Vec<(u32, String)>,
    pub navigated_away: bool,
    pub resources: HashMap<u32, ResourceChunk>,
    pub scroll_or_focus_count: u32,
    pub scroll_to_end_count: u32,
    pub scrolled_to_bottom: bool,
    /** Whether the window elements have been created */
    pub windows_ready: bool,
}

impl Default for HeadlessSystem {
    fn default() -> Self {
        HeadlessSystem {
            appended: Vec::new(),
            cancelled_lines: Vec::new(),
            classes: HashMap::new(),
            evaluator: None,
            expect_keypress_count: 0,
            fatal_errors: Vec::new(),
            file_prompts: Vec::new(),
            line_requests: Vec::new(),
            navigated_away: false,
            resources: HashMap::new(),
            scroll_or_focus_count: 0,
            scroll_to_end_count: 0,
            scrolled_to_bottom: true,
            windows_ready: true,
        }
    }
}

impl HeadlessSystem {
    pub fn with_evaluator(evaluator: impl FnMut(&str) -> Result<ScriptValue, String> + 'static) -> Self {
        HeadlessSystem {
            evaluator: Some(Box::new(evaluator)),
            ..Default::default()
        }
    }

    /** All the HTML appended to a window */
    pub fn html(&self, win: u32) -> String {
        self.appended.iter()
            .filter(|appended| appended.win == win)
            .map(|appended| appended.html.as_str())
            .collect()
    }

    /** A window's text with the HTML decoded */
    pub fn text(&self, win: u32) -> String {
        decode_html(&self.html(win))
    }
}

impl Presenter for HeadlessSystem {
    fn window_exists(&self, win: u32) -> bool {
        self.windows_ready && win < 2
    }

    fn window_append(&mut self, win: u32, html: &str, classes: &[String]) {
        self.appended.push(AppendedHtml {
            win,
            html: html.to_string(),
            classes: classes.to_vec(),
        });
    }

    fn window_clear(&mut self, win: u32) {
        self.appended.retain(|appended| appended.win != win);
    }

    fn set_classes(&mut self, target: StyleTarget, classes: &[String]) {
        self.classes.insert(target, classes.to_vec());
    }

    fn is_scrolled_to_bottom(&self) -> bool {
        self.scrolled_to_bottom
    }

    fn scroll_or_focus(&mut self) {
        self.scroll_or_focus_count += 1;
    }

    fn scroll_to_end(&mut self) {
        self.scroll_to_end_count += 1;
        self.scrolled_to_bottom = true;
    }

    fn navigate_away(&mut self) {
        self.navigated_away = true;
    }

    fn expect_keypress(&mut self) {
        self.expect_keypress_count += 1;
    }
}

impl GlkSystem for HeadlessSystem {
    fn request_line(&mut self, win: u32, initial: &str) {
        self.line_requests.push((win, initial.to_string()));
    }

    fn cancel_line(&mut self, win: u32) {
        self.cancelled_lines.push(win);
    }

    fn show_fatal_error(&mut self, message: &str) {
        self.fatal_errors.push(message.to_string());
    }

    fn prompt_file(&mut self, prompt: FilePrompt) {
        self.file_prompts.push(prompt);
    }

    fn evaluate_script(&mut self, code: &str) -> Result<ScriptValue, String> {
        match self.evaluator.as_mut() {
            Some(evaluator) => evaluator(code),
            None => Err("no script engine".to_string()),
        }
    }

    fn get_resource(&mut self, filenum: u32) -> Option<ResourceChunk> {
        self.resources.get(&filenum).cloned()
    }
}
