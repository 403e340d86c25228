/*

The Glk API
===========

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

mod arrays;
mod common;
pub mod constants;
pub mod dispatch;
mod encoding;
mod filerefs;
mod macros;
mod objects;
pub mod protocol;
mod streams;
mod unicode;
mod windows;

use std::num::NonZeroU32;

use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span, Timestamp};
use tracing::{debug, error, info};

pub use arrays::{GlkOwnedBuffer, MAX_LATIN1, QUESTION_MARK};
use arrays::*;
pub use common::{GlkApiError, GlkResult};
use common::*;
use GlkApiError::*;
use constants::*;
use dispatch::*;
use encoding::*;
pub use encoding::{decode_utf8, encode_utf8, TextEncoding};
use filerefs::*;
use macros::*;
pub use objects::IterationResult;
use objects::*;
use protocol::*;
use streams::*;
pub use unicode::canonical_ordering;
use windows::*;

use crate::config::{GlkOptions, StyleProfile};
use crate::input::{InputMachine, InputMode, KeyEvent, LineFilter, LineFilterOutcome, SendOutcome, SubmitHook};
use crate::output::{OutputBuffer, OutputFilter};
use crate::scripting::Scripting;
use crate::vfs::{copy, join, mkdir_all, move_file, resolve, FileContent, ReadOptions, VirtualFs, WriteOptions};
use crate::GlkSystem;

/** The page index of the one window */
const MAIN_WINDOW: u32 = 0;

/** The whole state of a Glk session */
pub struct GlkApi<S: GlkSystem> {
    current_stream: Option<NonZeroU32>,
    filerefs: GlkObjectStore<FileRef>,
    fs: Box<dyn VirtualFs>,
    halted: bool,
    input: InputMachine,
    line_filters: Vec<Box<dyn LineFilter>>,
    options: GlkOptions,
    output: OutputBuffer,
    pending: Option<PendingRequest>,
    /** An event which completed before the VM called `glk_select` */
    ready: Option<Resumption>,
    root_window: Option<NonZeroU32>,
    scripting: Scripting,
    streams: GlkObjectStore<Stream>,
    styles: StyleProfile,
    system: S,
    temp_counter: u32,
    windows: GlkObjectStore<Window>,
}

impl<S: GlkSystem> GlkApi<S> {
    pub fn new(system: S, fs: Box<dyn VirtualFs>, options: GlkOptions) -> Self {
        GlkApi {
            current_stream: None,
            filerefs: GlkObjectStore::default(),
            fs,
            halted: false,
            input: InputMachine::default(),
            line_filters: Vec::new(),
            output: OutputBuffer::default(),
            pending: None,
            ready: None,
            root_window: None,
            scripting: Scripting::new(&options),
            streams: GlkObjectStore::default(),
            styles: options.style_profile.clone(),
            system,
            temp_counter: 0,
            windows: GlkObjectStore::default(),
            options,
        }
    }

    /** Prepare the file system and start buffering input. Returns false if the directories couldn't be created */
    pub fn init_session(&mut self) -> bool {
        let mut ok = self.scripting.init_session(self.fs.as_mut());
        for dir in [&self.options.data_dir, &self.options.save_dir, &self.options.transcript_dir] {
            ok &= mkdir_all(self.fs.as_mut(), dir);
        }
        if !ok {
            error!("could not prepare the file system");
        }
        self.output.apply(MAIN_WINDOW, &mut self.system);
        self.input.set_mode(InputMode::Buffer);
        info!(project = self.scripting.project(), "session started");
        ok
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    pub fn fs(&self) -> &dyn VirtualFs {
        self.fs.as_ref()
    }

    pub fn fs_mut(&mut self) -> &mut dyn VirtualFs {
        self.fs.as_mut()
    }

    pub fn options(&self) -> &GlkOptions {
        &self.options
    }

    pub fn input_mode(&self) -> InputMode {
        self.input.mode()
    }

    /** 6 or 7 once the story has made the scripting handshake */
    pub fn interpreter_version(&self) -> Option<u32> {
        self.scripting.version().map(|version| version.number())
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn add_output_filter(&mut self, filter: Box<dyn OutputFilter>) {
        self.output.add_filter(filter);
    }

    pub fn add_line_filter(&mut self, filter: Box<dyn LineFilter>) {
        self.line_filters.push(filter);
    }

    pub fn add_submit_hook(&mut self, hook: Box<dyn SubmitHook>) {
        self.input.add_submit_hook(hook);
    }

    /** Run a VM call, halting the session if it misused the API */
    fn vm_call<T>(&mut self, func: impl FnOnce(&mut Self) -> GlkResult<T>) -> GlkResult<T> {
        if self.halted {
            return Err(Halted);
        }
        let result = func(self);
        if let Err(err) = &result {
            self.fatal_error(&err.to_string());
        }
        result
    }

    /** Show an unrecoverable error and stop the session */
    pub fn fatal_error(&mut self, message: &str) {
        self.output.flush(None, &mut self.system);
        error!("fatal error: {message}");
        self.system.show_fatal_error(message);
        self.input.set_mode(InputMode::EndGame);
        self.halted = true;
        self.pending = None;
    }

    /** Flush output and show any file prompt which is waiting */
    pub fn update(&mut self) {
        self.output.flush(None, &mut self.system);
        if let Some(PendingRequest::AwaitingFileChoice {prompt, dispatched, ..}) = &mut self.pending {
            if !*dispatched {
                *dispatched = true;
                debug!(kind = ?prompt.kind, "showing file prompt");
                self.system.prompt_file(prompt.clone());
            }
        }
    }

    /** The legacy structured update of the main window, if anything changed */
    pub fn take_content_update(&mut self) -> Option<ContentUpdate> {
        self.windows.get_mut(self.root_window)?.deaccumulate(MAIN_WINDOW)
    }

    pub fn glk_exit(&mut self) {
        self.output.flush(None, &mut self.system);
        self.sync();
        self.input.set_mode(InputMode::EndGame);
        self.halted = true;
        self.pending = None;
        info!("story ended");
    }

    pub fn glk_tick(&mut self) {}

    /** Note a call to a function which is accepted but does nothing */
    pub fn glk_unsupported(&self, func: GlkFunction) -> Unsupported {
        debug!(name = func.name(), selector = func.selector(), "unsupported Glk function");
        Unsupported(func)
    }

    pub fn glk_gestalt(&self, sel: u32, val: u32) -> u32 {
        self.glk_gestalt_ext(sel, val, None)
    }

    pub fn glk_gestalt_ext(&self, sel: u32, val: u32, arr: Option<&mut [u32]>) -> u32 {
        match sel {
            gestalt_Version => GLK_VERSION,
            gestalt_CharInput => (is_printable(val) || val >= keycode_Func12) as u32,
            gestalt_LineInput => is_printable(val) as u32,
            gestalt_CharOutput => {
                let (result, glyphs) = if is_printable(val) {
                    (gestalt_CharOutput_ExactPrint, 1)
                }
                else {
                    (gestalt_CharOutput_CannotPrint, 0)
                };
                if let Some(first) = arr.and_then(|arr| arr.first_mut()) {
                    *first = glyphs;
                }
                result
            },
            gestalt_Unicode | gestalt_UnicodeNorm | gestalt_LineInputEcho | gestalt_DateTime | gestalt_ResourceStream => 1,
            _ => 0,
        }
    }

    pub fn glk_char_to_lower(&self, ch: u32) -> u32 {
        if ch > MAX_LATIN1 {ch} else {unicode::char_to_lower(ch as u8) as u32}
    }

    pub fn glk_char_to_upper(&self, ch: u32) -> u32 {
        if ch > MAX_LATIN1 {ch} else {unicode::char_to_upper(ch as u8) as u32}
    }

    pub fn glk_buffer_to_lower_case_uni(&self, buf: &mut [u32], numchars: u32) -> u32 {
        unicode::buffer_to_lower_case(buf, numchars)
    }

    pub fn glk_buffer_to_upper_case_uni(&self, buf: &mut [u32], numchars: u32) -> u32 {
        unicode::buffer_to_upper_case(buf, numchars)
    }

    pub fn glk_buffer_to_title_case_uni(&self, buf: &mut [u32], numchars: u32, lowerrest: bool) -> u32 {
        unicode::buffer_to_title_case(buf, numchars, lowerrest)
    }

    pub fn glk_buffer_canon_decompose_uni(&self, buf: &mut [u32], numchars: u32) -> u32 {
        unicode::buffer_canon_decompose(buf, numchars)
    }

    pub fn glk_buffer_canon_normalize_uni(&self, buf: &mut [u32], numchars: u32) -> u32 {
        unicode::buffer_canon_normalize(buf, numchars)
    }

    // Windows

    pub fn glk_window_open(&mut self, splitwin: Option<NonZeroU32>, _method: u32, _size: u32, wintype: u32, rock: u32) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| {
            if this.root_window.is_some() {
                debug!("only one window is supported");
                return Ok(None);
            }
            if splitwin.is_some() {
                return Err(SplitMustBeNull);
            }
            if window_type(wintype)? != WindowType::Buffer {
                debug!(wintype, "only text buffer windows are supported");
                return Ok(None);
            }
            // The stream id is filled in once the stream exists
            let win_id = this.windows.register(Window::new(NonZeroU32::MIN), rock);
            let str_id = this.streams.register(WindowStream::new(win_id).into(), 0);
            win_mut!(this, Some(win_id)).str = str_id;
            this.root_window = Some(win_id);
            let font = this.styles.get(style_Normal);
            this.output.set_font(MAIN_WINDOW, font, &mut this.system);
            Ok(Some(win_id))
        })
    }

    pub fn glk_window_close(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<ClosedStream> {
        self.vm_call(|this| {
            let id = win_id.ok_or(InvalidReference)?;
            let win = this.windows.unregister(id).ok_or(InvalidReference)?;
            if this.root_window == Some(id) {
                this.root_window = None;
            }
            this.output.flush(Some(MAIN_WINDOW), &mut this.system);
            if win.has_keyboard_request() {
                this.input.set_mode(InputMode::Buffer);
            }
            if matches!(this.pending, Some(PendingRequest::AwaitingChar {win: pending_win} | PendingRequest::AwaitingLine {win: pending_win}) if pending_win == id) {
                this.pending = None;
            }
            let mut str = this.streams.unregister(win.str).ok_or(InvalidReference)?;
            this.forget_stream(win.str);
            Ok(str.close())
        })
    }

    pub fn glk_window_clear(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            win_mut!(this, win_id).clear();
            this.output.discard(MAIN_WINDOW);
            this.system.window_clear(MAIN_WINDOW);
            Ok(())
        })
    }

    pub fn glk_window_get_echo_stream(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| Ok(win!(this, win_id).echostr))
    }

    pub fn glk_window_get_parent(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| {
            win!(this, win_id);
            Ok(None)
        })
    }

    pub fn glk_window_get_rock(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<u32> {
        self.vm_call(|this| this.windows.get_rock(win_id).ok_or(InvalidReference))
    }

    pub fn glk_window_get_root(&self) -> Option<NonZeroU32> {
        self.root_window
    }

    pub fn glk_window_get_sibling(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| {
            win!(this, win_id);
            Ok(None)
        })
    }

    /** The page lays out the text, so there is no size in characters to report */
    pub fn glk_window_get_size(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<(u32, u32)> {
        self.vm_call(|this| {
            win!(this, win_id);
            Ok((0, 0))
        })
    }

    pub fn glk_window_get_stream(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<NonZeroU32> {
        self.vm_call(|this| Ok(win!(this, win_id).str))
    }

    pub fn glk_window_get_type(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<WindowType> {
        self.vm_call(|this| Ok(win!(this, win_id).wintype))
    }

    pub fn glk_window_iterate(&self, win_id: Option<NonZeroU32>) -> Option<IterationResult> {
        self.windows.iterate(win_id)
    }

    pub fn glk_window_set_echo_stream(&mut self, win_id: Option<NonZeroU32>, str_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            if str_id.is_some() && this.streams.get(str_id).is_none() {
                return Err(InvalidReference);
            }
            let win = win_mut!(this, win_id);
            if str_id == Some(win.str) {
                debug!("ignoring a window echoing into itself");
                return Ok(());
            }
            win.echostr = str_id;
            Ok(())
        })
    }

    pub fn glk_set_window(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            this.current_stream = match win_id {
                Some(_) => Some(win!(this, win_id).str),
                None => None,
            };
            Ok(())
        })
    }

    // Styles

    pub fn glk_set_style(&mut self, val: u32) -> GlkResult<()> {
        self.glk_set_style_stream(self.current_stream, val)
    }

    pub fn glk_set_style_stream(&mut self, str_id: Option<NonZeroU32>, val: u32) -> GlkResult<()> {
        self.vm_call(|this| {
            let style = if val < style_NUMSTYLES {val} else {style_Normal};
            if let Stream::Window(str) = this.streams.get(str_id).ok_or(InvalidReference)? {
                let win = win_mut!(this, Some(str.win));
                win.style = style;
                let font = this.styles.get(style);
                this.output.set_font(MAIN_WINDOW, font, &mut this.system);
            }
            Ok(())
        })
    }

    pub fn glk_set_hyperlink(&mut self, val: u32) -> GlkResult<()> {
        self.glk_set_hyperlink_stream(self.current_stream, val)
    }

    pub fn glk_set_hyperlink_stream(&mut self, str_id: Option<NonZeroU32>, val: u32) -> GlkResult<()> {
        self.vm_call(|this| {
            if let Stream::Window(str) = this.streams.get(str_id).ok_or(InvalidReference)? {
                win_mut!(this, Some(str.win)).hyperlink = val;
            }
            Ok(())
        })
    }

    /** Only the font hints can be shown. They apply to text printed afterwards */
    pub fn glk_stylehint_set(&mut self, wintype: u32, style: u32, hint: u32, val: i32) {
        if wintype != wintype_AllTypes && wintype != wintype_TextBuffer {
            return;
        }
        let Some(font) = self.styles.get_mut(style) else {
            return;
        };
        match hint {
            stylehint_Weight => font.bold = val > 0,
            stylehint_Oblique => font.italic = val != 0,
            stylehint_Proportional => font.proportional = val != 0,
            _ => debug!(hint, "ignoring style hint"),
        }
    }

    pub fn glk_stylehint_clear(&mut self, wintype: u32, style: u32, hint: u32) {
        if wintype != wintype_AllTypes && wintype != wintype_TextBuffer {
            return;
        }
        let default = self.options.style_profile.get(style);
        let Some(font) = self.styles.get_mut(style) else {
            return;
        };
        match hint {
            stylehint_Weight => font.bold = default.bold,
            stylehint_Oblique => font.italic = default.italic,
            stylehint_Proportional => font.proportional = default.proportional,
            _ => {},
        }
    }

    pub fn glk_style_distinguish(&mut self, win_id: Option<NonZeroU32>, style1: u32, style2: u32) -> GlkResult<bool> {
        self.vm_call(|this| {
            win!(this, win_id);
            Ok(this.styles.get(style1) != this.styles.get(style2))
        })
    }

    pub fn glk_style_measure(&mut self, win_id: Option<NonZeroU32>, style: u32, hint: u32) -> GlkResult<Option<u32>> {
        self.vm_call(|this| {
            win!(this, win_id);
            let font = this.styles.get(style);
            Ok(match hint {
                stylehint_Weight => Some(font.bold as u32),
                stylehint_Oblique => Some(font.italic as u32),
                stylehint_Proportional => Some(font.proportional as u32),
                _ => None,
            })
        })
    }

    // Output

    pub fn glk_put_buffer(&mut self, buf: &[u8]) -> GlkResult<()> {
        self.glk_put_buffer_stream(self.current_stream, buf)
    }

    pub fn glk_put_buffer_stream(&mut self, str_id: Option<NonZeroU32>, buf: &[u8]) -> GlkResult<()> {
        self.vm_call(|this| this.put(str_id, &GlkBuffer::U8(buf)))
    }

    pub fn glk_put_buffer_stream_uni(&mut self, str_id: Option<NonZeroU32>, buf: &[u32]) -> GlkResult<()> {
        self.vm_call(|this| this.put(str_id, &GlkBuffer::U32(buf)))
    }

    pub fn glk_put_buffer_uni(&mut self, buf: &[u32]) -> GlkResult<()> {
        self.glk_put_buffer_stream_uni(self.current_stream, buf)
    }

    pub fn glk_put_char(&mut self, ch: u8) -> GlkResult<()> {
        self.glk_put_buffer_stream(self.current_stream, &[ch])
    }

    pub fn glk_put_char_stream(&mut self, str_id: Option<NonZeroU32>, ch: u8) -> GlkResult<()> {
        self.glk_put_buffer_stream(str_id, &[ch])
    }

    pub fn glk_put_char_stream_uni(&mut self, str_id: Option<NonZeroU32>, ch: u32) -> GlkResult<()> {
        self.glk_put_buffer_stream_uni(str_id, &[ch])
    }

    pub fn glk_put_char_uni(&mut self, ch: u32) -> GlkResult<()> {
        self.glk_put_buffer_stream_uni(self.current_stream, &[ch])
    }

    /** A Latin-1 string, without its terminator */
    pub fn glk_put_string(&mut self, text: &[u8]) -> GlkResult<()> {
        self.glk_put_buffer(text)
    }

    pub fn glk_put_string_stream(&mut self, str_id: Option<NonZeroU32>, text: &[u8]) -> GlkResult<()> {
        self.glk_put_buffer_stream(str_id, text)
    }

    pub fn glk_put_string_stream_uni(&mut self, str_id: Option<NonZeroU32>, text: &[u32]) -> GlkResult<()> {
        self.glk_put_buffer_stream_uni(str_id, text)
    }

    pub fn glk_put_string_uni(&mut self, text: &[u32]) -> GlkResult<()> {
        self.glk_put_buffer_uni(text)
    }

    fn put(&mut self, str_id: Option<NonZeroU32>, buf: &GlkBuffer) -> GlkResult<()> {
        stream_op!(self, str_id, |str: &mut Stream| str.put_buffer(buf))?;
        let Some(Stream::Window(str)) = self.streams.get_mut(str_id) else {
            return Ok(());
        };
        let win_id = str.win;
        let text = str.take_pending();
        self.window_put_string(win_id, &text, None)
    }

    /** Send text to the page, and on to the window's echo stream */
    fn window_put_string(&mut self, win_id: NonZeroU32, text: &str, style: Option<u32>) -> GlkResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let win = win_mut!(self, Some(win_id));
        if win.input.line_request.is_some() {
            return Err(PendingKeyboardRequest);
        }
        win.put_string(text, style);
        let echostr = win.echostr;
        self.output.append(text, MAIN_WINDOW, &mut self.system);
        if let Some(echo) = echostr {
            let chars: Vec<u32> = text.chars().map(|ch| ch as u32).collect();
            self.put(Some(echo), &GlkBuffer::U32(&chars))?;
        }
        Ok(())
    }

    // Reading

    pub fn glk_get_buffer_stream(&mut self, str_id: Option<NonZeroU32>, buf: &mut [u8]) -> GlkResult<u32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_buffer(&mut GlkBufferMut::U8(buf))))
    }

    pub fn glk_get_buffer_stream_uni(&mut self, str_id: Option<NonZeroU32>, buf: &mut [u32]) -> GlkResult<u32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_buffer(&mut GlkBufferMut::U32(buf))))
    }

    pub fn glk_get_char_stream(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<i32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_char(false)))
    }

    pub fn glk_get_char_stream_uni(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<i32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_char(true)))
    }

    pub fn glk_get_line_stream(&mut self, str_id: Option<NonZeroU32>, buf: &mut [u8]) -> GlkResult<u32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_line(&mut GlkBufferMut::U8(buf))))
    }

    pub fn glk_get_line_stream_uni(&mut self, str_id: Option<NonZeroU32>, buf: &mut [u32]) -> GlkResult<u32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| str.get_line(&mut GlkBufferMut::U32(buf))))
    }

    // Streams

    pub fn glk_stream_close(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<ClosedStream> {
        self.vm_call(|this| {
            let id = str_id.ok_or(InvalidReference)?;
            if let Some(Stream::Window(_)) = this.streams.get(str_id) {
                return Err(CannotCloseWindowStream);
            }
            let mut str = this.streams.unregister(id).ok_or(InvalidReference)?;
            this.forget_stream(id);
            if let Stream::File(file) = &str {
                if file.is_writable() {
                    this.write_back(file);
                }
            }
            Ok(str.close())
        })
    }

    /** Remove references to a stream which is going away */
    fn forget_stream(&mut self, str_id: NonZeroU32) {
        if self.current_stream == Some(str_id) {
            self.current_stream = None;
        }
        for win_id in self.windows.ids() {
            if let Some(win) = self.windows.get_mut(Some(win_id)) {
                if win.echostr == Some(str_id) {
                    win.echostr = None;
                }
            }
        }
    }

    /** Write a closed or dirty file stream to storage. Closing the evaluate file runs its script instead */
    fn write_back(&mut self, file: &FileStream) -> bool {
        if self.scripting.is_eval(&file.path) {
            let system = &mut self.system;
            return self.scripting.evaluate(self.fs.as_mut(), file.data(), |code| system.evaluate_script(code));
        }
        let written = self.scripting.write_bytes(self.fs.as_mut(), &file.path, file.data(), false);
        if !written {
            error!(path = %file.path, "could not write file");
        }
        if file.filetype == FileType::SavedGame {
            self.fs.syncfs();
        }
        written
    }

    pub fn glk_stream_get_current(&self) -> Option<NonZeroU32> {
        self.current_stream
    }

    pub fn glk_stream_get_position(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<u32> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| Ok(str.get_position())))
    }

    pub fn glk_stream_get_rock(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<u32> {
        self.vm_call(|this| this.streams.get_rock(str_id).ok_or(InvalidReference))
    }

    pub fn glk_stream_iterate(&self, str_id: Option<NonZeroU32>) -> Option<IterationResult> {
        self.streams.iterate(str_id)
    }

    pub fn glk_stream_open_file(&mut self, fref_id: Option<NonZeroU32>, fmode: u32, rock: u32) -> GlkResult<Option<NonZeroU32>> {
        self.open_file(fref_id, fmode, rock, false)
    }

    pub fn glk_stream_open_file_uni(&mut self, fref_id: Option<NonZeroU32>, fmode: u32, rock: u32) -> GlkResult<Option<NonZeroU32>> {
        self.open_file(fref_id, fmode, rock, true)
    }

    fn open_file(&mut self, fref_id: Option<NonZeroU32>, fmode: u32, rock: u32, uni: bool) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| {
            let fmode = file_mode(fmode)?;
            let fref = this.filerefs.get(fref_id).ok_or(InvalidReference)?.clone();
            let existing = this.scripting.read_bytes(this.fs.as_ref(), &fref.path);
            let data = match (fmode, existing) {
                (FileMode::Read, None) => {
                    debug!(path = %fref.path, "file to read does not exist");
                    return Ok(None);
                },
                (FileMode::Write, _) => Vec::new(),
                (_, existing) => existing.unwrap_or_default(),
            };
            let str = FileStream::new(fref.path, fref.filetype, data, TextEncoding::new(uni, fref.binary), fmode);
            Ok(Some(this.streams.register(str.into(), rock)))
        })
    }

    pub fn glk_stream_open_memory(&mut self, buf: Option<Box<[u8]>>, fmode: u32, rock: u32) -> GlkResult<NonZeroU32> {
        self.open_memory(buf.map(GlkOwnedBuffer::U8), fmode, rock)
    }

    pub fn glk_stream_open_memory_uni(&mut self, buf: Option<Box<[u32]>>, fmode: u32, rock: u32) -> GlkResult<NonZeroU32> {
        self.open_memory(buf.map(GlkOwnedBuffer::U32), fmode, rock)
    }

    fn open_memory(&mut self, buf: Option<GlkOwnedBuffer>, fmode: u32, rock: u32) -> GlkResult<NonZeroU32> {
        self.vm_call(|this| {
            let fmode = file_mode(fmode)?;
            if fmode == FileMode::WriteAppend {
                return Err(IllegalFilemode);
            }
            let str: Stream = match buf {
                Some(buf) if !buf.is_empty() => MemoryStream::new(buf, fmode).into(),
                _ => NullStream::default().into(),
            };
            Ok(this.streams.register(str, rock))
        })
    }

    pub fn glk_stream_open_resource(&mut self, filenum: u32, rock: u32) -> GlkResult<Option<NonZeroU32>> {
        self.open_resource(filenum, rock, false)
    }

    pub fn glk_stream_open_resource_uni(&mut self, filenum: u32, rock: u32) -> GlkResult<Option<NonZeroU32>> {
        self.open_resource(filenum, rock, true)
    }

    fn open_resource(&mut self, filenum: u32, rock: u32, uni: bool) -> GlkResult<Option<NonZeroU32>> {
        self.vm_call(|this| {
            let Some(chunk) = this.system.get_resource(filenum) else {
                debug!(filenum, "no such resource");
                return Ok(None);
            };
            let str = ByteStream::new(chunk.data, TextEncoding::new(uni, chunk.binary), FileMode::Read);
            Ok(Some(this.streams.register(str.into(), rock)))
        })
    }

    pub fn glk_stream_set_current(&mut self, str_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            if str_id.is_some() && this.streams.get(str_id).is_none() {
                return Err(InvalidReference);
            }
            this.current_stream = str_id;
            Ok(())
        })
    }

    pub fn glk_stream_set_position(&mut self, str_id: Option<NonZeroU32>, pos: i32, mode: u32) -> GlkResult<()> {
        self.vm_call(|this| stream_op!(this, str_id, |str: &mut Stream| {
            str.set_position(seek_mode(mode), pos);
            Ok(())
        }))
    }

    /** Write out file streams which have been dirty for too long */
    pub fn flush_dirty_files(&mut self, now: Timestamp) {
        let limit = SignedDuration::from_secs(self.options.dirty_flush_secs as i64);
        self.write_dirty_files(|since| now.duration_since(since) >= limit);
    }

    /** Write out every dirty file stream, then persist the file system */
    pub fn sync(&mut self) {
        self.write_dirty_files(|_| true);
        self.fs.syncfs();
    }

    fn write_dirty_files(&mut self, due: impl Fn(Timestamp) -> bool) {
        for str_id in self.streams.ids() {
            let Some(Stream::File(file)) = self.streams.get_mut(Some(str_id)) else {
                continue;
            };
            // The evaluate file only means something once it is closed
            if self.scripting.is_eval(&file.path) || !file.dirty_since.is_some_and(&due) {
                continue;
            }
            file.dirty_since = None;
            if !self.scripting.write_bytes(self.fs.as_mut(), &file.path, file.data(), false) {
                error!(path = %file.path, "could not write file");
            }
        }
    }

    // Filerefs

    pub fn glk_fileref_create_by_name(&mut self, usage: u32, name: &str, rock: u32) -> GlkResult<NonZeroU32> {
        self.vm_call(|this| {
            let path = match this.scripting.scripting_path(name) {
                Some(path) => path,
                None => {
                    let filetype = file_type(usage);
                    join(this.options.dir_for(filetype), &with_suffix(&clean_filename(name), filetype))
                },
            };
            Ok(this.filerefs.register(FileRef::new(path, usage), rock))
        })
    }

    /** Ask the player to choose a file. The VM waits until `resume_file_prompt` is called */
    pub fn glk_fileref_create_by_prompt(&mut self, usage: u32, fmode: u32, rock: u32) -> GlkResult<CallResult> {
        self.vm_call(|this| {
            if this.pending.is_some() {
                return Err(RequestPending);
            }
            let fmode = file_mode(fmode)?;
            let filetype = file_type(usage);
            let mut existing = this.fs.readdir(this.options.dir_for(filetype)).unwrap_or_default();
            existing.sort();
            let prompt = FilePrompt::new(filetype, fmode, this.options.gameid.clone(), existing);
            this.pending = Some(PendingRequest::AwaitingFileChoice {
                prompt,
                usage,
                rock,
                dispatched: false,
            });
            this.update();
            Ok(CallResult::DidNotReturn)
        })
    }

    /** Complete a file prompt with the player's choice, or `None` if they cancelled */
    pub fn resume_file_prompt(&mut self, choice: Option<&str>) -> GlkResult<Resumption> {
        if self.halted {
            return Err(Halted);
        }
        let (prompt, usage, rock) = match self.pending.take() {
            Some(PendingRequest::AwaitingFileChoice {prompt, usage, rock, ..}) => (prompt, usage, rock),
            Some(other) => {
                self.pending = Some(other);
                return Err(WrongPendingRequest);
            },
            None => return Err(NoPendingRequest),
        };
        let Some(name) = choice else {
            debug!("file prompt cancelled");
            return Ok(Resumption::FileRef(None));
        };
        let dir = self.options.dir_for(prompt.filetype);
        let path = join(dir, &with_suffix(&clean_filename(name), prompt.filetype));
        if !mkdir_all(self.fs.as_mut(), dir) {
            error!(dir, "could not create directory");
        }
        Ok(Resumption::FileRef(Some(self.filerefs.register(FileRef::new(path, usage), rock))))
    }

    pub fn glk_fileref_create_from_fileref(&mut self, usage: u32, fref_id: Option<NonZeroU32>, rock: u32) -> GlkResult<NonZeroU32> {
        self.vm_call(|this| {
            let path = this.filerefs.get(fref_id).ok_or(InvalidReference)?.path.clone();
            Ok(this.filerefs.register(FileRef::new(path, usage), rock))
        })
    }

    pub fn glk_fileref_create_temp(&mut self, usage: u32, rock: u32) -> GlkResult<NonZeroU32> {
        self.vm_call(|this| {
            this.temp_counter += 1;
            let name = format!("_glktemp{}{}", this.temp_counter, filetype_suffix(file_type(usage)));
            let path = join(&this.options.data_dir, &name);
            Ok(this.filerefs.register(FileRef::new(path, usage), rock))
        })
    }

    pub fn glk_fileref_delete_file(&mut self, fref_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            let path = &this.filerefs.get(fref_id).ok_or(InvalidReference)?.path;
            if this.fs.exists(path) {
                this.fs.unlink(path);
            }
            Ok(())
        })
    }

    pub fn glk_fileref_destroy(&mut self, fref_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            this.filerefs.unregister(fref_id.ok_or(InvalidReference)?).ok_or(InvalidReference)?;
            Ok(())
        })
    }

    /** The handshake file always exists, so the story can always read the acknowledgement */
    pub fn glk_fileref_does_file_exist(&mut self, fref_id: Option<NonZeroU32>) -> GlkResult<bool> {
        self.vm_call(|this| {
            let path = &this.filerefs.get(fref_id).ok_or(InvalidReference)?.path;
            Ok(this.scripting.is_handshake(path) || this.fs.exists(path))
        })
    }

    pub fn glk_fileref_get_rock(&mut self, fref_id: Option<NonZeroU32>) -> GlkResult<u32> {
        self.vm_call(|this| this.filerefs.get_rock(fref_id).ok_or(InvalidReference))
    }

    pub fn glk_fileref_iterate(&self, fref_id: Option<NonZeroU32>) -> Option<IterationResult> {
        self.filerefs.iterate(fref_id)
    }

    // Input

    pub fn glk_request_char_event(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.request_char_event(win_id, false)
    }

    pub fn glk_request_char_event_uni(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.request_char_event(win_id, true)
    }

    fn request_char_event(&mut self, win_id: Option<NonZeroU32>, uni: bool) -> GlkResult<()> {
        self.vm_call(|this| {
            let win = win_mut!(this, win_id);
            if win.has_keyboard_request() {
                return Err(PendingKeyboardRequest);
            }
            win.input.char_request = true;
            win.input.char_request_uni = uni;
            win.gen += 1;
            this.output.flush(None, &mut this.system);
            if let Some(outcome) = this.input.wait(&mut this.system) {
                this.complete_send(outcome);
            }
            Ok(())
        })
    }

    pub fn glk_request_line_event(&mut self, win_id: Option<NonZeroU32>, buf: Box<[u8]>, initlen: u32) -> GlkResult<()> {
        self.request_line_event(win_id, GlkOwnedBuffer::U8(buf), initlen)
    }

    pub fn glk_request_line_event_uni(&mut self, win_id: Option<NonZeroU32>, buf: Box<[u32]>, initlen: u32) -> GlkResult<()> {
        self.request_line_event(win_id, GlkOwnedBuffer::U32(buf), initlen)
    }

    fn request_line_event(&mut self, win_id: Option<NonZeroU32>, buf: GlkOwnedBuffer, initlen: u32) -> GlkResult<()> {
        self.vm_call(|this| {
            let win = win_mut!(this, win_id);
            if win.has_keyboard_request() {
                return Err(PendingKeyboardRequest);
            }
            let request = LineRequest {
                buf,
                initlen: initlen as usize,
            };
            let initial = request.initial_text();
            win.input.line_request = Some(request);
            win.gen += 1;
            this.output.flush(None, &mut this.system);
            this.input.set_mode(InputMode::GetLine);
            this.system.request_line(MAIN_WINDOW, &initial);
            Ok(())
        })
    }

    pub fn glk_cancel_char_event(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<()> {
        self.vm_call(|this| {
            let win = win_mut!(this, win_id);
            win.input.char_request = false;
            if this.input.mode() == InputMode::GetKey {
                this.input.set_mode(InputMode::Buffer);
            }
            if matches!(&this.ready, Some(Resumption::Event(event)) if event.evtype == GlkEventType::Char && event.win == win_id) {
                this.ready = None;
            }
            Ok(())
        })
    }

    /** Returns the line event and the buffer, if a line request was cancelled */
    pub fn glk_cancel_line_event(&mut self, win_id: Option<NonZeroU32>) -> GlkResult<Option<(GlkEvent, GlkOwnedBuffer)>> {
        self.vm_call(|this| {
            let win = win_mut!(this, win_id);
            let Some(request) = win.input.line_request.take() else {
                return Ok(None);
            };
            let echo = win.input.echo_line_input;
            let partial = request.initial_text();
            let count = request.initlen.min(request.buf.len()) as u32;
            this.input.set_mode(InputMode::Buffer);
            this.system.cancel_line(MAIN_WINDOW);
            if echo && !partial.is_empty() {
                this.echo_line(win_id.ok_or(InvalidReference)?, &partial)?;
            }
            let event = GlkEvent {
                evtype: GlkEventType::Line,
                win: win_id,
                val1: count,
                val2: 0,
            };
            Ok(Some((event, request.buf)))
        })
    }

    pub fn glk_set_echo_line_event(&mut self, win_id: Option<NonZeroU32>, val: u32) -> GlkResult<()> {
        self.vm_call(|this| {
            win_mut!(this, win_id).input.echo_line_input = val != 0;
            Ok(())
        })
    }

    /** Wait for an event. If one has already arrived it is returned straight away */
    pub fn glk_select(&mut self) -> GlkResult<CallResult> {
        self.vm_call(|this| {
            if this.pending.is_some() {
                return Err(RequestPending);
            }
            this.update();
            if let Some(ready) = this.ready.take() {
                return Ok(CallResult::Returned(ready));
            }
            let win_id = this.root_window.ok_or(NoPendingRequest)?;
            let win = win!(this, Some(win_id));
            let request = if win.input.line_request.is_some() {
                PendingRequest::AwaitingLine {win: win_id}
            }
            else if win.input.char_request {
                PendingRequest::AwaitingChar {win: win_id}
            }
            else {
                return Err(NoPendingRequest);
            };
            this.pending = Some(request);
            Ok(CallResult::DidNotReturn)
        })
    }

    /** There are no timer or arrange events, so polling never finds anything */
    pub fn glk_select_poll(&mut self) -> GlkEvent {
        self.output.flush(None, &mut self.system);
        GlkEvent::default()
    }

    /** A keypress or click from the page. Returns the resumption if the VM was waiting for it */
    pub fn send_key(&mut self, event: KeyEvent) -> Option<Resumption> {
        let outcome = self.input.send(event, &mut self.system);
        self.complete_send(outcome)
    }

    /** A synthetic keypress, delivered even if the page isn't scrolled down */
    pub fn send_char(&mut self, key: u32) -> Option<Resumption> {
        self.send_key(KeyEvent {
            force: true,
            ..KeyEvent::key(key)
        })
    }

    /** Deliver a keypress held back by a submit hook */
    pub fn resolve_deferred_keypress(&mut self) -> Option<Resumption> {
        let key = self.input.resolve_deferred()?;
        self.complete_char(key)
    }

    /** Whether typed-ahead keys are waiting. Newly printed text is scrolled into view first */
    pub fn is_key_waiting(&mut self) -> bool {
        self.output.flush(None, &mut self.system);
        if self.output.take_text_printed() {
            self.system.scroll_or_focus();
        }
        self.input.is_waiting()
    }

    pub fn take_buffered_key(&mut self) -> Option<u32> {
        self.input.take_buffered()
    }

    fn complete_send(&mut self, outcome: SendOutcome) -> Option<Resumption> {
        match outcome {
            SendOutcome::Delivered(key) => self.complete_char(key),
            _ => None,
        }
    }

    fn complete_char(&mut self, key: u32) -> Option<Resumption> {
        let win_id = self.root_window?;
        let win = self.windows.get_mut(Some(win_id))?;
        if !win.input.char_request {
            debug!(key, "no character request for keypress");
            return None;
        }
        win.input.char_request = false;
        // Latin-1 requests can't take other characters, but the special keycodes still pass
        let key = if !win.input.char_request_uni && key > MAX_LATIN1 && key < keycode_Func12 {QUESTION_MARK} else {key};
        self.resume(Resumption::Event(GlkEvent {
            evtype: GlkEventType::Char,
            win: Some(win_id),
            val1: key,
            val2: 0,
        }))
    }

    /** Submit a line of input from the prompt */
    pub fn send_line(&mut self, text: &str) -> GlkResult<Option<Resumption>> {
        if self.halted {
            return Err(Halted);
        }
        let win_id = self.root_window.ok_or(NoPendingRequest)?;
        if !self.windows.get(Some(win_id)).is_some_and(|win| win.input.line_request.is_some()) {
            return Err(NoPendingRequest);
        }
        let mut line = text.to_string();
        for filter in self.line_filters.iter_mut() {
            match filter.filter(&line) {
                LineFilterOutcome::Keep => {},
                LineFilterOutcome::Replace(replacement) => line = replacement,
                LineFilterOutcome::Reject => {
                    debug!(%line, "line rejected by filter");
                    return Ok(None);
                },
            }
        }
        let win = win_mut!(self, Some(win_id));
        let mut request = win.input.line_request.take().ok_or(NoPendingRequest)?;
        let echo = win.input.echo_line_input;
        let mut count = 0;
        for (i, ch) in line.chars().take(request.buf.len()).enumerate() {
            request.buf.set_u32(i, ch as u32);
            count += 1;
        }
        self.input.set_mode(InputMode::Buffer);
        if echo {
            self.echo_line(win_id, &line)?;
        }
        let event = GlkEvent {
            evtype: GlkEventType::Line,
            win: Some(win_id),
            val1: count,
            val2: 0,
        };
        Ok(self.resume(Resumption::Line(event, request.buf)))
    }

    /** Print a line of input in the input style */
    fn echo_line(&mut self, win_id: NonZeroU32, line: &str) -> GlkResult<()> {
        let style = win!(self, Some(win_id)).style;
        self.output.set_font(MAIN_WINDOW, self.styles.get(style_Input), &mut self.system);
        self.window_put_string(win_id, &format!("{line}\n"), Some(style_Input))?;
        self.output.set_font(MAIN_WINDOW, self.styles.get(style), &mut self.system);
        Ok(())
    }

    /** Hand a completed event to a waiting `glk_select`, or keep it for the next one */
    fn resume(&mut self, resumption: Resumption) -> Option<Resumption> {
        if matches!(self.pending, Some(PendingRequest::AwaitingChar {..} | PendingRequest::AwaitingLine {..})) {
            self.pending = None;
            return Some(resumption);
        }
        self.ready = Some(resumption);
        None
    }

    // Time

    pub fn glk_current_time(&self) -> GlkTimeval {
        timestamp_to_timeval(Timestamp::now())
    }

    pub fn glk_current_simple_time(&self, factor: u32) -> i32 {
        if factor == 0 {
            return 0;
        }
        Timestamp::now().as_second().div_euclid(factor as i64) as i32
    }

    pub fn glk_date_to_simple_time_utc(&self, date: &GlkDate, factor: u32) -> i32 {
        match date_to_timestamp(date) {
            Some(timestamp) if factor > 0 => timestamp.as_second().div_euclid(factor as i64) as i32,
            _ => -1,
        }
    }

    pub fn glk_date_to_time_utc(&self, date: &GlkDate) -> GlkTimeval {
        match date_to_timestamp(date) {
            Some(timestamp) => timestamp_to_timeval(timestamp),
            None => GlkTimeval {
                high_sec: -1,
                low_sec: u32::MAX,
                microsec: -1,
            },
        }
    }

    pub fn glk_simple_time_to_date_utc(&self, time: i32, factor: u32) -> GlkDate {
        Timestamp::from_second(time as i64 * factor as i64)
            .map(timestamp_to_date)
            .unwrap_or_default()
    }

    pub fn glk_time_to_date_utc(&self, time: &GlkTimeval) -> GlkDate {
        timeval_to_timestamp(time)
            .map(timestamp_to_date)
            .unwrap_or_default()
    }

    // Files for the host

    /** Read a file, relative to the data directory */
    pub fn read_file(&self, path: &str, options: ReadOptions) -> Option<FileContent> {
        self.scripting.read_file(self.fs.as_ref(), path, options)
    }

    /** Write a file, relative to the data directory */
    pub fn write_file(&mut self, path: &str, content: FileContent, options: WriteOptions) -> bool {
        self.scripting.write_file(self.fs.as_mut(), path, content, options)
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.fs.exists(&resolve(&self.options.data_dir, path))
    }

    pub fn copy_file(&mut self, from: &str, to: &str, replace: bool) -> bool {
        let from = resolve(&self.options.data_dir, from);
        let to = resolve(&self.options.data_dir, to);
        copy(self.fs.as_mut(), &from, &to, replace)
    }

    pub fn move_file(&mut self, from: &str, to: &str, replace: bool) -> bool {
        let from = resolve(&self.options.data_dir, from);
        let to = resolve(&self.options.data_dir, to);
        move_file(self.fs.as_mut(), &from, &to, replace)
    }

    /** Remove an empty directory */
    pub fn remove_dir(&mut self, path: &str) -> bool {
        let path = resolve(&self.options.data_dir, path);
        self.fs.rmdir(&path)
    }
}

fn is_printable(ch: u32) -> bool {
    matches!(ch, 32..=126 | 160..=0xD7FF | 0xE000..=0x10FFFF)
}

fn timestamp_to_timeval(timestamp: Timestamp) -> GlkTimeval {
    let secs = timestamp.as_second();
    GlkTimeval {
        high_sec: (secs >> 32) as i32,
        low_sec: secs as u32,
        microsec: timestamp.subsec_microsecond(),
    }
}

fn timeval_to_timestamp(time: &GlkTimeval) -> Option<Timestamp> {
    let secs = ((time.high_sec as i64) << 32) | time.low_sec as i64;
    let micros = secs.checked_mul(1_000_000)?.checked_add(time.microsec as i64)?;
    Timestamp::from_microsecond(micros).ok()
}

fn timestamp_to_date(timestamp: Timestamp) -> GlkDate {
    let date = timestamp.to_zoned(TimeZone::UTC);
    GlkDate {
        year: date.year() as i32,
        month: date.month() as i32,
        day: date.day() as i32,
        weekday: date.weekday().to_sunday_zero_offset() as i32,
        hour: date.hour() as i32,
        minute: date.minute() as i32,
        second: date.second() as i32,
        microsec: date.subsec_nanosecond() / 1000,
    }
}

/** Out of range fields carry over into the next larger unit, so 32 January is 1 February */
fn date_to_timestamp(date: &GlkDate) -> Option<Timestamp> {
    let year = i16::try_from(date.year).ok()?;
    let mut datetime: DateTime = Date::new(year, 1, 1).ok()?.at(0, 0, 0, 0);
    let spans = [
        Span::new().try_months(date.month as i64 - 1),
        Span::new().try_days(date.day as i64 - 1),
        Span::new().try_hours(date.hour as i64),
        Span::new().try_minutes(date.minute as i64),
        Span::new().try_seconds(date.second as i64),
        Span::new().try_microseconds(date.microsec as i64),
    ];
    for span in spans {
        datetime = datetime.checked_add(span.ok()?).ok()?;
    }
    Some(datetime.to_zoned(TimeZone::UTC).ok()?.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::headless::HeadlessSystem;
    use crate::vfs::MemoryFs;

    fn session() -> GlkApi<HeadlessSystem> {
        let mut glkapi = GlkApi::new(HeadlessSystem::default(), Box::new(MemoryFs::default()), GlkOptions::default());
        glkapi.init_session();
        glkapi
    }

    fn open_window(glkapi: &mut GlkApi<HeadlessSystem>) -> NonZeroU32 {
        let win = glkapi.glk_window_open(None, 0, 0, wintype_TextBuffer, 0).unwrap().unwrap();
        glkapi.glk_set_window(Some(win)).unwrap();
        win
    }

    #[test]
    fn only_one_buffer_window() {
        let mut glkapi = session();
        assert_eq!(glkapi.glk_window_open(None, 0, 0, wintype_TextGrid, 0), Ok(None));
        let win = open_window(&mut glkapi);
        assert_eq!(glkapi.glk_window_get_root(), Some(win));
        assert_eq!(glkapi.glk_window_open(Some(win), 0, 0, wintype_TextBuffer, 0), Ok(None));
        assert_eq!(glkapi.glk_window_iterate(None).map(|result| result.id), Some(win));
        assert_eq!(glkapi.glk_window_get_parent(Some(win)), Ok(None));
    }

    #[test]
    fn split_for_first_window_is_fatal() {
        let mut glkapi = session();
        let bogus = NonZeroU32::new(5);
        assert_eq!(glkapi.glk_window_open(bogus, 0, 0, wintype_TextBuffer, 0), Err(SplitMustBeNull));
        assert!(glkapi.is_halted());
        assert_eq!(glkapi.system().fatal_errors, vec!["splitwin must be null for first window".to_string()]);
        assert_eq!(glkapi.input_mode(), InputMode::EndGame);
        assert_eq!(glkapi.glk_window_open(None, 0, 0, wintype_TextBuffer, 0), Err(Halted));
    }

    #[test]
    fn window_stream_cannot_be_closed() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        let str = glkapi.glk_window_get_stream(Some(win)).unwrap();
        assert_eq!(glkapi.glk_stream_close(Some(str)), Err(CannotCloseWindowStream));
    }

    #[test]
    fn output_reaches_the_page_and_the_echo_stream() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        let mem = glkapi.glk_stream_open_memory(Some(vec![0; 8].into_boxed_slice()), filemode_Write, 0).unwrap();
        glkapi.glk_window_set_echo_stream(Some(win), Some(mem)).unwrap();
        glkapi.glk_put_string(b"Hi <you>\n").unwrap();
        assert_eq!(glkapi.system().html(0), "Hi &lt;you&gt;\n");

        let closed = glkapi.glk_stream_close(Some(mem)).unwrap();
        assert_eq!(closed.write_count, 9);
        assert_eq!(closed.buffer, Some(GlkOwnedBuffer::U8(Box::new(*b"Hi <you>"))));
        assert_eq!(glkapi.glk_window_get_echo_stream(Some(win)), Ok(None));
    }

    #[test]
    fn crlf_split_across_calls_is_one_line_break() {
        let mut whole = session();
        open_window(&mut whole);
        whole.glk_put_string(b"x\r\ny").unwrap();
        whole.update();

        let mut by_char = session();
        open_window(&mut by_char);
        for &ch in b"x\r\ny" {
            by_char.glk_put_char(ch).unwrap();
        }
        by_char.update();
        assert_eq!(whole.system().html(0), "x\ny");
        assert_eq!(by_char.system().html(0), "x\ny");
    }

    #[test]
    fn clearing_drops_unflushed_text() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        glkapi.glk_put_string(b"gone").unwrap();
        glkapi.glk_window_clear(Some(win)).unwrap();
        glkapi.glk_put_string(b"kept\n").unwrap();
        assert_eq!(glkapi.system().html(0), "kept\n");
    }

    #[test]
    fn styles_change_classes() {
        let mut glkapi = session();
        open_window(&mut glkapi);
        glkapi.glk_set_style(style_Header).unwrap();
        assert!(glkapi.system().classes[&crate::output::StyleTarget::Window(0)].contains(&"font-bold".to_string()));
        glkapi.glk_stylehint_set(wintype_AllTypes, style_User1, stylehint_Oblique, 1);
        let win = glkapi.glk_window_get_root();
        assert_eq!(glkapi.glk_style_measure(win, style_User1, stylehint_Oblique), Ok(Some(1)));
        assert_eq!(glkapi.glk_style_distinguish(win, style_User1, style_Normal), Ok(true));
        glkapi.glk_stylehint_clear(wintype_AllTypes, style_User1, stylehint_Oblique);
        assert_eq!(glkapi.glk_style_distinguish(win, style_User1, style_Normal), Ok(false));
    }

    #[test]
    fn typeahead_completes_char_request_before_select() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        assert_eq!(glkapi.send_key(KeyEvent::key('q' as u32)), None);
        glkapi.glk_request_char_event(Some(win)).unwrap();
        let expected = GlkEvent {
            evtype: GlkEventType::Char,
            win: Some(win),
            val1: 'q' as u32,
            val2: 0,
        };
        assert_eq!(glkapi.glk_select(), Ok(CallResult::Returned(Resumption::Event(expected))));
        assert_eq!(glkapi.input_mode(), InputMode::Buffer);
    }

    #[test]
    fn char_requests_narrow_to_latin1() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        glkapi.glk_request_char_event(Some(win)).unwrap();
        assert_eq!(glkapi.glk_select(), Ok(CallResult::DidNotReturn));
        let Some(Resumption::Event(event)) = glkapi.send_key(KeyEvent::key('Ω' as u32)) else {
            panic!("char event expected");
        };
        assert_eq!(event.val1, '?' as u32);

        glkapi.glk_request_char_event(Some(win)).unwrap();
        glkapi.glk_select().unwrap();
        let Some(Resumption::Event(event)) = glkapi.send_key(KeyEvent::named("ArrowUp")) else {
            panic!("char event expected");
        };
        assert_eq!(event.val1, keycode_Up);
    }

    #[test]
    fn double_keyboard_request_is_fatal() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        glkapi.glk_request_line_event(Some(win), vec![0; 10].into_boxed_slice(), 0).unwrap();
        assert_eq!(glkapi.glk_request_char_event(Some(win)), Err(PendingKeyboardRequest));
        assert!(glkapi.is_halted());
    }

    #[test]
    fn line_filters_can_replace_and_reject() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        glkapi.add_line_filter(Box::new(|line: &str| match line {
            "" => LineFilterOutcome::Reject,
            "x" => LineFilterOutcome::Replace("examine".to_string()),
            _ => LineFilterOutcome::Keep,
        }));
        glkapi.glk_request_line_event_uni(Some(win), vec![0; 4].into_boxed_slice(), 0).unwrap();
        assert_eq!(glkapi.glk_select(), Ok(CallResult::DidNotReturn));
        assert_eq!(glkapi.send_line(""), Ok(None));
        assert_eq!(glkapi.input_mode(), InputMode::GetLine);

        let Ok(Some(Resumption::Line(event, buf))) = glkapi.send_line("x") else {
            panic!("line event expected");
        };
        assert_eq!(event.val1, 4);
        assert_eq!(buf, GlkOwnedBuffer::U32(Box::new(['e' as u32, 'x' as u32, 'a' as u32, 'm' as u32])));
        assert_eq!(glkapi.system().text(0), "examine\n");
        assert_eq!(glkapi.input_mode(), InputMode::Buffer);
    }

    #[test]
    fn cancelled_line_keeps_initial_text() {
        let mut glkapi = session();
        let win = open_window(&mut glkapi);
        glkapi.glk_set_echo_line_event(Some(win), 0).unwrap();
        glkapi.glk_request_line_event(Some(win), Box::new(*b"look    "), 4).unwrap();
        assert_eq!(glkapi.system().line_requests, vec![(0, "look".to_string())]);
        let (event, _) = glkapi.glk_cancel_line_event(Some(win)).unwrap().unwrap();
        assert_eq!(event.val1, 4);
        assert_eq!(glkapi.input_mode(), InputMode::Buffer);
        assert_eq!(glkapi.glk_cancel_line_event(Some(win)), Ok(None));
        assert_eq!(glkapi.system().cancelled_lines, vec![0]);
        assert_eq!(glkapi.system().text(0), "");
    }

    #[test]
    fn select_without_request_is_fatal() {
        let mut glkapi = session();
        open_window(&mut glkapi);
        assert_eq!(glkapi.glk_select(), Err(NoPendingRequest));
    }

    #[test]
    fn file_prompt_is_shown_once_and_resumed() {
        let mut glkapi = session();
        open_window(&mut glkapi);
        glkapi.fs_mut().write("/savefiles/old.glksave", b"", false);
        assert_eq!(glkapi.glk_fileref_create_by_prompt(fileusage_SavedGame, filemode_Write, 7), Ok(CallResult::DidNotReturn));
        assert_eq!(glkapi.glk_select(), Err(RequestPending));
        assert!(glkapi.is_halted());

        let mut glkapi = session();
        glkapi.glk_fileref_create_by_prompt(fileusage_SavedGame, filemode_Write, 7).unwrap();
        glkapi.update();
        assert_eq!(glkapi.system().file_prompts.len(), 1);
        assert_eq!(glkapi.system().file_prompts[0].kind, FilePromptKind::Save);
        let Ok(Resumption::FileRef(Some(fref))) = glkapi.resume_file_prompt(Some("../my save")) else {
            panic!("fileref expected");
        };
        assert_eq!(glkapi.glk_fileref_get_rock(Some(fref)), Ok(7));
        assert_eq!(glkapi.resume_file_prompt(None), Err(NoPendingRequest));
    }

    #[test]
    fn files_round_trip_through_storage() {
        let mut glkapi = session();
        let fref = glkapi.glk_fileref_create_by_name(fileusage_Data | fileusage_TextMode, "notes", 0).unwrap();
        assert_eq!(glkapi.glk_fileref_does_file_exist(Some(fref)), Ok(false));
        assert_eq!(glkapi.glk_stream_open_file(Some(fref), filemode_Read, 0), Ok(None));

        let str = glkapi.glk_stream_open_file_uni(Some(fref), filemode_Write, 0).unwrap();
        glkapi.glk_put_string_stream_uni(str, &['é' as u32, '\n' as u32]).unwrap();
        glkapi.glk_stream_close(str).unwrap();
        assert_eq!(glkapi.fs().read("/gamedata/notes.glkdata"), Some("é\n".as_bytes().to_vec()));

        let str = glkapi.glk_stream_open_file(Some(fref), filemode_Read, 0).unwrap();
        let mut buf = [0u8; 4];
        // Latin-1 streams read bytes
        assert_eq!(glkapi.glk_get_buffer_stream(str, &mut buf), Ok(3));
        glkapi.glk_fileref_delete_file(Some(fref)).unwrap();
        assert_eq!(glkapi.glk_fileref_does_file_exist(Some(fref)), Ok(false));
    }

    #[test]
    fn dirty_files_are_flushed_after_the_delay() {
        let mut glkapi = session();
        let fref = glkapi.glk_fileref_create_by_name(fileusage_Data, "log", 0).unwrap();
        let str = glkapi.glk_stream_open_file(Some(fref), filemode_Write, 0).unwrap();
        glkapi.glk_put_string_stream(str, b"abc").unwrap();
        glkapi.flush_dirty_files(Timestamp::now());
        assert_eq!(glkapi.fs().read("/gamedata/log.glkdata"), None);
        glkapi.flush_dirty_files(Timestamp::now() + SignedDuration::from_secs(60));
        assert_eq!(glkapi.fs().read("/gamedata/log.glkdata"), Some(b"abc".to_vec()));
    }

    #[test]
    fn resource_streams() {
        let mut glkapi = session();
        glkapi.system_mut().resources.insert(3, ResourceChunk {
            data: "hé".as_bytes().to_vec(),
            binary: false,
        });
        assert_eq!(glkapi.glk_stream_open_resource(9, 0), Ok(None));
        let str = glkapi.glk_stream_open_resource_uni(3, 0).unwrap();
        assert_eq!(glkapi.glk_get_char_stream_uni(str), Ok('h' as i32));
        assert_eq!(glkapi.glk_get_char_stream_uni(str), Ok('é' as i32));
        assert_eq!(glkapi.glk_get_char_stream_uni(str), Ok(-1));
    }

    #[test]
    fn gestalts() {
        let glkapi = session();
        assert_eq!(glkapi.glk_gestalt(gestalt_Version, 0), GLK_VERSION);
        assert_eq!(glkapi.glk_gestalt(gestalt_Unicode, 0), 1);
        assert_eq!(glkapi.glk_gestalt(gestalt_Graphics, 0), 0);
        assert_eq!(glkapi.glk_gestalt(gestalt_CharInput, keycode_Left), 1);
        assert_eq!(glkapi.glk_gestalt(gestalt_LineInput, 7), 0);
        let mut arr = [0];
        assert_eq!(glkapi.glk_gestalt_ext(gestalt_CharOutput, 'A' as u32, Some(&mut arr)), gestalt_CharOutput_ExactPrint);
        assert_eq!(arr, [1]);
        assert_eq!(glkapi.glk_char_to_upper(0xE9), 0xC9);
    }

    #[test]
    fn dates() {
        let glkapi = session();
        let date = GlkDate {
            year: 2024,
            month: 2,
            day: 30,
            hour: 25,
            ..Default::default()
        };
        // 30 February is 1 March in a leap year, and 25:00 is 01:00 the next day
        let time = glkapi.glk_date_to_time_utc(&date);
        let normalised = glkapi.glk_time_to_date_utc(&time);
        assert_eq!((normalised.month, normalised.day, normalised.hour), (3, 2, 1));
        assert_eq!(normalised.weekday, 6);

        assert_eq!(glkapi.glk_date_to_simple_time_utc(&GlkDate {year: 1970, month: 1, day: 2, ..Default::default()}, 60), 1440);
        assert_eq!(glkapi.glk_simple_time_to_date_utc(1440, 60).day, 2);
    }

    #[test]
    fn unsupported_functions_are_reported() {
        let glkapi = session();
        let func = GlkFunction::from_name("glk_request_timer_events").unwrap();
        assert_eq!(glkapi.glk_unsupported(func), Unsupported(func));
    }
}
