/*

Glk Streams
===========

Copyright (c) 2023 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::cmp::max;
use std::mem;
use std::num::NonZeroU32;

use enum_dispatch::enum_dispatch;
use jiff::Timestamp;
use tracing::warn;

use super::*;

const GLK_NULL: u32 = 0;
const NEWLINE: u32 = 10;

#[enum_dispatch]
pub enum Stream {
    File(FileStream),
    Memory(MemoryStream),
    Null(NullStream),
    Resource(ByteStream),
    Window(WindowStream),
}

#[enum_dispatch(Stream)]
pub trait StreamOperations {
    fn close(&mut self) -> ClosedStream;
    fn get_buffer(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32>;
    fn get_char(&mut self, uni: bool) -> GlkResult<i32>;
    fn get_line(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32>;
    fn get_position(&self) -> u32;
    fn put_buffer(&mut self, buf: &GlkBuffer) -> GlkResult<()> {
        for i in 0..buf.len() {
            self.put_char(buf.get_u32(i))?;
        }
        Ok(())
    }
    fn put_char(&mut self, ch: u32) -> GlkResult<()>;
    fn set_position(&mut self, mode: SeekMode, pos: i32);
}

fn is_readable(fmode: FileMode) -> bool {
    !matches!(fmode, FileMode::Write | FileMode::WriteAppend)
}

fn narrow_read(ch: u32, uni: bool) -> i32 {
    (if !uni && ch > MAX_LATIN1 {QUESTION_MARK} else {ch}) as i32
}

fn seek(mode: SeekMode, pos: i32, current: usize, end: usize) -> usize {
    let new_pos = match mode {
        SeekMode::Current => current as i64 + pos as i64,
        SeekMode::End => end as i64 + pos as i64,
        SeekMode::Start => pos as i64,
    };
    new_pos.clamp(0, end as i64) as usize
}

/** Shared reading code: pulls characters until `read` gives up */
fn read_into(buf: &mut GlkBufferMut, mut read: impl FnMut() -> Option<u32>) -> u32 {
    let mut count = 0;
    while count < buf.len() {
        let Some(ch) = read() else {
            break;
        };
        buf.set_u32(count, ch);
        count += 1;
    }
    count as u32
}

fn read_line_into(buf: &mut GlkBufferMut, mut read: impl FnMut() -> Option<u32>) -> u32 {
    if buf.is_empty() {
        return 0;
    }
    let mut count = 0;
    while count < buf.len() - 1 {
        let Some(ch) = read() else {
            break;
        };
        buf.set_u32(count, ch);
        count += 1;
        if ch == NEWLINE {
            break;
        }
    }
    buf.set_u32(count, GLK_NULL);
    count as u32
}

/** A stream over encoded bytes held fully in memory: the basis of file and resource streams */
pub struct ByteStream {
    data: Vec<u8>,
    encoding: TextEncoding,
    fmode: FileMode,
    /** Byte offset into `data` */
    pos: usize,
    read_count: u32,
    write_count: u32,
}

impl ByteStream {
    pub fn new(data: Vec<u8>, encoding: TextEncoding, fmode: FileMode) -> Self {
        let pos = if fmode == FileMode::WriteAppend {data.len()} else {0};
        ByteStream {
            data,
            encoding,
            fmode,
            pos,
            read_count: 0,
            write_count: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn counts(&self) -> ClosedStream {
        ClosedStream {
            read_count: self.read_count,
            write_count: self.write_count,
            buffer: None,
        }
    }

    /** Positions are in characters for fixed width encodings, and in bytes for UTF-8 */
    fn unit(&self) -> usize {
        match self.encoding {
            TextEncoding::Utf32Be => 4,
            _ => 1,
        }
    }

    fn read_char(&mut self) -> Option<u32> {
        match decode_char(self.encoding, &self.data, &mut self.pos)? {
            Ok(ch) => Some(ch),
            Err(err) => {
                // Malformed text ends the read
                warn!("{err}");
                self.pos = self.data.len();
                None
            },
        }
    }

    fn check_read(&self) -> GlkResult<()> {
        if is_readable(self.fmode) {Ok(())} else {Err(ReadFromWriteOnly)}
    }
}

impl StreamOperations for ByteStream {
    fn close(&mut self) -> ClosedStream {
        self.counts()
    }

    fn get_buffer(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.check_read()?;
        let count = read_into(buf, || self.read_char());
        self.read_count += count;
        Ok(count)
    }

    fn get_char(&mut self, uni: bool) -> GlkResult<i32> {
        self.check_read()?;
        match self.read_char() {
            Some(ch) => {
                self.read_count += 1;
                Ok(narrow_read(ch, uni))
            },
            None => Ok(-1),
        }
    }

    fn get_line(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.check_read()?;
        let count = read_line_into(buf, || self.read_char());
        self.read_count += count;
        Ok(count)
    }

    fn get_position(&self) -> u32 {
        (self.pos / self.unit()) as u32
    }

    fn put_char(&mut self, ch: u32) -> GlkResult<()> {
        if self.fmode == FileMode::Read {
            return Err(WriteToReadOnly);
        }
        self.pos = write_char_at(self.encoding, ch, &mut self.data, self.pos);
        self.write_count += 1;
        Ok(())
    }

    fn set_position(&mut self, mode: SeekMode, pos: i32) {
        let unit = self.unit();
        self.pos = seek(mode, pos, self.pos / unit, self.data.len() / unit) * unit;
    }
}

/** A file stream. The whole file is read when the stream is opened and written back when it is closed */
pub struct FileStream {
    pub dirty_since: Option<Timestamp>,
    pub filetype: FileType,
    pub path: String,
    str: ByteStream,
}

impl FileStream {
    pub fn new(path: String, filetype: FileType, data: Vec<u8>, encoding: TextEncoding, fmode: FileMode) -> Self {
        FileStream {
            // A newly created file should exist even if nothing is written to it
            dirty_since: (fmode != FileMode::Read).then(Timestamp::now),
            filetype,
            path,
            str: ByteStream::new(data, encoding, fmode),
        }
    }

    pub fn data(&self) -> &[u8] {
        self.str.data()
    }

    pub fn is_writable(&self) -> bool {
        self.str.fmode != FileMode::Read
    }
}

impl StreamOperations for FileStream {
    fn close(&mut self) -> ClosedStream {
        self.str.close()
    }

    fn get_buffer(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.str.get_buffer(buf)
    }

    fn get_char(&mut self, uni: bool) -> GlkResult<i32> {
        self.str.get_char(uni)
    }

    fn get_line(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.str.get_line(buf)
    }

    fn get_position(&self) -> u32 {
        self.str.get_position()
    }

    fn put_char(&mut self, ch: u32) -> GlkResult<()> {
        self.str.put_char(ch)?;
        self.dirty_since.get_or_insert_with(Timestamp::now);
        Ok(())
    }

    fn set_position(&mut self, mode: SeekMode, pos: i32) {
        self.str.set_position(mode, pos)
    }
}

/** A stream over a buffer owned by the VM, handed back when the stream is closed */
pub struct MemoryStream {
    buf: GlkOwnedBuffer,
    fmode: FileMode,
    /** The high water mark: for `filemode_Write` streams this starts at 0 */
    len: usize,
    pos: usize,
    read_count: u32,
    write_count: u32,
}

impl MemoryStream {
    pub fn new(buf: GlkOwnedBuffer, fmode: FileMode) -> Self {
        let len = match fmode {
            FileMode::Write => 0,
            _ => buf.len(),
        };
        MemoryStream {
            buf,
            fmode,
            len,
            pos: 0,
            read_count: 0,
            write_count: 0,
        }
    }

    fn read_char(&mut self) -> Option<u32> {
        if self.pos < self.len {
            let ch = self.buf.get_u32(self.pos);
            self.pos += 1;
            Some(ch)
        }
        else {
            None
        }
    }

    fn check_read(&self) -> GlkResult<()> {
        if is_readable(self.fmode) {Ok(())} else {Err(ReadFromWriteOnly)}
    }
}

impl StreamOperations for MemoryStream {
    fn close(&mut self) -> ClosedStream {
        let buf = if self.buf.is_unicode() {GlkOwnedBuffer::U32(Box::new([]))} else {GlkOwnedBuffer::U8(Box::new([]))};
        ClosedStream {
            read_count: self.read_count,
            write_count: self.write_count,
            buffer: Some(mem::replace(&mut self.buf, buf)),
        }
    }

    fn get_buffer(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.check_read()?;
        let count = read_into(buf, || self.read_char());
        self.read_count += count;
        Ok(count)
    }

    fn get_char(&mut self, uni: bool) -> GlkResult<i32> {
        self.check_read()?;
        match self.read_char() {
            Some(ch) => {
                self.read_count += 1;
                Ok(narrow_read(ch, uni))
            },
            None => Ok(-1),
        }
    }

    fn get_line(&mut self, buf: &mut GlkBufferMut) -> GlkResult<u32> {
        self.check_read()?;
        let count = read_line_into(buf, || self.read_char());
        self.read_count += count;
        Ok(count)
    }

    fn get_position(&self) -> u32 {
        self.pos as u32
    }

    fn put_char(&mut self, ch: u32) -> GlkResult<()> {
        if self.fmode == FileMode::Read {
            return Err(WriteToReadOnly);
        }
        // Writes past the end of the buffer are counted but dropped
        if self.pos < self.buf.len() {
            self.buf.set_u32(self.pos, ch);
            self.pos += 1;
            self.len = max(self.len, self.pos);
        }
        self.write_count += 1;
        Ok(())
    }

    fn set_position(&mut self, mode: SeekMode, pos: i32) {
        self.pos = seek(mode, pos, self.pos, self.len);
    }
}

/** A memory stream opened without a buffer */
#[derive(Default)]
pub struct NullStream {
    write_count: u32,
}

impl StreamOperations for NullStream {
    fn close(&mut self) -> ClosedStream {
        ClosedStream {
            write_count: self.write_count,
            ..Default::default()
        }
    }

    fn get_buffer(&mut self, _: &mut GlkBufferMut) -> GlkResult<u32> {
        Ok(0)
    }

    fn get_char(&mut self, _: bool) -> GlkResult<i32> {
        Ok(-1)
    }

    fn get_line(&mut self, _: &mut GlkBufferMut) -> GlkResult<u32> {
        Ok(0)
    }

    fn get_position(&self) -> u32 {
        0
    }

    fn put_buffer(&mut self, buf: &GlkBuffer) -> GlkResult<()> {
        self.write_count += buf.len() as u32;
        Ok(())
    }

    fn put_char(&mut self, _: u32) -> GlkResult<()> {
        self.write_count += 1;
        Ok(())
    }

    fn set_position(&mut self, _: SeekMode, _: i32) {}
}

/** Every window has one of these. Text collects here until the window takes it */
pub struct WindowStream {
    pending: String,
    pub win: NonZeroU32,
    write_count: u32,
}

impl WindowStream {
    pub fn new(win: NonZeroU32) -> Self {
        WindowStream {
            pending: String::new(),
            win,
            write_count: 0,
        }
    }

    pub fn take_pending(&mut self) -> String {
        mem::take(&mut self.pending)
    }
}

impl StreamOperations for WindowStream {
    fn close(&mut self) -> ClosedStream {
        ClosedStream {
            write_count: self.write_count,
            ..Default::default()
        }
    }

    fn get_buffer(&mut self, _: &mut GlkBufferMut) -> GlkResult<u32> {
        Err(ReadFromWriteOnly)
    }

    fn get_char(&mut self, _: bool) -> GlkResult<i32> {
        Err(ReadFromWriteOnly)
    }

    fn get_line(&mut self, _: &mut GlkBufferMut) -> GlkResult<u32> {
        Err(ReadFromWriteOnly)
    }

    fn get_position(&self) -> u32 {
        0
    }

    fn put_buffer(&mut self, buf: &GlkBuffer) -> GlkResult<()> {
        self.pending.push_str(&buf.to_string_lossy());
        self.write_count += buf.len() as u32;
        Ok(())
    }

    fn put_char(&mut self, ch: u32) -> GlkResult<()> {
        self.pending.push(char::from_u32(ch).unwrap_or(char::REPLACEMENT_CHARACTER));
        self.write_count += 1;
        Ok(())
    }

    fn set_position(&mut self, _: SeekMode, _: i32) {}
}
