/*

Array helpers
=============

Copyright (c) 2023 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use widestring::U32Str;

pub const MAX_LATIN1: u32 = 0xFF;
pub const QUESTION_MARK: u32 = '?' as u32;

/** A borrowed Glk array, either Latin-1 or Unicode */
pub enum GlkBuffer<'a> {
    U8(&'a [u8]),
    U32(&'a [u32]),
}

impl GlkBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            GlkBuffer::U8(buf) => buf.len(),
            GlkBuffer::U32(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_u32(&self, index: usize) -> u32 {
        match self {
            GlkBuffer::U8(buf) => buf[index] as u32,
            GlkBuffer::U32(buf) => buf[index],
        }
    }

    /** Turn into a Rust string, replacing anything which isn't a valid code point */
    pub fn to_string_lossy(&self) -> String {
        match self {
            GlkBuffer::U8(buf) => buf.iter().map(|&ch| ch as char).collect(),
            GlkBuffer::U32(buf) => U32Str::from_slice(buf).to_string_lossy(),
        }
    }
}

/** A mutable borrowed Glk array */
pub enum GlkBufferMut<'a> {
    U8(&'a mut [u8]),
    U32(&'a mut [u32]),
}

impl GlkBufferMut<'_> {
    pub fn len(&self) -> usize {
        match self {
            GlkBufferMut::U8(buf) => buf.len(),
            GlkBufferMut::U32(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_u32(&mut self, index: usize, val: u32) {
        match self {
            GlkBufferMut::U8(buf) => buf.set_u32(index, val),
            GlkBufferMut::U32(buf) => buf.set_u32(index, val),
        }
    }
}

/** An owned Glk array, as kept by memory streams and line input requests */
#[derive(Clone, Debug, PartialEq)]
pub enum GlkOwnedBuffer {
    U8(Box<[u8]>),
    U32(Box<[u32]>),
}

impl GlkOwnedBuffer {
    pub fn len(&self) -> usize {
        match self {
            GlkOwnedBuffer::U8(buf) => buf.len(),
            GlkOwnedBuffer::U32(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_u32(&self, index: usize) -> u32 {
        match self {
            GlkOwnedBuffer::U8(buf) => buf[index] as u32,
            GlkOwnedBuffer::U32(buf) => buf[index],
        }
    }

    pub fn set_u32(&mut self, index: usize, val: u32) {
        self.as_mut().set_u32(index, val);
    }

    pub fn as_mut(&mut self) -> GlkBufferMut<'_> {
        match self {
            GlkOwnedBuffer::U8(buf) => GlkBufferMut::U8(buf),
            GlkOwnedBuffer::U32(buf) => GlkBufferMut::U32(buf),
        }
    }

    pub fn is_unicode(&self) -> bool {
        matches!(self, GlkOwnedBuffer::U32(_))
    }
}

/** Helper functions for Glk arrays */
pub trait GlkArray {
    fn get_u32(&self, index: usize) -> u32;
    fn set_u32(&mut self, index: usize, val: u32);
}

impl GlkArray for [u8] {
    fn get_u32(&self, index: usize) -> u32 {
        self[index] as u32
    }

    fn set_u32(&mut self, index: usize, val: u32) {
        self[index] = if val > MAX_LATIN1 {QUESTION_MARK} else {val} as u8;
    }
}

impl GlkArray for [u32] {
    fn get_u32(&self, index: usize) -> u32 {
        self[index]
    }

    fn set_u32(&mut self, index: usize, val: u32) {
        self[index] = val;
    }
}

/** Narrow a code point for a Latin-1 consumer */
pub fn narrow_latin1(ch: u32) -> u8 {
    if ch > MAX_LATIN1 {QUESTION_MARK as u8} else {ch as u8}
}
