/*

Unicode case mapping and normalisation
======================================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use unicode_case_mapping::{to_lowercase, to_titlecase, to_uppercase};
use unicode_normalization::char::{canonical_combining_class, compose, decompose_canonical};

type CaseMapper<const N: usize> = fn(char) -> [u32; N];

fn combining_class(ch: u32) -> u8 {
    char::from_u32(ch).map_or(0, canonical_combining_class)
}

/** Map one character through a case table, which gives zeros for characters without a mapping */
fn map_char<const N: usize>(ch: u32, mapper: CaseMapper<N>, out: &mut Vec<u32>) {
    let Some(c) = char::from_u32(ch) else {
        out.push(ch);
        return;
    };
    let mapped = mapper(c);
    if mapped[0] == 0 {
        out.push(ch);
    }
    else {
        out.extend(mapped.iter().take_while(|&&val| val != 0));
    }
}

fn map_chars<const N: usize>(chars: &[u32], mapper: CaseMapper<N>) -> Vec<u32> {
    let mut out = Vec::with_capacity(chars.len());
    for &ch in chars {
        map_char(ch, mapper, &mut out);
    }
    out
}

/** Copy a result back into a Glk buffer, returning the full length even if it didn't fit */
fn write_back(buf: &mut [u32], result: &[u32]) -> u32 {
    let len = result.len().min(buf.len());
    buf[..len].copy_from_slice(&result[..len]);
    result.len() as u32
}

fn input_slice(buf: &[u32], numchars: u32) -> &[u32] {
    &buf[..(numchars as usize).min(buf.len())]
}

pub fn char_to_lower(ch: u8) -> u8 {
    match ch {
        b'A'..=b'Z' | 0xC0..=0xD6 | 0xD8..=0xDE => ch + 0x20,
        _ => ch,
    }
}

pub fn char_to_upper(ch: u8) -> u8 {
    match ch {
        b'a'..=b'z' | 0xE0..=0xF6 | 0xF8..=0xFE => ch - 0x20,
        _ => ch,
    }
}

pub fn buffer_to_lower_case(buf: &mut [u32], numchars: u32) -> u32 {
    let result = map_chars(input_slice(buf, numchars), to_lowercase);
    write_back(buf, &result)
}

pub fn buffer_to_upper_case(buf: &mut [u32], numchars: u32) -> u32 {
    let result = map_chars(input_slice(buf, numchars), to_uppercase);
    write_back(buf, &result)
}

pub fn buffer_to_title_case(buf: &mut [u32], numchars: u32, lowerrest: bool) -> u32 {
    let chars = input_slice(buf, numchars);
    let Some((&first, rest)) = chars.split_first() else {
        return 0;
    };
    let mut result = Vec::with_capacity(chars.len());
    map_char(first, to_titlecase, &mut result);
    if lowerrest {
        result.extend(map_chars(rest, to_lowercase));
    }
    else {
        result.extend_from_slice(rest);
    }
    write_back(buf, &result)
}

/** Reorder each maximal run of non-starters by combining class.
    This is a bubble sort so that characters of equal class keep their order. */
pub fn canonical_ordering(chars: &mut [u32]) {
    let len = chars.len();
    let mut i = 0;
    while i < len {
        if combining_class(chars[i]) == 0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < len && combining_class(chars[i]) != 0 {
            i += 1;
        }
        let run = &mut chars[start..i];
        let mut swapped = true;
        while swapped {
            swapped = false;
            for j in 1..run.len() {
                if combining_class(run[j - 1]) > combining_class(run[j]) {
                    run.swap(j - 1, j);
                    swapped = true;
                }
            }
        }
    }
}

/** Full canonical decomposition followed by canonical ordering (NFD) */
pub fn canonical_decompose(chars: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(chars.len());
    for &ch in chars {
        match char::from_u32(ch) {
            Some(c) => decompose_canonical(c, |d| out.push(d as u32)),
            None => out.push(ch),
        }
    }
    canonical_ordering(&mut out);
    out
}

/** Canonical composition of an already decomposed and ordered sequence */
pub fn canonical_compose(chars: &[u32]) -> Vec<u32> {
    let mut result: Vec<u32> = Vec::with_capacity(chars.len());
    let mut starter: Option<usize> = None;
    let mut last_class = 0;
    for &ch in chars {
        let class = combining_class(ch);
        if let Some(starter_index) = starter {
            let adjacent = result.len() == starter_index + 1;
            let blocked = !adjacent && (last_class == 0 || last_class >= class);
            if !blocked {
                let composed = char::from_u32(result[starter_index])
                    .zip(char::from_u32(ch))
                    .and_then(|(a, b)| compose(a, b));
                if let Some(composed) = composed {
                    result[starter_index] = composed as u32;
                    continue;
                }
            }
        }
        if class == 0 {
            starter = Some(result.len());
        }
        last_class = class;
        result.push(ch);
    }
    result
}

pub fn buffer_canon_decompose(buf: &mut [u32], numchars: u32) -> u32 {
    let result = canonical_decompose(input_slice(buf, numchars));
    write_back(buf, &result)
}

/** NFC */
pub fn buffer_canon_normalize(buf: &mut [u32], numchars: u32) -> u32 {
    let result = canonical_compose(&canonical_decompose(input_slice(buf, numchars)));
    write_back(buf, &result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACUTE: u32 = 0x301;
    const CEDILLA: u32 = 0x327;
    const DOT_BELOW: u32 = 0x323;

    #[test]
    fn latin1_case() {
        assert_eq!(char_to_upper(b'a'), b'A');
        assert_eq!(char_to_upper(0xE9), 0xC9);
        assert_eq!(char_to_upper(0xF7), 0xF7);
        assert_eq!(char_to_lower(0xD7), 0xD7);
        assert_eq!(char_to_lower(b'Q'), b'q');
    }

    #[test]
    fn case_mapping_can_grow() {
        let mut buf = [0xDF, 0, 0];
        // ß uppercases to SS
        assert_eq!(buffer_to_upper_case(&mut buf, 1), 2);
        assert_eq!(buf[..2], ['S' as u32, 'S' as u32]);

        let mut short = [0xDF];
        assert_eq!(buffer_to_upper_case(&mut short, 1), 2);
        assert_eq!(short, ['S' as u32]);
    }

    #[test]
    fn title_case() {
        let mut buf: Vec<u32> = "hELLO".chars().map(|c| c as u32).collect();
        assert_eq!(buffer_to_title_case(&mut buf, 5, true), 5);
        assert_eq!(buf, "Hello".chars().map(|c| c as u32).collect::<Vec<_>>());
    }

    #[test]
    fn ordering_only_touches_runs() {
        // Classes: acute 230, dot below 220, cedilla 202
        let mut chars = vec!['a' as u32, ACUTE, DOT_BELOW, CEDILLA, 'b' as u32, ACUTE, DOT_BELOW];
        canonical_ordering(&mut chars);
        assert_eq!(chars, vec!['a' as u32, CEDILLA, DOT_BELOW, ACUTE, 'b' as u32, DOT_BELOW, ACUTE]);
    }

    #[test]
    fn ordering_is_stable() {
        const DIAERESIS: u32 = 0x0308;
        let mut chars = vec!['a' as u32, DIAERESIS, DOT_BELOW, ACUTE, DOT_BELOW, DIAERESIS];
        canonical_ordering(&mut chars);
        assert_eq!(chars, vec!['a' as u32, DOT_BELOW, DOT_BELOW, DIAERESIS, ACUTE, DIAERESIS]);
    }

    #[test]
    fn decompose_and_normalize() {
        let mut buf = [0xE9, 0, 0];
        assert_eq!(buffer_canon_decompose(&mut buf, 1), 2);
        assert_eq!(buf[..2], ['e' as u32, ACUTE]);
        assert_eq!(buffer_canon_normalize(&mut buf, 2), 1);
        assert_eq!(buf[0], 0xE9);
    }

    #[test]
    fn compose_stops_without_precomposed_form() {
        // e + dot below composes, but there is no precomposed form with the acute as well
        let composed = canonical_compose(&['e' as u32, DOT_BELOW, ACUTE]);
        assert_eq!(composed, vec![0x1EB9, ACUTE]);
    }
}
