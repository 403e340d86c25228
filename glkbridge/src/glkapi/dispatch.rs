/*

The Glk function table
======================

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Support {
    Implemented,
    /** Accepted, but does nothing */
    Stub,
}

/** The result of calling a function this library doesn't implement */
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Unsupported(pub GlkFunction);

macro_rules! glk_functions {
    ($($name: ident = $selector: literal $support: ident,)*) => {
        /** Every Glk function a VM may call, by name and dispatch selector */
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum GlkFunction {
            $($name,)*
        }

        impl GlkFunction {
            pub fn from_selector(selector: u32) -> Option<Self> {
                match selector {
                    $($selector => Some(GlkFunction::$name),)*
                    _ => None,
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name == stringify!($name) {
                        return Some(GlkFunction::$name);
                    }
                )*
                None
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(GlkFunction::$name => stringify!($name),)*
                }
            }

            pub fn selector(self) -> u32 {
                match self {
                    $(GlkFunction::$name => $selector,)*
                }
            }

            pub fn support(self) -> Support {
                match self {
                    $(GlkFunction::$name => Support::$support,)*
                }
            }
        }
    }
}

glk_functions! {
    glk_exit = 0x0001 Implemented,
    glk_set_interrupt_handler = 0x0002 Stub,
    glk_tick = 0x0003 Implemented,
    glk_gestalt = 0x0004 Implemented,
    glk_gestalt_ext = 0x0005 Implemented,
    glk_window_iterate = 0x0020 Implemented,
    glk_window_get_rock = 0x0021 Implemented,
    glk_window_get_root = 0x0022 Implemented,
    glk_window_open = 0x0023 Implemented,
    glk_window_close = 0x0024 Implemented,
    glk_window_get_size = 0x0025 Implemented,
    glk_window_set_arrangement = 0x0026 Stub,
    glk_window_get_arrangement = 0x0027 Stub,
    glk_window_get_type = 0x0028 Implemented,
    glk_window_get_parent = 0x0029 Implemented,
    glk_window_clear = 0x002A Implemented,
    glk_window_move_cursor = 0x002B Stub,
    glk_window_get_stream = 0x002C Implemented,
    glk_window_set_echo_stream = 0x002D Implemented,
    glk_window_get_echo_stream = 0x002E Implemented,
    glk_set_window = 0x002F Implemented,
    glk_window_get_sibling = 0x0030 Implemented,
    glk_stream_iterate = 0x0040 Implemented,
    glk_stream_get_rock = 0x0041 Implemented,
    glk_stream_open_file = 0x0042 Implemented,
    glk_stream_open_memory = 0x0043 Implemented,
    glk_stream_close = 0x0044 Implemented,
    glk_stream_set_position = 0x0045 Implemented,
    glk_stream_get_position = 0x0046 Implemented,
    glk_stream_set_current = 0x0047 Implemented,
    glk_stream_get_current = 0x0048 Implemented,
    glk_stream_open_resource = 0x0049 Implemented,
    glk_fileref_create_temp = 0x0060 Implemented,
    glk_fileref_create_by_name = 0x0061 Implemented,
    glk_fileref_create_by_prompt = 0x0062 Implemented,
    glk_fileref_destroy = 0x0063 Implemented,
    glk_fileref_iterate = 0x0064 Implemented,
    glk_fileref_get_rock = 0x0065 Implemented,
    glk_fileref_delete_file = 0x0066 Implemented,
    glk_fileref_does_file_exist = 0x0067 Implemented,
    glk_fileref_create_from_fileref = 0x0068 Implemented,
    glk_put_char = 0x0080 Implemented,
    glk_put_char_stream = 0x0081 Implemented,
    glk_put_string = 0x0082 Implemented,
    glk_put_string_stream = 0x0083 Implemented,
    glk_put_buffer = 0x0084 Implemented,
    glk_put_buffer_stream = 0x0085 Implemented,
    glk_set_style = 0x0086 Implemented,
    glk_set_style_stream = 0x0087 Implemented,
    glk_get_char_stream = 0x0090 Implemented,
    glk_get_line_stream = 0x0091 Implemented,
    glk_get_buffer_stream = 0x0092 Implemented,
    glk_char_to_lower = 0x00A0 Implemented,
    glk_char_to_upper = 0x00A1 Implemented,
    glk_stylehint_set = 0x00B0 Implemented,
    glk_stylehint_clear = 0x00B1 Implemented,
    glk_style_distinguish = 0x00B2 Implemented,
    glk_style_measure = 0x00B3 Implemented,
    glk_select = 0x00C0 Implemented,
    glk_select_poll = 0x00C1 Implemented,
    glk_request_line_event = 0x00D0 Implemented,
    glk_cancel_line_event = 0x00D1 Implemented,
    glk_request_char_event = 0x00D2 Implemented,
    glk_cancel_char_event = 0x00D3 Implemented,
    glk_request_mouse_event = 0x00D4 Stub,
    glk_cancel_mouse_event = 0x00D5 Stub,
    glk_request_timer_events = 0x00D6 Stub,
    glk_image_get_info = 0x00E0 Stub,
    glk_image_draw = 0x00E1 Stub,
    glk_image_draw_scaled = 0x00E2 Stub,
    glk_window_flow_break = 0x00E8 Stub,
    glk_window_erase_rect = 0x00E9 Stub,
    glk_window_fill_rect = 0x00EA Stub,
    glk_window_set_background_color = 0x00EB Stub,
    glk_schannel_iterate = 0x00F0 Stub,
    glk_schannel_get_rock = 0x00F1 Stub,
    glk_schannel_create = 0x00F2 Stub,
    glk_schannel_destroy = 0x00F3 Stub,
    glk_schannel_create_ext = 0x00F4 Stub,
    glk_schannel_play_multi = 0x00F7 Stub,
    glk_schannel_play = 0x00F8 Stub,
    glk_schannel_play_ext = 0x00F9 Stub,
    glk_schannel_stop = 0x00FA Stub,
    glk_schannel_set_volume = 0x00FB Stub,
    glk_sound_load_hint = 0x00FC Stub,
    glk_schannel_set_volume_ext = 0x00FD Stub,
    glk_schannel_pause = 0x00FE Stub,
    glk_schannel_unpause = 0x00FF Stub,
    glk_set_hyperlink = 0x0100 Implemented,
    glk_set_hyperlink_stream = 0x0101 Implemented,
    glk_request_hyperlink_event = 0x0102 Stub,
    glk_cancel_hyperlink_event = 0x0103 Stub,
    glk_buffer_to_lower_case_uni = 0x0120 Implemented,
    glk_buffer_to_upper_case_uni = 0x0121 Implemented,
    glk_buffer_to_title_case_uni = 0x0122 Implemented,
    glk_buffer_canon_decompose_uni = 0x0123 Implemented,
    glk_buffer_canon_normalize_uni = 0x0124 Implemented,
    glk_put_char_uni = 0x0128 Implemented,
    glk_put_string_uni = 0x0129 Implemented,
    glk_put_buffer_uni = 0x012A Implemented,
    glk_put_char_stream_uni = 0x012B Implemented,
    glk_put_string_stream_uni = 0x012C Implemented,
    glk_put_buffer_stream_uni = 0x012D Implemented,
    glk_get_char_stream_uni = 0x0130 Implemented,
    glk_get_buffer_stream_uni = 0x0131 Implemented,
    glk_get_line_stream_uni = 0x0132 Implemented,
    glk_stream_open_file_uni = 0x0138 Implemented,
    glk_stream_open_memory_uni = 0x0139 Implemented,
    glk_stream_open_resource_uni = 0x013A Implemented,
    glk_request_char_event_uni = 0x0140 Implemented,
    glk_request_line_event_uni = 0x0141 Implemented,
    glk_set_echo_line_event = 0x0150 Implemented,
    glk_set_terminators_line_event = 0x0151 Stub,
    glk_current_time = 0x0160 Implemented,
    glk_current_simple_time = 0x0161 Implemented,
    glk_time_to_date_utc = 0x0168 Implemented,
    glk_time_to_date_local = 0x0169 Stub,
    glk_simple_time_to_date_utc = 0x016A Implemented,
    glk_simple_time_to_date_local = 0x016B Stub,
    glk_date_to_time_utc = 0x016C Implemented,
    glk_date_to_time_local = 0x016D Stub,
    glk_date_to_simple_time_utc = 0x016E Implemented,
    glk_date_to_simple_time_local = 0x016F Stub,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_agree() {
        let func = GlkFunction::from_selector(0x00C0).unwrap();
        assert_eq!(func, GlkFunction::glk_select);
        assert_eq!(func.name(), "glk_select");
        assert_eq!(GlkFunction::from_name("glk_schannel_play"), Some(GlkFunction::glk_schannel_play));
        assert_eq!(GlkFunction::glk_schannel_play.selector(), 0x00F8);
        assert_eq!(GlkFunction::glk_schannel_play.support(), Support::Stub);
        assert_eq!(GlkFunction::from_selector(0x9999), None);
    }
}
