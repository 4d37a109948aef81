//! Cell formats for both sheets.

use rust_xlsxwriter::{Color, Format, FormatAlign};

const GREEN: u32 = 0x006633;
const LIGHT_GREEN: u32 = 0xE8F5E9;
const WHITE: u32 = 0xFFFFFF;
const DARK_GREEN: u32 = 0x1B5E20;
const DARK_RED: u32 = 0xB71C1C;
const GREY: u32 = 0x555555;

const FONT: &str = "Arial";

pub const MONEY: &str = "#,##0.00";
pub const SIGNED_MONEY: &str = "+#,##0.00;-#,##0.00";
pub const SIGNED_PCT: &str = "+0.00%;-0.00%";
pub const COUNT: &str = "#,##0";

pub struct Styles {
    pub header: Format,
    pub title: Format,
    pub note: Format,
    pub ticker: Format,
    pub data: Format,
    pub centered: Format,
    pub money: Format,
    pub signed_money: Format,
    pub count: Format,
    pub gain_pct: Format,
    pub loss_pct: Format,
    pub signed_pct: Format,
}

impl Styles {
    pub fn new() -> Self {
        let base = Format::new()
            .set_font_name(FONT)
            .set_font_size(11)
            .set_align(FormatAlign::VerticalCenter);

        Self {
            header: base
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(WHITE))
                .set_background_color(Color::RGB(GREEN))
                .set_align(FormatAlign::Center),
            title: base
                .clone()
                .set_bold()
                .set_font_size(14)
                .set_font_color(Color::RGB(GREEN))
                .set_background_color(Color::RGB(LIGHT_GREEN))
                .set_align(FormatAlign::Center),
            note: base
                .clone()
                .set_italic()
                .set_font_size(10)
                .set_font_color(Color::RGB(GREY))
                .set_align(FormatAlign::Left),
            ticker: base.clone().set_bold().set_font_color(Color::RGB(GREEN)),
            centered: base.clone().set_align(FormatAlign::Center),
            money: base.clone().set_num_format(MONEY),
            signed_money: base.clone().set_num_format(SIGNED_MONEY),
            count: base.clone().set_num_format(COUNT),
            gain_pct: base
                .clone()
                .set_num_format(SIGNED_PCT)
                .set_font_color(Color::RGB(DARK_GREEN)),
            loss_pct: base
                .clone()
                .set_num_format(SIGNED_PCT)
                .set_font_color(Color::RGB(DARK_RED)),
            signed_pct: base.clone().set_num_format(SIGNED_PCT),
            data: base,
        }
    }

    /// `format` with the alternating-row fill applied when `striped`.
    pub fn row(&self, format: &Format, striped: bool) -> Format {
        if striped {
            format.clone().set_background_color(Color::RGB(LIGHT_GREEN))
        } else {
            format.clone()
        }
    }
}

impl Default for Styles {
    fn default() -> Self {
        Self::new()
    }
}
