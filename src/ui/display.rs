//! SSD1306 OLED display sink.
//!
//! The 0.42" panel exposes a 72x40 visible window centered (with a
//! panel-specific vertical shift) inside the controller's 128x64
//! buffer. Frames are drawn into that window: a bordered box of up to
//! four short text lines, or one large numeral.

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use crate::platform::{Align, Frame, Line};

/// Physical buffer (controller) dimensions.
const BUFFER_WIDTH: i32 = 128;
const BUFFER_HEIGHT: i32 = 64;

/// Visible area of the 0.42" panel.
const WINDOW_WIDTH: i32 = 72;
const WINDOW_HEIGHT: i32 = 40;

/// The 40 px window sits below buffer center on this module.
const PANEL_Y_ADJUST: i32 = 12;

const X_OFFSET: i32 = (BUFFER_WIDTH - WINDOW_WIDTH) / 2;
const Y_OFFSET: i32 = (BUFFER_HEIGHT - WINDOW_HEIGHT) / 2 + PANEL_Y_ADJUST;

const FONT_WIDTH: i32 = 6;
const FONT_HEIGHT: i32 = 10;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Oled<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Oled<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// Render one frame into the visible window.
pub fn render<I2C>(display: &mut Oled<I2C>, frame: &Frame)
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();

    match frame {
        Frame::Lines(lines) => draw_lines(display, lines),
        Frame::Numeral(value) => draw_numeral(display, *value),
    }

    let _ = display.flush();
}

fn draw_lines<I2C>(display: &mut Oled<I2C>, lines: &[Line])
where
    I2C: embedded_hal::i2c::I2c,
{
    let _ = Rectangle::new(
        Point::new(X_OFFSET, Y_OFFSET),
        Size::new(WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
    .draw(display);

    // Spread the lines evenly over the window height.
    let count = lines.len() as i32;
    let gap = (WINDOW_HEIGHT - count * FONT_HEIGHT).max(0) / (count + 1);
    let mut y = Y_OFFSET + gap;

    for line in lines {
        let x = x_for_alignment(line.text.len() as i32, line.align);
        // Text anchors at the glyph baseline.
        let _ = Text::new(
            line.text.as_str(),
            Point::new(x, y + FONT_HEIGHT - 2),
            text_style(),
        )
        .draw(display);
        y += FONT_HEIGHT + gap;
    }
}

fn draw_numeral<I2C>(display: &mut Oled<I2C>, value: u32)
where
    I2C: embedded_hal::i2c::I2c,
{
    let style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(BinaryColor::On)
        .build();

    let mut text: heapless::String<8> = heapless::String::new();
    let _ = core::fmt::write(&mut text, format_args!("{value}"));

    let width = text.len() as i32 * 10;
    let x = X_OFFSET + (WINDOW_WIDTH - width).max(0) / 2;
    let y = Y_OFFSET + (WINDOW_HEIGHT - 20) / 2 + 16;
    let _ = Text::new(text.as_str(), Point::new(x, y), style).draw(display);
}

fn x_for_alignment(text_chars: i32, align: Align) -> i32 {
    let text_width = text_chars * FONT_WIDTH;
    match align {
        Align::Left => X_OFFSET + 2,
        Align::Center => X_OFFSET + (WINDOW_WIDTH - text_width).max(0) / 2,
        Align::Right => X_OFFSET + (WINDOW_WIDTH - text_width).max(0),
    }
}
