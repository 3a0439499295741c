pub mod device;

pub use device::{Device, Framebuffer, KeyLatch, RandomByte};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new_rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::new_rgb(0xff, 0xff, 0xff);
    pub const RED: Color = Color::new_rgb(0x88, 0x00, 0x00);
    pub const CYAN: Color = Color::new_rgb(0xaa, 0xff, 0xee);
    pub const PURPLE: Color = Color::new_rgb(0xcc, 0x44, 0xcc);
    pub const GREEN: Color = Color::new_rgb(0x00, 0xcc, 0x55);
    pub const BLUE: Color = Color::new_rgb(0x00, 0x00, 0xaa);
    pub const YELLOW: Color = Color::new_rgb(0xee, 0xee, 0x77);
    pub const ORANGE: Color = Color::new_rgb(0xdd, 0x88, 0x55);
    pub const BROWN: Color = Color::new_rgb(0x66, 0x44, 0x00);
    pub const LIGHT_RED: Color = Color::new_rgb(0xff, 0x77, 0x77);
    pub const DARK_GRAY: Color = Color::new_rgb(0x33, 0x33, 0x33);
    pub const GRAY: Color = Color::new_rgb(0x77, 0x77, 0x77);
    pub const GREY: Color = Color::GRAY;
    pub const LIGHT_GREEN: Color = Color::new_rgb(0xaa, 0xff, 0x66);
    pub const LIGHT_BLUE: Color = Color::new_rgb(0x00, 0x88, 0xff);
    pub const LIGHT_GRAY: Color = Color::new_rgb(0xbb, 0xbb, 0xbb);

    /// The 16 colours a framebuffer byte selects with its low nibble.
    pub const PALETTE: [Color; 16] = [
        Color::BLACK,
        Color::WHITE,
        Color::RED,
        Color::CYAN,
        Color::PURPLE,
        Color::GREEN,
        Color::BLUE,
        Color::YELLOW,
        Color::ORANGE,
        Color::BROWN,
        Color::LIGHT_RED,
        Color::DARK_GRAY,
        Color::GRAY,
        Color::LIGHT_GREEN,
        Color::LIGHT_BLUE,
        Color::LIGHT_GRAY,
    ];

    #[inline]
    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }

    /// Palette lookup; only the low nibble of `value` is significant.
    #[inline]
    pub const fn from_palette(value: u8) -> Color {
        Color::PALETTE[(value & 0x0f) as usize]
    }
}
