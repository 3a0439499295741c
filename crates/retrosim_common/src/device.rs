//! Memory-mapped devices.
//!
//! The core routes every bus access that falls inside a registered address
//! range to a [`Device`] instead of plain RAM. Devices see absolute
//! addresses, so one implementation can be mapped anywhere without knowing
//! its base.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Color;

/// Hook for memory-mapped I/O.
///
/// `read` takes `&mut self` because reading a device register may have side
/// effects (e.g. a random source producing a fresh value).
pub trait Device {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

/// Lets the host keep a handle to a device after mapping it.
impl<D: Device> Device for Rc<RefCell<D>> {
    fn read(&mut self, addr: u16) -> u8 {
        self.borrow_mut().read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.borrow_mut().write(addr, value)
    }
}

/// Returns a fresh random byte on every read; writes are ignored.
#[derive(Debug, Default)]
pub struct RandomByte;

impl RandomByte {
    pub const ADDRESS: u16 = 0x00fe;
}

impl Device for RandomByte {
    fn read(&mut self, _addr: u16) -> u8 {
        rand::random::<u8>()
    }

    fn write(&mut self, addr: u16, value: u8) {
        log::trace!("ignoring write of 0x{:02X} to random source 0x{:04X}", value, addr);
    }
}

/// Holds the code of the last key the host pressed.
#[derive(Debug, Default)]
pub struct KeyLatch {
    key: u8,
}

impl KeyLatch {
    pub const ADDRESS: u16 = 0x00ff;

    pub fn press(&mut self, key: u8) {
        self.key = key;
    }

    pub fn last_key(&self) -> u8 {
        self.key
    }
}

impl Device for KeyLatch {
    fn read(&mut self, _addr: u16) -> u8 {
        self.key
    }

    /// Programs clear the latch by writing to it after consuming a key.
    fn write(&mut self, _addr: u16, value: u8) {
        self.key = value;
    }
}

const SCREEN_WIDTH: usize = 32;
const SCREEN_HEIGHT: usize = 32;
const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// 32x32 screen, one byte per pixel, row-major from `BASE`.
pub struct Framebuffer {
    pixels: [u8; SCREEN_SIZE],
    dirty: bool,
}

impl Framebuffer {
    pub const WIDTH: usize = SCREEN_WIDTH;
    pub const HEIGHT: usize = SCREEN_HEIGHT;
    pub const BASE: u16 = 0x0200;
    pub const END: u16 = 0x0200 + SCREEN_SIZE as u16 - 1;

    pub fn new() -> Self {
        Self {
            pixels: [0; SCREEN_SIZE],
            dirty: false,
        }
    }

    fn index(addr: u16) -> Option<usize> {
        let offset = addr.checked_sub(Framebuffer::BASE)? as usize;
        (offset < SCREEN_SIZE).then_some(offset)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Color {
        Color::from_palette(self.pixels[(y % Self::HEIGHT) * Self::WIDTH + (x % Self::WIDTH)])
    }

    /// True once any pixel has been written since creation or the last `take_dirty`.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// One text line per row; `.` for black, `#` for anything else.
    pub fn render_text(&self) -> String {
        let mut out = String::with_capacity((Self::WIDTH + 1) * Self::HEIGHT);
        for y in 0..Self::HEIGHT {
            for x in 0..Self::WIDTH {
                out.push(if self.pixel(x, y) == Color::BLACK { '.' } else { '#' });
            }
            out.push('\n');
        }
        out
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Framebuffer {
    fn read(&mut self, addr: u16) -> u8 {
        Self::index(addr).map_or(0, |i| self.pixels[i])
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let Some(i) = Self::index(addr) {
            self.pixels[i] = value;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framebuffer_maps_addresses_row_major() {
        let mut fb = Framebuffer::new();
        fb.write(Framebuffer::BASE, 0x01);
        fb.write(Framebuffer::BASE + 33, 0x02);
        fb.write(Framebuffer::END, 0x05);

        assert_eq!(fb.pixel(0, 0), Color::WHITE);
        assert_eq!(fb.pixel(1, 1), Color::RED);
        assert_eq!(fb.pixel(31, 31), Color::GREEN);
        assert_eq!(fb.read(Framebuffer::BASE + 33), 0x02);
        assert!(fb.take_dirty());
        assert!(!fb.take_dirty());
    }

    #[test]
    fn framebuffer_ignores_out_of_range() {
        let mut fb = Framebuffer::new();
        fb.write(Framebuffer::END + 1, 0x01);
        assert_eq!(fb.read(Framebuffer::END + 1), 0);
        assert!(!fb.take_dirty());
    }

    #[test]
    fn framebuffer_text_render() {
        let mut fb = Framebuffer::new();
        fb.write(Framebuffer::BASE + 2, 0x07);
        let text = fb.render_text();
        let first = text.lines().next().unwrap();
        assert_eq!(&first[..4], "..#.");
        assert_eq!(text.lines().count(), Framebuffer::HEIGHT);
    }

    #[test]
    fn key_latch_through_shared_handle() {
        let latch = Rc::new(RefCell::new(KeyLatch::default()));
        let mut mapped: Box<dyn Device> = Box::new(latch.clone());

        latch.borrow_mut().press(b'w');
        assert_eq!(mapped.read(KeyLatch::ADDRESS), b'w');

        mapped.write(KeyLatch::ADDRESS, 0);
        assert_eq!(latch.borrow().last_key(), 0);
    }
}
