// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time engine.  One bounded iteration routine, one
//! renderer over it.
//!
//! Every pixel's count is independent of every other pixel's, so the
//! renderer also offers banded variants that split the image across
//! threads; the only synchronization is the final join.

extern crate crossbeam;

use itertools::iproduct;
use num::Complex;
use planes::{Pixel, PlaneMapper};

/// Iteration ceiling used when the caller does not supply one.
pub const DEFAULT_LIMIT: u16 = 400;

/// Counts the iterations of z = z * z + c, starting from the seed z,
/// until z leaves the circle of radius 2 or the count reaches `limit`.
///
/// The count starts at 1 and goes up once per step actually taken, so
/// a seed that is already outside the circle comes back as 1, and a
/// point that never leaves comes back as `limit`.  Escape is tested
/// on the squared magnitude against 4; no square root is taken.
pub fn escape_time(z: Complex<f64>, c: Complex<f64>, limit: u16) -> u16 {
    let mut z = z;
    let mut iterations = 1;
    while z.norm_sqr() < 4.0 && iterations < limit {
        z = z * z + c;
        iterations += 1;
    }
    iterations
}

/// What varies per pixel: for the Mandelbrot the plane point is c and
/// z starts at zero, for a Julia set the plane point is z and c is
/// one constant for the whole image.
#[derive(Copy, Clone)]
enum Mode {
    Mandelbrot,
    Julia(Complex<f64>),
}

/// Renders escape-time counts for a fixed grid, viewport, and
/// iteration cap.  Once set, this object should not be mutable; the
/// cap is read at construction and never again, so it cannot change
/// in the middle of an image.
///
/// The renderer never allocates pixel storage.  Callers own their
/// buffers and the renderer checks their shape before writing,
/// refusing with an error rather than running off the end.
pub struct EscapeTimeRenderer {
    planes: PlaneMapper,
    limit: u16,
}

impl EscapeTimeRenderer {
    /// Requires the width and height of the image and the upper-left
    /// and lower-right corners of the viewport being sampled.  Passing
    /// `None` for the limit selects `DEFAULT_LIMIT`.
    pub fn new(
        width: usize,
        height: usize,
        upper_left: Complex<f64>,
        lower_right: Complex<f64>,
        limit: Option<u16>,
    ) -> Result<Self, String> {
        match PlaneMapper::new(width, height, upper_left, lower_right) {
            Ok(planes) => Ok(EscapeTimeRenderer {
                planes,
                limit: limit.unwrap_or(DEFAULT_LIMIT),
            }),
            Err(u) => Err(u),
        }
    }

    fn step(&self, mode: Mode, point: Complex<f64>) -> u16 {
        match mode {
            Mode::Mandelbrot => escape_time(Complex::new(0.0, 0.0), point, self.limit),
            Mode::Julia(c) => escape_time(point, c, self.limit),
        }
    }

    /// Writes the Mandelbrot set's iteration counts into `pixels`, one
    /// u16 per pixel in row-major order.  The buffer must hold exactly
    /// width * height counts.
    pub fn mandelbrot(&self, pixels: &mut [u16]) -> Result<(), String> {
        self.render(Mode::Mandelbrot, pixels)
    }

    /// Writes a Julia set's iteration counts into `pixels`, with `c`
    /// fixed for the whole image.  Same buffer contract as
    /// `mandelbrot`.
    pub fn julia(&self, c: Complex<f64>, pixels: &mut [u16]) -> Result<(), String> {
        self.render(Mode::Julia(c), pixels)
    }

    /// The Mandelbrot set through an output sink.  For every pixel the
    /// sink receives the iteration count and a mutable slice of
    /// exactly `elsize` bytes at that pixel's location in `buf`, and
    /// writes whatever representation it likes there.  Consecutive
    /// rows start `pitch` bytes apart; the `pitch - elsize * width`
    /// padding bytes at the end of each row are never touched.
    pub fn mandelbrot_with<F>(
        &self,
        buf: &mut [u8],
        elsize: usize,
        pitch: usize,
        sink: F,
    ) -> Result<(), String>
    where
        F: FnMut(u16, &mut [u8]),
    {
        self.render_with(Mode::Mandelbrot, buf, elsize, pitch, sink)
    }

    /// A Julia set through an output sink, with `c` fixed for the
    /// whole image.  Same walk and same buffer contract as
    /// `mandelbrot_with`.
    pub fn julia_with<F>(
        &self,
        c: Complex<f64>,
        buf: &mut [u8],
        elsize: usize,
        pitch: usize,
        sink: F,
    ) -> Result<(), String>
    where
        F: FnMut(u16, &mut [u8]),
    {
        self.render_with(Mode::Julia(c), buf, elsize, pitch, sink)
    }

    /// The Mandelbrot counts again, computed on `threads` threads.
    /// The image is split into bands of whole rows, one scoped thread
    /// per band, and the result is identical to `mandelbrot`'s.
    pub fn mandelbrot_threaded(&self, pixels: &mut [u16], threads: usize) -> Result<(), String> {
        self.render_threaded(Mode::Mandelbrot, pixels, threads)
    }

    /// A Julia set's counts computed on `threads` threads.  The result
    /// is identical to `julia`'s.
    pub fn julia_threaded(
        &self,
        c: Complex<f64>,
        pixels: &mut [u16],
        threads: usize,
    ) -> Result<(), String> {
        self.render_threaded(Mode::Julia(c), pixels, threads)
    }

    fn check_counts(&self, pixels: &[u16]) -> Result<(), String> {
        if pixels.len() != self.planes.len() {
            return Err(format!(
                "The count buffer holds {} pixels but the grid needs {}.",
                pixels.len(),
                self.planes.len()
            ));
        }
        Ok(())
    }

    fn render(&self, mode: Mode, pixels: &mut [u16]) -> Result<(), String> {
        self.check_counts(pixels)?;
        let width = self.planes.width();
        for (row, column) in iproduct!(0..self.planes.height(), 0..width) {
            let point = self.planes.pixel_to_point(&Pixel(column, row));
            pixels[row * width + column] = self.step(mode, point);
        }
        Ok(())
    }

    fn render_with<F>(
        &self,
        mode: Mode,
        buf: &mut [u8],
        elsize: usize,
        pitch: usize,
        mut sink: F,
    ) -> Result<(), String>
    where
        F: FnMut(u16, &mut [u8]),
    {
        let width = self.planes.width();
        let height = self.planes.height();
        if elsize == 0 {
            return Err("The element size must be at least one byte.".to_string());
        }
        if pitch < elsize * width {
            return Err(format!(
                "A pitch of {} bytes cannot hold a row of {} cells of {} bytes.",
                pitch, width, elsize
            ));
        }
        if buf.len() < pitch * height {
            return Err(format!(
                "The buffer holds {} bytes but {} rows of pitch {} need {}.",
                buf.len(),
                height,
                pitch,
                pitch * height
            ));
        }

        for row in 0..height {
            // Only the packed prefix of each row is handed out; the
            // padding up to the next pitch boundary stays untouched.
            let cells = &mut buf[row * pitch..row * pitch + elsize * width];
            for (column, cell) in cells.chunks_mut(elsize).enumerate() {
                let point = self.planes.pixel_to_point(&Pixel(column, row));
                sink(self.step(mode, point), cell);
            }
        }
        Ok(())
    }

    fn render_threaded(&self, mode: Mode, pixels: &mut [u16], threads: usize) -> Result<(), String> {
        self.check_counts(pixels)?;
        if threads == 0 {
            return Err("At least one thread is needed to render.".to_string());
        }

        let width = self.planes.width();
        let rows_per_band = self.planes.height() / threads + 1;
        crossbeam::scope(|spawner| {
            for (index, band) in pixels.chunks_mut(rows_per_band * width).enumerate() {
                let top = index * rows_per_band;
                spawner.spawn(move |_| {
                    self.fill_band(mode, band, top);
                });
            }
        })
        .unwrap();
        Ok(())
    }

    // Fills one band of whole rows, `top` rows down from the top of
    // the image.  The last band may be short.
    fn fill_band(&self, mode: Mode, band: &mut [u16], top: usize) {
        let width = self.planes.width();
        for (index, pixel) in band.iter_mut().enumerate() {
            let point = self
                .planes
                .pixel_to_point(&Pixel(index % width, top + index / width));
            *pixel = self.step(mode, point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_renderer(side: usize, limit: u16) -> EscapeTimeRenderer {
        EscapeTimeRenderer::new(
            side,
            side,
            Complex::new(-2.0, -2.0),
            Complex::new(2.0, 2.0),
            Some(limit),
        )
        .unwrap()
    }

    #[test]
    fn escapes_after_a_single_step() {
        // From z = 0, one step lands on z = 2, whose squared magnitude
        // of 4 fails the < 4 test; the count has gone 1 -> 2.
        assert_eq!(escape_time(Complex::new(0.0, 0.0), Complex::new(2.0, 0.0), 400), 2);
    }

    #[test]
    fn seed_outside_the_circle_counts_one() {
        assert_eq!(escape_time(Complex::new(2.0, 0.0), Complex::new(0.0, 0.0), 400), 1);
        assert_eq!(escape_time(Complex::new(0.0, -3.0), Complex::new(0.1, 0.1), 400), 1);
    }

    #[test]
    fn the_origin_never_escapes() {
        assert_eq!(escape_time(Complex::new(0.0, 0.0), Complex::new(0.0, 0.0), 400), 400);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), Complex::new(0.0, 0.0), 7), 7);
    }

    #[test]
    fn counts_stay_within_one_and_the_cap() {
        let renderer = square_renderer(32, 50);
        let mut pixels = vec![0 as u16; 32 * 32];
        renderer.mandelbrot(&mut pixels).unwrap();
        assert!(pixels.iter().all(|&n| n >= 1 && n <= 50));
    }

    #[test]
    fn unsupplied_limit_defaults_to_400() {
        // A 1x1 grid whose only pixel maps exactly onto the origin.
        let renderer = EscapeTimeRenderer::new(
            1,
            1,
            Complex::new(0.0, 0.0),
            Complex::new(1.0, 1.0),
            None,
        )
        .unwrap();
        let mut pixels = [0 as u16; 1];
        renderer.mandelbrot(&mut pixels).unwrap();
        assert_eq!(pixels[0], DEFAULT_LIMIT);
    }

    #[test]
    fn count_buffer_of_the_wrong_size_is_refused() {
        let renderer = square_renderer(16, 100);
        let mut pixels = vec![0 as u16; 16 * 16 - 1];
        assert!(renderer.mandelbrot(&mut pixels).is_err());
        assert!(renderer.julia(Complex::new(0.0, 0.0), &mut pixels).is_err());
    }

    #[test]
    fn plain_and_sink_drivers_agree() {
        let renderer = square_renderer(40, 80);
        let mut counts = vec![0 as u16; 40 * 40];
        renderer.mandelbrot(&mut counts).unwrap();

        // A sink that copies the count verbatim, two bytes
        // little-endian per cell.
        let mut bytes = vec![0 as u8; 2 * 40 * 40];
        renderer
            .mandelbrot_with(&mut bytes, 2, 2 * 40, |n, cell| {
                cell[0] = n as u8;
                cell[1] = (n >> 8) as u8;
            })
            .unwrap();

        let copied: Vec<u16> = bytes
            .chunks(2)
            .map(|cell| u16::from(cell[0]) | u16::from(cell[1]) << 8)
            .collect();
        assert_eq!(counts, copied);
    }

    #[test]
    fn row_padding_is_never_written() {
        let renderer = EscapeTimeRenderer::new(
            4,
            3,
            Complex::new(-2.0, -1.0),
            Complex::new(1.0, 1.0),
            Some(20),
        )
        .unwrap();

        // One-byte cells, three bytes of padding per row.
        let pitch = 7;
        let mut buf = vec![0xAA as u8; pitch * 3];
        renderer
            .mandelbrot_with(&mut buf, 1, pitch, |_, cell| {
                cell[0] = 0x01;
            })
            .unwrap();

        for row in 0..3 {
            // Each row's first cell sits exactly at row * pitch.
            assert_eq!(&buf[row * pitch..row * pitch + 4], &[1, 1, 1, 1]);
            assert_eq!(&buf[row * pitch + 4..(row + 1) * pitch], &[0xAA, 0xAA, 0xAA]);
        }
    }

    #[test]
    fn sink_driver_refuses_misshapen_buffers() {
        let renderer = square_renderer(8, 10);
        let mut buf = vec![0 as u8; 8 * 8];
        assert!(renderer.mandelbrot_with(&mut buf, 0, 8, |_, _| ()).is_err());
        assert!(renderer.mandelbrot_with(&mut buf, 1, 7, |_, _| ()).is_err());
        let mut short = vec![0 as u8; 8 * 8 - 1];
        assert!(renderer.mandelbrot_with(&mut short, 1, 8, |_, _| ()).is_err());
    }

    #[test]
    fn julia_counts_are_not_degenerate() {
        // c = -0.8 + 0.156i bounds a well-known connected Julia set:
        // the image must mix saturated interior points with quickly
        // escaping corners.
        let renderer = EscapeTimeRenderer::new(
            100,
            100,
            Complex::new(-1.5, -1.5),
            Complex::new(1.5, 1.5),
            Some(100),
        )
        .unwrap();
        let mut pixels = vec![0 as u16; 100 * 100];
        renderer.julia(Complex::new(-0.8, 0.156), &mut pixels).unwrap();

        assert!(pixels.iter().any(|&n| n == 100));
        assert!(pixels.iter().any(|&n| n < 100));
        assert!(!pixels.iter().all(|&n| n == 1));
    }

    #[test]
    fn banded_threads_reproduce_the_single_threaded_image() {
        let renderer = EscapeTimeRenderer::new(
            33,
            17,
            Complex::new(-2.5, -1.125),
            Complex::new(1.5, 1.125),
            Some(60),
        )
        .unwrap();
        let mut single = vec![0 as u16; 33 * 17];
        renderer.mandelbrot(&mut single).unwrap();

        for &threads in &[1, 3, 64] {
            let mut banded = vec![0 as u16; 33 * 17];
            renderer.mandelbrot_threaded(&mut banded, threads).unwrap();
            assert_eq!(single, banded);
        }

        let c = Complex::new(-0.8, 0.156);
        let mut single = vec![0 as u16; 33 * 17];
        renderer.julia(c, &mut single).unwrap();
        let mut banded = vec![0 as u16; 33 * 17];
        renderer.julia_threaded(c, &mut banded, 4).unwrap();
        assert_eq!(single, banded);
    }

    #[test]
    fn threaded_render_needs_a_thread() {
        let renderer = square_renderer(8, 10);
        let mut pixels = vec![0 as u16; 8 * 8];
        assert!(renderer.mandelbrot_threaded(&mut pixels, 0).is_err());
    }
}
