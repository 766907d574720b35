#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Self-squared fractal plotter
//!
//! The Mandelbrot and Julia sets are the two "self-squared" fractals:
//! both come from iterating z = z * z + c on the complex plane and
//! counting the steps until z leaves the circle of radius 2 (or a cap
//! is reached, for the points that never leave).  The two sets differ
//! only in what varies per pixel.  For the Mandelbrot, z starts at
//! zero and c is the plane coordinate of the pixel; for a Julia set,
//! z starts at the pixel's coordinate and c is one fixed constant for
//! the whole image.
//!
//! The crate maps a pixel grid onto a viewport of the complex plane,
//! runs the iteration for every pixel, and hands the counts either
//! straight into a flat buffer of u16s, or to a caller-supplied sink
//! that converts each count into whatever pixel representation the
//! caller's surface wants.  The sink variant walks buffers with a row
//! pitch wider than the packed row, so display surfaces with alignment
//! padding can be written in place.

extern crate crossbeam;
extern crate itertools;
extern crate num;

pub mod escape;
pub mod planes;
pub mod shade;

pub use escape::{escape_time, EscapeTimeRenderer, DEFAULT_LIMIT};
pub use planes::{Pixel, PlaneMapper};
