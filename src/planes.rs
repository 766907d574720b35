//! Contains the PlaneMapper struct, which describes a relationship
//! between a grid of pixels with an origin at 0,0 and a rectangle on
//! the complex plane given by its upper-left and lower-right corners.
use num::Complex;

/// The column and row of a pixel in the grid.  Columns run left to
/// right, rows top to bottom, both from zero.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of a width x height grid onto points of the complex
/// plane.  The grid's (0,0) pixel lands exactly on the upper-left
/// corner of the viewport; each column advances the real part by one
/// step and each row advances the imaginary part by one step, where
/// the steps are the viewport's spans divided by the grid dimensions.
///
/// The spans keep their literal sign.  A viewport whose "upper left"
/// is to the right of (or below) its "lower right" has negative steps
/// and produces a mirrored image, which is legal.
#[derive(Debug)]
pub struct PlaneMapper {
    width: usize,
    height: usize,
    origin: Complex<f64>,
    // Per-pixel deltas along the real and imaginary axes, signed.
    steps: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Takes the pixel dimensions of the grid and the
    /// two corners of the viewport.  The only illegal configuration
    /// is a grid with no pixels in it.
    pub fn new(
        width: usize,
        height: usize,
        upper_left: Complex<f64>,
        lower_right: Complex<f64>,
    ) -> Result<PlaneMapper, String> {
        if width == 0 || height == 0 {
            return Err(format!(
                "The pixel grid must have nonzero dimensions, got {}x{}.",
                width, height
            ));
        }

        let steps = (
            (lower_right.re - upper_left.re) / (width as f64),
            (lower_right.im - upper_left.im) / (height as f64),
        );

        Ok(PlaneMapper {
            width,
            height,
            origin: upper_left,
            steps,
        })
    }

    /// The width of the pixel grid.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The height of the pixel grid.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The total number of pixels in the grid.  Used to size buffers.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether the grid holds no pixels.  Never true for a mapper
    /// built through `new`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Given the column and row of a pixel, return the complex number
    /// at the equivalent location on the viewport.  The point is
    /// recomputed from the pixel index each time rather than
    /// accumulated across calls, so long rows do not drift.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.origin.re + (pixel.0 as f64) * self.steps.0,
            self.origin.im + (pixel.1 as f64) * self.steps.1,
        )
    }
}
