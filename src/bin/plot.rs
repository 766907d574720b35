extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate image;
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate selfsquared;

use clap::{App, Arg, ArgMatches};
use failure::{err_msg, Error};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use log::info;
use num::Complex;
use selfsquared::shade;
use selfsquared::EscapeTimeRenderer;
use std::fs::File;
use std::str::FromStr;
use std::time::Instant;

/// Given a string and a separator, returns the two values separated
/// by the separator.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

/// A specific implementation of parse_pair using a comma and expecting
/// floating point numbers.
fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const UPPERLEFT: &str = "upperleft";
const LOWERRIGHT: &str = "lowerright";
const FRACTAL: &str = "fractal";
const SEED: &str = "seed";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const SHADE: &str = "shade";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("plot")
        .version("0.1.0")
        .about("Mandelbrot and Julia set plotter")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1280x720")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse the image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(UPPERLEFT)
                .required(false)
                .long(UPPERLEFT)
                .short("u")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.5,-1.125")
                .validator(|s| {
                    validate_pair::<f64>(&s, ',', "Could not parse the upper left corner")
                })
                .help("Upper left corner of the viewport"),
        )
        .arg(
            Arg::with_name(LOWERRIGHT)
                .required(false)
                .long(LOWERRIGHT)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.5,1.125")
                .validator(|s| {
                    validate_pair::<f64>(&s, ',', "Could not parse the lower right corner")
                })
                .help("Lower right corner of the viewport"),
        )
        .arg(
            Arg::with_name(FRACTAL)
                .required(false)
                .long(FRACTAL)
                .short("f")
                .takes_value(true)
                .possible_values(&["mandelbrot", "julia"])
                .default_value("mandelbrot")
                .help("Which self-squared fractal to plot"),
        )
        .arg(
            Arg::with_name(SEED)
                .required(false)
                .long(SEED)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.8,0.156")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the Julia seed"))
                .help("The fixed c constant for Julia plots"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("400")
                .validator(|s| {
                    validate_range::<u16>(
                        &s,
                        1,
                        65_535,
                        "Could not parse the iteration cap",
                        "The iteration cap must be between 1 and 65535",
                    )
                })
                .help("Iteration cap per pixel"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse the thread count",
                        &format!("The thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to render with"),
        )
        .arg(
            Arg::with_name(SHADE)
                .required(false)
                .long(SHADE)
                .short("g")
                .takes_value(true)
                .possible_values(&["linear", "log"])
                .default_value("log")
                .help("Gray shading policy for iteration counts"),
        )
        .get_matches()
}

fn write_image(filename: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), std::io::Error> {
    let output = File::create(filename)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))?;
    Ok(())
}

fn run() -> Result<(), Error> {
    let matches = args();
    let (width, height) = parse_pair(matches.value_of(SIZE).unwrap(), 'x')
        .ok_or_else(|| err_msg("Could not parse the image size"))?;
    let upper_left = parse_complex(matches.value_of(UPPERLEFT).unwrap())
        .ok_or_else(|| err_msg("Could not parse the upper left corner"))?;
    let lower_right = parse_complex(matches.value_of(LOWERRIGHT).unwrap())
        .ok_or_else(|| err_msg("Could not parse the lower right corner"))?;
    let limit = u16::from_str(matches.value_of(ITERATIONS).unwrap())?;
    let threads = usize::from_str(matches.value_of(THREADS).unwrap())?;

    let renderer = EscapeTimeRenderer::new(width, height, upper_left, lower_right, Some(limit))
        .map_err(err_msg)?;

    let mut counts = vec![0 as u16; width * height];
    let started = Instant::now();
    match matches.value_of(FRACTAL).unwrap() {
        "julia" => {
            let c = parse_complex(matches.value_of(SEED).unwrap())
                .ok_or_else(|| err_msg("Could not parse the Julia seed"))?;
            info!(
                "julia c = {}, {}x{}, cap {}, {} threads",
                c, width, height, limit, threads
            );
            if threads == 1 {
                renderer.julia(c, &mut counts).map_err(err_msg)?;
            } else {
                renderer.julia_threaded(c, &mut counts, threads).map_err(err_msg)?;
            }
        }
        _ => {
            info!(
                "mandelbrot, {}x{}, cap {}, {} threads",
                width, height, limit, threads
            );
            if threads == 1 {
                renderer.mandelbrot(&mut counts).map_err(err_msg)?;
            } else {
                renderer
                    .mandelbrot_threaded(&mut counts, threads)
                    .map_err(err_msg)?;
            }
        }
    }
    info!("rendered in {:?}", started.elapsed());

    let mut sink: Box<dyn FnMut(u16, &mut [u8])> = match matches.value_of(SHADE).unwrap() {
        "linear" => Box::new(shade::gray_linear(limit)),
        _ => Box::new(shade::gray_log(limit)),
    };
    let mut pixels = vec![0 as u8; width * height];
    for (count, cell) in counts.iter().zip(pixels.chunks_mut(1)) {
        sink(*count, cell);
    }

    write_image(matches.value_of(OUTPUT).unwrap(), &pixels, (width, height))?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
