//! `proj4-transform`: transform `x y [z]` lines read from stdin, in the manner of `cs2cs`.

use argh::FromArgs;
use proj4_interop::{Status, TransformError, try_transform_batch};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs, Debug)]
/// Transform coordinates read from stdin from one PROJ4 definition to another.
struct Args {
    /// source definition, e.g. "+proj=longlat +datum=WGS84"
    #[argh(positional)]
    src: String,

    /// destination definition, e.g. "+proj=utm +zone=31 +datum=WGS84"
    #[argh(positional)]
    dst: String,

    /// input x/y are degrees; convert them to radians before transforming
    #[argh(switch)]
    degrees_in: bool,

    /// output x/y are radians; convert them to degrees after transforming
    #[argh(switch)]
    degrees_out: bool,

    /// number of decimals printed for each value
    #[argh(option, default = "6")]
    precision: usize,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: expected `x y [z]`, got {text:?}")]
    Parse { line: usize, text: String },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("PROJ could not transform every point (status {0})")]
    Native(Status),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Args = argh::from_env();
    match run(&args, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("proj4-transform: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, input: impl BufRead, mut output: impl Write) -> Result<(), CliError> {
    let points = read_points(input)?;
    let mut x: Vec<f64> = points.iter().map(|p| p[0]).collect();
    let mut y: Vec<f64> = points.iter().map(|p| p[1]).collect();
    let mut z: Vec<f64> = points.iter().map(|p| p[2]).collect();

    if args.degrees_in {
        x.iter_mut().chain(y.iter_mut()).for_each(|v| *v = v.to_radians());
    }
    let count = i64::try_from(points.len()).map_err(|_| TransformError::PointCountOverflow)?;
    let status = try_transform_batch(&args.src, &args.dst, count, 1, &mut x, &mut y, &mut z)?;
    if status != 0 {
        return Err(CliError::Native(status));
    }
    if args.degrees_out {
        x.iter_mut().chain(y.iter_mut()).for_each(|v| *v = v.to_degrees());
    }

    let precision = args.precision;
    for ((x, y), z) in x.iter().zip(&y).zip(&z) {
        writeln!(output, "{x:.precision$} {y:.precision$} {z:.precision$}")?;
    }
    Ok(())
}

fn read_points(input: impl BufRead) -> Result<Vec<[f64; 3]>, CliError> {
    let mut points = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let text = line.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let point = parse_point(text).ok_or_else(|| CliError::Parse {
            line: index + 1,
            text: line.clone(),
        })?;
        points.push(point);
    }
    Ok(points)
}

fn parse_point(text: &str) -> Option<[f64; 3]> {
    let values = text
        .split_whitespace()
        .map(|v| v.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match values[..] {
        [x, y] => Some([x, y, 0.0]),
        [x, y, z] => Some([x, y, z]),
        _ => None,
    }
}
