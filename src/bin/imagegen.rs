use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use log::{error, info};
use structopt::StructOpt;

use mandeltile::complex::c;
use mandeltile::errors::*;
use mandeltile::histogram::chart;
use mandeltile::{Canvas, Explorer, Histogram, Palette, RenderParameters, SessionConfig};

const CHART_W: u32 = 200;
const CHART_H: u32 = 100;
const POLL: Duration = Duration::from_millis(250);

#[derive(Copy, Clone, Debug)]
struct Click(u32, u32);

impl FromStr for Click {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
        let x = x.trim().parse().map_err(|e| format!("bad x '{}': {}", x, e))?;
        let y = y.trim().parse().map_err(|e| format!("bad y '{}': {}", y, e))?;
        Ok(Click(x, y))
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mandeltile-imagegen",
    about = "Render the Mandelbrot set progressively and save it as PNG"
)]
struct Opt {
    /// Image width in pixels
    #[structopt(short = "W", long, default_value = "1200")]
    width: u32,

    /// Image height in pixels
    #[structopt(short = "H", long, default_value = "800")]
    height: u32,

    /// Real part of the image center
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    re: f64,

    /// Imaginary part of the image center
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    im: f64,

    /// Width of the view on the real axis
    #[structopt(short, long, default_value = "4")]
    scale: f64,

    /// Maximum iterations per point
    #[structopt(short, long, default_value = "100")]
    bailout: u32,

    /// Calculator threads, defaults to the number of physical cores
    #[structopt(short, long)]
    threads: Option<usize>,

    /// Coloring: smooth or grey
    #[structopt(long, default_value = "smooth")]
    palette: Palette,

    /// Pixel to zoom into before the final render, as X,Y; may be repeated
    #[structopt(long = "zoom-at")]
    zoom_at: Vec<Click>,

    /// Zoom out instead of in at each --zoom-at pixel
    #[structopt(long)]
    zoom_out: bool,

    /// Where to save the image
    #[structopt(short, long, parse(from_os_str), default_value = "out.png")]
    output: PathBuf,

    /// Also save an iteration histogram chart here
    #[structopt(long, parse(from_os_str))]
    histogram: Option<PathBuf>,
}

fn run(opt: Opt) -> Result<()> {
    let params = RenderParameters::new(c(opt.re, opt.im), opt.scale, opt.bailout)?;
    if opt.width == 0 || opt.height == 0 {
        error_chain::bail!(ErrorKind::InvalidParameters(
            "image dimensions must be positive".to_string()
        ));
    }
    let mut config = SessionConfig {
        palette: opt.palette,
        ..SessionConfig::default()
    };
    if let Some(threads) = opt.threads {
        config.workers = threads;
    }

    let mut explorer = Explorer::new(Canvas::blank(opt.width, opt.height), config);
    explorer.render(params)?;
    for click in &opt.zoom_at {
        explorer.click(click.0, click.1, opt.zoom_out)?;
    }

    let session = explorer
        .session()
        .ok_or_else(|| Error::from("no render in progress"))?;
    while !session.wait(Some(POLL)) {
        if session.faults() > 0 {
            error_chain::bail!("render failed after {} faults", session.faults());
        }
        info!(
            "{}/{} points, {} pixel writes, {} queued",
            session.painted_points(),
            session.total_points(),
            session.progress(),
            session.queue_length()
        );
    }
    let histogram = match explorer.finish()? {
        Some(session) => session.histogram(),
        None => Histogram::new(),
    };

    explorer
        .canvas()
        .snapshot()
        .save(&opt.output)
        .chain_err(|| format!("could not save image to {}", opt.output.display()))?;
    info!("saved {}", opt.output.display());

    if let Some(path) = opt.histogram {
        chart(&histogram, CHART_W, CHART_H)
            .save(&path)
            .chain_err(|| format!("could not save histogram to {}", path.display()))?;
        info!("saved {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Opt::from_args()) {
        error!("{}", e);
        for cause in e.iter().skip(1) {
            error!("caused by: {}", cause);
        }
        process::exit(1);
    }
}
