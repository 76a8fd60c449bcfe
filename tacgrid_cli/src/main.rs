// CLI entry point for inspecting tacgrid map definitions.
//
// Loads a JSON map (see `tacgrid::map`), classifies it, builds the
// connectivity graph and prints a summary. With `--path` it also runs a
// search and prints the route, its cost and the mix of step kinds taken.
//
// Usage:
//   navgrid <MAP.json> [OPTIONS]
//     --path <X,Y,Z> <X,Y,Z>  Find a path between two cells
//     --adjacent              Accept any passable cell next to the goal
//     --verbose, -v           Log debug output to stderr
//     --quiet, -q             Log only errors
//
// Exits with status 1 if the map cannot be loaded or an argument is bad.

use std::path::PathBuf;

use log::{Level, LevelFilter, Metadata, Record};
use tacgrid::edge::StepKind;
use tacgrid::map::MapDefinition;
use tacgrid::{CellCoord, CellFlags, NavGrid};

struct Options {
    map: PathBuf,
    path: Option<(CellCoord, CellCoord)>,
    adjacent: bool,
    level: LevelFilter,
}

fn main() {
    let options = parse_args();
    init_logging(options.level);

    let nav = match MapDefinition::load(&options.map).and_then(|map| map.build_nav_grid()) {
        Ok(nav) => nav,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", options.map.display());
            std::process::exit(1);
        }
    };

    print_summary(&nav);
    if let Some((start, goal)) = options.path {
        print_path(&nav, start, goal, options.adjacent);
    }
}

fn print_summary(nav: &NavGrid) {
    let (sx, sy, sz) = nav.grid().dimensions();
    let ground = nav.grid().count_with(CellFlags::GROUND);
    let steep = nav.grid().count_with(CellFlags::STEEP);
    println!("Grid:      {sx} x {sy} x {sz} ({} cells)", nav.grid().len());
    println!("Ground:    {ground} ({steep} steep)");
    println!("Air:       {}", nav.grid().count_with(CellFlags::AIR));
    println!("Edges:     {}", nav.edge_count());

    let isolated = nav.isolated_cells();
    println!("Isolated:  {}", isolated.len());
    for cell in isolated {
        println!("  {cell}");
    }
}

fn print_path(nav: &NavGrid, start: CellCoord, goal: CellCoord, adjacent: bool) {
    let path = nav.find_path(start, goal, adjacent);
    if path.is_empty() {
        println!("No path from {start} to {goal}");
        return;
    }

    let (mut straight, mut planar, mut spatial) = (0, 0, 0);
    for step in path.windows(2) {
        match StepKind::between(step[0], step[1]) {
            Some(StepKind::Orthogonal) => straight += 1,
            Some(StepKind::Planar) => planar += 1,
            Some(StepKind::Spatial) => spatial += 1,
            None => {}
        }
    }

    println!("Path:      {} cells, cost {:.3}", path.len(), nav.path_cost(&path));
    println!("Steps:     {straight} straight, {planar} diagonal, {spatial} 3D diagonal");
    for cell in &path {
        println!("  {cell}");
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut map = None;
    let mut options = Options {
        map: PathBuf::new(),
        path: None,
        adjacent: false,
        level: LevelFilter::Info,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let start = args.get(i + 1).and_then(|s| parse_coord(s));
                let goal = args.get(i + 2).and_then(|s| parse_coord(s));
                let (Some(start), Some(goal)) = (start, goal) else {
                    eprintln!("--path requires two coordinates like 0,0,0 4,0,2");
                    std::process::exit(1);
                };
                options.path = Some((start, goal));
                i += 2;
            }
            "--adjacent" => options.adjacent = true,
            "--verbose" | "-v" => options.level = LevelFilter::Debug,
            "--quiet" | "-q" => options.level = LevelFilter::Error,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
            other => {
                if map.replace(PathBuf::from(other)).is_some() {
                    eprintln!("Only one map file may be given");
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    match map {
        Some(map) => options.map = map,
        None => {
            print_usage();
            std::process::exit(1);
        }
    }
    options
}

fn parse_coord(text: &str) -> Option<CellCoord> {
    let mut parts = text.split(',').map(|p| p.trim().parse::<i32>());
    let coord = CellCoord::new(
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
    );
    parts.next().is_none().then_some(coord)
}

fn print_usage() {
    println!("Usage: navgrid <MAP.json> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --path <X,Y,Z> <X,Y,Z>  Find a path between two cells");
    println!("  --adjacent              Accept any passable cell next to the goal");
    println!("  --verbose, -v           Log debug output to stderr");
    println!("  --quiet, -q             Log only errors");
    println!("  --help, -h              Show this help");
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Writes log records to stderr as `[LEVEL target] message`.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                Level::Error => "ERROR",
                Level::Warn => "WARN",
                Level::Info => "INFO",
                Level::Debug => "DEBUG",
                Level::Trace => "TRACE",
            };
            eprintln!("[{level} {}] {}", record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(level: LevelFilter) {
    // Only fails if a logger is already installed, which cannot happen here.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
