mod hw;
mod sim;

use std::cell::RefCell;
use std::fs::File;
use std::path::PathBuf;
use std::rc::Rc;

use transit_core::persistence::FileStorage;
use transit_core::{App, Config};
use transit_types::{Event, MonomeDevice, OUTPUT_COUNT};

use hw::{Activity, TracePins, TraceSurface};
use sim::Simulation;

const USAGE: &str = "\
usage: transit-sim [options]

  --seconds <n>        virtual seconds to run (default 10)
  --connect <device>   grid, arc or midi
  --adc <0-4095>       param knob position (default 1000)
  --ext-clock <ms>     patch an external clock with this period
  --storage <dir>      state directory (default: user data dir)
  --demo               with --connect grid, program a four-step pattern
  --save               write the active mode's state before exiting
  -v, --verbose        debug logging";

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("transit")
        .join("transit.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = File::create(&log_path).unwrap_or_else(|_| {
        File::create("/tmp/transit.log").expect("Cannot create log file")
    });

    WriteLogger::init(log_level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    log::info!("transit-sim starting (log level: {:?})", log_level);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> Result<T, String> {
    match flag_value(args, flag) {
        Some(v) => v.parse().map_err(|_| format!("invalid value for {}: {}", flag, v)),
        None => Ok(default),
    }
}

fn connect_event(device: &str) -> Result<Event, String> {
    match device {
        "grid" => Ok(Event::MonomeConnect { device: MonomeDevice::Grid }),
        "arc" => Ok(Event::MonomeConnect { device: MonomeDevice::Arc }),
        "midi" => Ok(Event::MidiConnect),
        other => Err(format!("unknown device: {}", other)),
    }
}

/// Voice 0 of track 0 on every fourth step.
fn demo_pattern(sim: &mut Simulation) {
    for x in [0u8, 4, 8, 12] {
        sim.post(Event::GridKey { x, y: 0, pressed: true });
        sim.post(Event::GridKey { x, y: 0, pressed: false });
    }
}

fn print_summary(sim: &Simulation, activity: &Activity) {
    let app = sim.app();
    println!("ran {:.3} s", sim.elapsed_us() as f64 / 1_000_000.0);
    match app.mode() {
        Some(mode) => println!("mode        {} ({:?})", mode, app.connection()),
        None => println!("mode        none"),
    }
    if app.phasor().is_running() {
        println!("phasor      {} Hz", app.phasor().frequency());
    } else {
        println!("raw clock   {} ms", app.clock_period_ms());
    }
    println!("events      {} handled, {} dropped", sim.events_handled(), app.dropped_events());
    println!("clock out   {} pulses", activity.clock_rises);
    for i in 0..OUTPUT_COUNT {
        println!("out {}       {} triggers", i + 1, activity.rises[i]);
    }
    println!("frames      {} ({} leds lit)", activity.frames, activity.lit);
}

fn run(args: &[String]) -> Result<(), String> {
    let seconds: f64 = parse_flag(args, "--seconds", 10.0)?;
    let adc: u16 = parse_flag(args, "--adc", 1000)?;
    let ext_clock = match flag_value(args, "--ext-clock") {
        Some(v) => Some(v.parse::<u64>().map_err(|_| format!("invalid value for --ext-clock: {}", v))?),
        None => None,
    };
    let connect = flag_value(args, "--connect").map(connect_event).transpose()?;
    let storage_dir = flag_value(args, "--storage")
        .map(PathBuf::from)
        .unwrap_or_else(FileStorage::default_dir);

    let storage = FileStorage::open(&storage_dir)
        .map_err(|e| format!("cannot open storage {}: {}", storage_dir.display(), e))?;
    log::info!(target: "sim", "storage at {}", storage.dir().display());

    let settings = Config::load().settings();
    let activity = Rc::new(RefCell::new(Activity::default()));
    let mut app = App::new(
        settings,
        Box::new(TracePins::new(Rc::clone(&activity))),
        Box::new(storage),
        Box::new(TraceSurface::new(Rc::clone(&activity))),
    );
    app.boot();

    let mut sim = Simulation::new(app, adc, ext_clock);
    if let Some(event) = connect {
        sim.post(event);
    }
    if args.iter().any(|a| a == "--demo") {
        if matches!(connect, Some(Event::MonomeConnect { device: MonomeDevice::Grid })) {
            demo_pattern(&mut sim);
        } else {
            log::warn!(target: "sim", "--demo needs --connect grid");
        }
    }

    sim.run((seconds.max(0.0) * 1_000_000.0) as u64);

    if args.iter().any(|a| a == "--save") {
        sim.post(Event::SaveFlash);
    }

    print_summary(&sim, &activity.borrow());
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return;
    }
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("transit-sim: {}", e);
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }
}
