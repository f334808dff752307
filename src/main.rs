mod logging;

use sndhw_engine::{Ctl, CtlCallbacks, ElemId, OpenMode, Pcm, Result, Stream};
use std::{process::ExitCode, time::Duration};
use tracing::warn;

const USAGE: &str = "usage:
  sndhw info <ctl>
  sndhw events <ctl> [--count N]
  sndhw status <pcm> [playback|capture]";

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn info(name: &str) -> Result<()> {
    let mut ctl = Ctl::open(name)?;
    let card = ctl.hw_info()?;
    println!("card {}: {} [{}]", card.card, card.id(), card.name());
    println!("  {}", card.longname());
    if !card.mixername().is_empty() {
        println!("  mixer: {}", card.mixername());
    }
    println!(
        "  pcm devices: {}, rawmidi devices: {}, hwdep devices: {}",
        card.pcmdevs, card.rawmididevs, card.hwdepdevs
    );
    for id in ctl.elements()? {
        println!("  element {}: '{}' index {}", id.numid, id.name, id.index);
    }
    ctl.close()
}

fn print_elem(kind: &str, id: &ElemId) {
    println!("{kind} numid={} name='{}' index={}", id.numid, id.name, id.index);
}

fn events(name: &str, count: Option<usize>) -> Result<()> {
    let mut ctl = Ctl::open(name)?;
    let mut callbacks = CtlCallbacks {
        rebuild: Some(Box::new(|| println!("rebuild"))),
        value: Some(Box::new(|id: &ElemId| print_elem("value", id))),
        change: Some(Box::new(|id: &ElemId| print_elem("change", id))),
        add: Some(Box::new(|id: &ElemId| print_elem("add", id))),
        remove: Some(Box::new(|id: &ElemId| print_elem("remove", id))),
    };
    let mut seen = 0;
    while count.is_none_or(|limit| seen < limit) {
        let n = ctl.read(Some(&mut callbacks))?;
        seen += n;
        if n == 0 {
            std::thread::sleep(EVENT_POLL_INTERVAL);
        }
    }
    ctl.close()
}

fn status(name: &str, stream: Stream) -> Result<()> {
    let pcm = Pcm::open(name, stream, OpenMode::NONBLOCK)?;
    let info = pcm.info()?;
    println!(
        "{} ({}): card {} device {} subdevice {}",
        pcm.name(),
        pcm.kind(),
        info.card,
        info.device,
        info.subdevice
    );
    println!("  id: {}", info.id());
    println!("  name: {}", info.name());
    println!("  subdevices: {}/{}", info.subdevices_avail, info.subdevices_count);
    println!("  stream: {stream}");
    println!("  state: {}", pcm.state());
    match pcm.delay() {
        Ok(delay) => println!("  delay: {delay} frames"),
        Err(e) => println!("  delay: unavailable ({e})"),
    }
    pcm.close()
}

fn run(args: &[String]) -> std::result::Result<(), String> {
    let mut args = args.iter().map(String::as_str);
    let command = args.next().ok_or(USAGE)?;
    let name = args.next().ok_or(USAGE)?;
    let rest: Vec<&str> = args.collect();
    let result = match command {
        "info" => {
            if !rest.is_empty() {
                warn!("ignoring extra arguments {rest:?}");
            }
            info(name)
        }
        "events" => {
            let count = match rest.as_slice() {
                [] => None,
                ["--count", n] => Some(
                    n.parse::<usize>()
                        .map_err(|e| format!("bad --count '{n}': {e}"))?,
                ),
                _ => return Err(USAGE.to_string()),
            };
            events(name, count)
        }
        "status" => {
            let stream = match rest.as_slice() {
                [] => Stream::Playback,
                [s] => s.parse::<Stream>().map_err(|e| e.to_string())?,
                _ => return Err(USAGE.to_string()),
            };
            status(name, stream)
        }
        _ => return Err(USAGE.to_string()),
    };
    result.map_err(|e| format!("{name}: {e}"))
}

fn main() -> ExitCode {
    logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
