use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use log::error;
use structopt::StructOpt;

use chordring::config::Config;
use chordring::peer::Peer;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "chordctl",
    version = "0.1",
    author = "bene",
    about = "Chord ring peer"
)]
struct Opt {
    /// Path to a custom config file
    #[structopt(short = "c", parse(from_os_str))]
    config: PathBuf,

    /// Address of a bootstrapping peer
    #[structopt(short = "b")]
    bootstrap: Option<SocketAddr>,

    /// Silence all output
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Level of verbosity (v, vv, vvv)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: usize,

    /// Timestamp (sec, ms, ns, none)
    #[structopt(short = "t")]
    timestamp: Option<stderrlog::Timestamp>,
}

fn main() {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .quiet(opt.quiet)
        .verbosity(opt.verbose)
        .timestamp(opt.timestamp.unwrap_or(stderrlog::Timestamp::Off))
        .init()
        .expect("failed to initialize logger");

    let config = Config::load_from_file(opt.config.to_str().unwrap_or_default()).unwrap_or_else(|err| {
        error!("error while loading config file: {}", err);
        process::exit(2);
    });

    let mut peer = Peer::new(config);

    let result = match opt.bootstrap {
        Some(bootstrap) => peer.join(&bootstrap.ip().to_string(), bootstrap.port()),
        None => peer.create(),
    };

    if let Err(err) = result {
        error!("fatal application error: {}", err);
        process::exit(2);
    }

    loop {
        thread::sleep(Duration::from_secs(3600));
    }
}
