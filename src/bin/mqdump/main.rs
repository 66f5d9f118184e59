use structopt::StructOpt;

use std::{fs, io, path, process::exit, sync::Arc};

use mqv3::{util, ClientBuilder, Config, FrameReader, Packet, Packetize, Result, Transport};

/// Decode MQTT version 3 frames and print them.
#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(long = "config")]
    config_loc: Option<path::PathBuf>,

    #[structopt(short = "v", long = "verbose")]
    verbose: bool,

    #[structopt(subcommand)]
    subcmd: SubCommand,
}

#[derive(Clone, StructOpt)]
pub enum SubCommand {
    /// Decode hex encoded bytes, for example `10 15 00 06 4d 51 ..`.
    Hex { bytes: Vec<String> },
    /// Decode every frame in a binary capture file.
    File { loc: path::PathBuf },
    /// Print the CONNECT frame for configuration.
    Connect,
}

// Prints every frame handed over by the client.
struct HexTransport;

impl Transport for HexTransport {
    fn send(&self, data: &[u8]) -> Result<()> {
        println!("{}", util::to_hex(data));
        Ok(())
    }
}

fn main() {
    setup_logging();

    let opts = Opt::from_args();

    let config = match &opts.config_loc {
        Some(loc) => match Config::from_file(loc) {
            Ok(config) => config,
            Err(err) => {
                println!("invalid config file {:?}: {}", loc, err);
                exit(1);
            }
        },
        None => Config::default(),
    };

    let res: Result<()> = match &opts.subcmd {
        SubCommand::Hex { bytes } => handle_hex(&opts, bytes),
        SubCommand::File { loc } => handle_file(&opts, loc),
        SubCommand::Connect => handle_connect(config),
    };

    if let Err(err) = res {
        println!("unexpected error: {}", err);
        exit(1);
    }
}

fn handle_hex(opts: &Opt, bytes: &[String]) -> Result<()> {
    let mut data = vec![];
    for token in bytes.join(" ").split_whitespace() {
        let token = token.trim_start_matches("0x");
        for i in (0..token.len()).step_by(2) {
            let digits = token.get(i..(i + 2).min(token.len())).unwrap_or("");
            match u8::from_str_radix(digits, 16) {
                Ok(byte) => data.push(byte),
                Err(err) => {
                    let msg = format!("bad hex {:?}: {}", digits, err);
                    Err(io::Error::new(io::ErrorKind::InvalidData, msg))?
                }
            }
        }
    }

    dump_frames(opts, io::Cursor::new(data))
}

fn handle_file(opts: &Opt, loc: &path::Path) -> Result<()> {
    let fd = fs::File::open(loc)?;
    dump_frames(opts, io::BufReader::new(fd))
}

fn handle_connect(config: Config) -> Result<()> {
    let client = ClientBuilder::from_config(&config)?.build(Arc::new(HexTransport))?;
    client.connect()
}

fn dump_frames<R: io::Read>(opts: &Opt, stream: R) -> Result<()> {
    let mut reader = FrameReader::new("mqdump", stream);
    loop {
        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) if err.kind() == mqv3::ErrorKind::ConnectionError => break Ok(()),
            Err(err) => break Err(err),
        };

        let (pkt, _) = Packet::decode(&frame)?;
        match opts.verbose {
            true => println!("{} {:?}", pkt, pkt),
            false => println!("{}", pkt),
        }
    }
}

fn setup_logging() {
    use env_logger::{fmt::Color, Builder, WriteStyle};
    use log::Level;
    use std::io::Write;

    Builder::from_default_env()
        .format(|f, r| {
            let mut level_style = f.style();
            match r.level() {
                Level::Error => level_style.set_color(Color::Red).set_bold(false),
                Level::Warn => level_style.set_color(Color::Yellow).set_bold(false),
                Level::Info => level_style.set_color(Color::Blue).set_bold(false),
                Level::Debug => level_style.set_color(Color::Magenta).set_bold(false),
                Level::Trace => level_style.set_color(Color::Cyan).set_bold(false),
            };
            let mut mod_style = f.style();
            mod_style.set_color(Color::Green).set_bold(false);
            let file = r
                .file()
                .and_then(|file| path::Path::new(file).file_name())
                .and_then(|file| file.to_str())
                .unwrap_or("-");
            writeln!(
                f,
                "{} [{:5} {:15}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%.3f%Z"),
                level_style.value(r.level()),
                mod_style.value(format!("{}:{}", file, r.line().unwrap_or(0))),
                r.args()
            )
        })
        .write_style(WriteStyle::Auto)
        .init();
}
