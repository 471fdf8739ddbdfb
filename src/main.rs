#[cfg(not(feature = "device"))]
fn main() {
    eprintln!(
        "The chessy-sfx CLI requires the \"device\" feature. Rebuild with `--features device` to enable playback."
    );
}

#[cfg(feature = "device")]
mod cli {
    use std::collections::HashSet;
    use std::env;
    use std::io::{self, BufRead, Write};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;
    use std::time::Duration;

    use anyhow::{bail, Context};
    use chessy_client::{PlaybackRegistry, RodioBackend, SoundBank};
    use tracing_subscriber::EnvFilter;

    const PUMP_INTERVAL: Duration = Duration::from_millis(50);

    /// Parsed command-line arguments.
    #[derive(Debug, Default)]
    struct CliArgs {
        bank_path: Option<String>,
        volume_override: Option<f32>,
        looped_events: HashSet<String>,
        show_help: bool,
    }

    impl CliArgs {
        fn parse() -> Self {
            let mut args = Self::default();
            let mut iter = env::args().skip(1);

            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--help" | "-h" => {
                        args.show_help = true;
                    }
                    "--bank" => match iter.next() {
                        Some(value) => args.bank_path = Some(value),
                        None => {
                            eprintln!("--bank requires a file argument");
                            args.show_help = true;
                        }
                    },
                    "--volume" => match iter.next().map(|v| v.parse::<f32>()) {
                        Some(Ok(volume)) => args.volume_override = Some(volume),
                        Some(Err(_)) | None => {
                            eprintln!("--volume requires a number between 0 and 1");
                            args.show_help = true;
                        }
                    },
                    "--loop" => match iter.next() {
                        Some(event) => {
                            args.looped_events.insert(event);
                        }
                        None => {
                            eprintln!("--loop requires an event name");
                            args.show_help = true;
                        }
                    },
                    _ if arg.starts_with("--bank=") => {
                        args.bank_path = Some(arg["--bank=".len()..].to_string());
                    }
                    _ if arg.starts_with('-') => {
                        eprintln!("Unknown flag: {}", arg);
                        args.show_help = true;
                    }
                    _ => {
                        args.bank_path = Some(arg);
                    }
                }
            }

            args
        }
    }

    /// One line entered at the prompt.
    #[derive(Debug, PartialEq, Eq)]
    pub(super) enum Command<'a> {
        Empty,
        Quit,
        List,
        Stop(&'a str),
        Reset(&'a str),
        Fire(&'a str),
        /// `stop` or `reset` without an event name
        MissingEvent(&'a str),
        Unknown(&'a str),
    }

    impl<'a> Command<'a> {
        pub(super) fn parse(line: &'a str) -> Self {
            let mut words = line.split_whitespace();
            match (words.next(), words.next()) {
                (None, _) => Command::Empty,
                (Some("quit" | "exit"), _) => Command::Quit,
                (Some("list"), _) => Command::List,
                (Some("stop"), Some(event)) => Command::Stop(event),
                (Some("reset"), Some(event)) => Command::Reset(event),
                (Some(command @ ("stop" | "reset")), None) => Command::MissingEvent(command),
                (Some(event), None) => Command::Fire(event),
                (Some(other), Some(_)) => Command::Unknown(other),
            }
        }
    }

    fn print_usage() {
        eprintln!(
            "Usage:\n  chessy-sfx [--volume <0..1>] [--loop <event>]... --bank <bank.json>\n\n\
             Flags:\n  --bank <file>        Sound bank to load (JSON)\n  \
             --volume <v>         Override the bank's master volume\n  \
             --loop <event>       Play <event> looped when entered at the prompt\n  \
             -h, --help           Show this help\n\n\
             Prompt commands:\n  <event>              Fire an event\n  \
             stop <event>         Pause an event's sound\n  \
             reset <event>        Stop and rewind an event's sound\n  \
             list                 Show bindings and their state\n  \
             quit                 Exit\n\n\
             Set CHESSY_LOG=debug for playback tracing."
        );
    }

    fn init_logging() {
        let filter = EnvFilter::try_from_env("CHESSY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }

    fn print_bindings(sounds: &PlaybackRegistry<RodioBackend>) {
        for name in sounds.event_names() {
            let Some(clip) = sounds.clip(name) else {
                continue;
            };
            println!(
                "  {:<12} {:<8} {:>7.2}s  {}",
                name,
                if clip.is_playing() { "playing" } else { "idle" },
                clip.position().as_secs_f32(),
                clip.resource()
            );
        }
    }

    pub fn run() -> anyhow::Result<()> {
        init_logging();

        let args = CliArgs::parse();
        if args.show_help || args.bank_path.is_none() {
            print_usage();
            if args.bank_path.is_none() {
                return Ok(());
            }
        }
        let Some(bank_path) = args.bank_path else {
            return Ok(());
        };

        let mut bank = SoundBank::load(&bank_path)
            .with_context(|| format!("Failed to load sound bank '{}'", bank_path))?;
        if let Some(volume) = args.volume_override {
            bank.volume = volume;
        }
        bank.validate().context("Invalid volume override")?;
        if bank.sounds.is_empty() {
            bail!("Sound bank '{}' has no sounds", bank_path);
        }

        let backend = RodioBackend::new().context("Failed to open the audio device")?;
        let mut sounds = PlaybackRegistry::new(backend);
        sounds.load_bank(&bank);

        println!("chessy-sfx: {} sound(s) loaded", sounds.len());
        print_bindings(&sounds);
        print!("> ");
        io::stdout().flush().ok();

        // Stdin is read on its own thread so natural-end notices keep being
        // applied while the prompt waits.
        let (line_tx, line_rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            for line in io::stdin().lock().lines().map_while(Result::ok) {
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });

        loop {
            match line_rx.recv_timeout(PUMP_INTERVAL) {
                Ok(line) => {
                    match Command::parse(&line) {
                        Command::Empty => {}
                        Command::Quit => break,
                        Command::List => print_bindings(&sounds),
                        Command::Stop(event) => sounds.stop(event),
                        Command::Reset(event) => sounds.reset(event),
                        Command::Fire(event) => {
                            let looping = args.looped_events.contains(event);
                            match sounds.dispatch(event, looping) {
                                Ok(true) => println!("playing '{}'", event),
                                Ok(false) => println!("'{}' is already playing", event),
                                Err(err) => println!("{}", err),
                            }
                        }
                        Command::MissingEvent(command) => {
                            println!("Usage: {} <event>", command)
                        }
                        Command::Unknown(other) => println!("Unknown command: {}", other),
                    }
                    print!("> ");
                    io::stdout().flush().ok();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let report = sounds.pump();
            for failure in &report.failures {
                println!("\n{}", failure);
            }
        }

        println!("bye");
        Ok(())
    }
}

#[cfg(feature = "device")]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(all(test, feature = "device"))]
mod tests {
    use super::cli::Command;

    #[test]
    fn test_stop_and_reset_need_an_event() {
        assert_eq!(Command::parse("stop"), Command::MissingEvent("stop"));
        assert_eq!(Command::parse("  reset "), Command::MissingEvent("reset"));
        assert_eq!(Command::parse("stop move"), Command::Stop("move"));
        assert_eq!(Command::parse("reset clock"), Command::Reset("clock"));
    }

    #[test]
    fn test_prompt_commands() {
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("exit"), Command::Quit);
        assert_eq!(Command::parse("list"), Command::List);
        assert_eq!(Command::parse("check"), Command::Fire("check"));
        assert_eq!(Command::parse("play check"), Command::Unknown("play"));
    }
}
