use clap::Parser;
use css_sieve_lib::sieve_generate;
use log::{info, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "css-sieve")]
#[command(about = "Remove CSS rules that match nothing in an HTML document")]
struct Args {
    /// HTML document the stylesheet is matched against.
    #[arg(long)]
    html: PathBuf,

    /// Stylesheet to prune.
    stylesheet: PathBuf,

    /// Output file name. The pruned stylesheet goes to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    // parse the args given in terminal
    let args: Args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .init();

    let html_content = read_or_exit(&args.html, "HTML");
    let css_content = read_or_exit(&args.stylesheet, "stylesheet");

    let pruned = match sieve_generate::css_sieve::generate(&html_content, &css_content) {
        Ok(pruned) => pruned,
        Err(e) => {
            eprintln!("Error pruning {}: {}", args.stylesheet.display(), e);
            std::process::exit(1);
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = fs::write(path, pruned) {
                eprintln!("Error writing {}: {}", path.display(), e);
                std::process::exit(1);
            }
            info!("wrote {}", path.display());
        }
        None => print!("{}", pruned),
    }
}

fn read_or_exit(path: &Path, what: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {} file {}: {}", what, path.display(), e);
            std::process::exit(1);
        }
    }
}
