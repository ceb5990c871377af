use std::path::PathBuf;

use snooby::app::{self, RunOptions};

const HELP: &str = "Snooby - Browse Reddit as rendered HTML screens.

  --subreddit NAME     Show NAME instead of the configured default
  --comments LINK      Show the comment thread of LINK (t3_ name or id)
  --out PATH           Write the page to PATH instead of stdout
  --open               Open the page in the default browser
  --offline            Use built-in sample data instead of reddit.com
  --login USER         Log in as USER (password from SNOOBY_PASSWORD)
  --logout             Forget the saved login
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(err) => {
            eprintln!("error: {err}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    app::init_logging();
    if let Err(err) = snooby::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<RunOptions>> {
    let mut opts = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Snooby {}", snooby::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(None);
            }
            "--subreddit" => opts.subreddit = Some(value(&arg, args.next())?),
            "--comments" => opts.comments = Some(value(&arg, args.next())?),
            "--out" => opts.output = Some(PathBuf::from(value(&arg, args.next())?)),
            "--login" => opts.login = Some(value(&arg, args.next())?),
            "--open" => opts.open = true,
            "--offline" => opts.offline = true,
            "--logout" => opts.logout = true,
            other => anyhow::bail!("unknown argument {other}"),
        }
    }
    Ok(Some(opts))
}

fn value(flag: &str, next: Option<String>) -> anyhow::Result<String> {
    next.filter(|v| !v.starts_with("--"))
        .ok_or_else(|| anyhow::anyhow!("{flag} needs a value"))
}
