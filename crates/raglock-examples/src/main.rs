mod scenarios;

use std::env;

type AnyResult<T> = Result<T, String>;

struct Args {
    list: bool,
    dump_json: bool,
    requested: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let args = parse_args()?;
    let all = scenarios::all();

    if args.list {
        for scenario in all {
            println!("{:<24} {}", scenario.name, scenario.about);
        }
        return Ok(());
    }

    let selected: Vec<&scenarios::Scenario> = match args.requested {
        Some(requested) => vec![resolve_requested(all, &requested)?],
        None => all.iter().collect(),
    };

    for scenario in selected {
        tracing::info!(scenario = scenario.name, "running");
        let system = (scenario.run)()?;
        let stats = system.stats();
        tracing::info!(
            scenario = scenario.name,
            grants = stats.grants,
            rejections = stats.rejections,
            releases = stats.releases,
            "scenario finished"
        );
        if args.dump_json {
            let json = system.dump_graph_json().map_err(|e| e.to_string())?;
            println!("{json}");
        } else {
            print!("{}", system.dump_graph());
        }
        system
            .teardown()
            .map_err(|e| format!("teardown failed after '{}': {e}", scenario.name))?;
    }
    Ok(())
}

fn parse_args() -> AnyResult<Args> {
    let mut list = false;
    let mut dump_json = false;
    let mut requested: Option<String> = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--list" => list = true,
            "--json" => dump_json = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'"));
            }
            _ => {
                if requested.is_some() {
                    return Err("Too many arguments".to_owned());
                }
                requested = Some(arg);
            }
        }
    }

    Ok(Args {
        list,
        dump_json,
        requested,
    })
}

fn print_help() {
    eprintln!("Usage: raglock-examples [--list] [--json] [scenario-name]");
}

fn resolve_requested<'a>(
    all: &'a [scenarios::Scenario],
    requested: &str,
) -> AnyResult<&'a scenarios::Scenario> {
    if let Some(exact) = all.iter().find(|s| s.name == requested) {
        return Ok(exact);
    }

    let needle = requested.to_lowercase();
    if let Some(close) = all.iter().find(|s| s.name.contains(&needle)) {
        eprintln!(
            "Using closest scenario match '{}' for '{}'.",
            close.name, requested
        );
        return Ok(close);
    }

    Err(format!(
        "Unknown scenario '{requested}'. Run with --list to see them."
    ))
}
