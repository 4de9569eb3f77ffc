//!
//! printguard-check binary
//! -----------------------
//! Loads an access configuration document, reports every validation error and,
//! when a caller is given, evaluates the access decision for it.

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use printguard::settings::flag_value;
use printguard::{AccessConfig, AccessError, ConfigError, GateSettings, Principal, SecurityContext};

const EXIT_INVALID: u8 = 1;
const EXIT_DENIED: u8 = 2;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --config <doc.json> [--user <id> [--roles <r1,r2>]] [--anonymous] [--template <name>] [--resource <id>]\n\nFlags:\n  --config <path>      Access configuration document (env: PRINTGUARD_CONFIG)\n  --log <filter>       Log filter when RUST_LOG is unset (env: PRINTGUARD_LOG, default: info)\n  --user <id>          Evaluate a decision for this authenticated user\n  --roles <r1,r2>      Comma separated roles granted to --user\n  --anonymous          Evaluate a decision for an unauthenticated caller\n  --template <name>    Check template access instead of the document-wide policy\n  --resource <id>      Resource named in messages (default: '-')\n  -h, --help           Show this help\n\nExit codes: 0 valid/granted, 1 invalid document, 2 access refused."
    );
}

fn parse_roles(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| r.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn run(args: &[String], settings: &GateSettings) -> Result<u8> {
    let path = settings
        .config_path
        .as_deref()
        .ok_or_else(|| anyhow!("no configuration document given (use --config or PRINTGUARD_CONFIG)"))?;
    let config = AccessConfig::from_path(path)?;
    let policies = match config.load() {
        Ok(p) => p,
        Err(ConfigError::Invalid(errors)) => {
            eprintln!("{}: {} validation error(s)", path.display(), errors.len());
            for e in &errors {
                eprintln!("  {e}");
            }
            return Ok(EXIT_INVALID);
        }
        Err(e) => return Err(e.into()),
    };
    println!("{}: ok ({} template(s))", path.display(), policies.template_names().count());

    let ctx = if args.iter().any(|a| a == "--anonymous") {
        SecurityContext::anonymous()
    } else if let Some(user) = flag_value(args, "--user") {
        SecurityContext::authenticated(Principal::new(user, parse_roles(flag_value(args, "--roles"))))
    } else {
        return Ok(0);
    };
    let resource = flag_value(args, "--resource").unwrap_or("-");
    let decision = match flag_value(args, "--template") {
        Some(t) => policies.assert_template_access(&ctx, t, resource),
        None => policies.assert_access(&ctx, "print", resource),
    };
    match decision {
        Ok(()) => {
            println!("granted");
            Ok(0)
        }
        Err(e @ AccessError::UnknownTemplate(_)) => Err(e.into()),
        Err(e) => {
            println!("refused ({} {}): {}", e.http_status(), e.code_str(), e);
            Ok(EXIT_DENIED)
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("printguard-check");
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(program);
        return ExitCode::SUCCESS;
    }
    let settings = GateSettings::from_env().apply_args(&args);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    info!(target: "printguard", "printguard-check starting: config={:?}", settings.config_path);

    match run(&args, &settings) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            print_usage(program);
            ExitCode::from(EXIT_INVALID)
        }
    }
}
