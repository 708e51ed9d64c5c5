use std::{env, io, process::exit, sync::Once};

use treelox::{Config, Lox, LoxError};

const USAGE_EXIT_CODE: i32 = 64;

static TRACING_INIT: Once = Once::new();

/// Installs a stderr logger when `RUST_LOG` is set, e.g. `RUST_LOG=treelox=debug`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let args = Vec::from_iter(env::args().skip(1));

    let result = match args.len() {
        0 => Lox::new(Config::repl()).run_prompt(io::stdin().lock(), io::stdout()),
        1 => Lox::new(Config::default()).run_file(&args[0]),
        _ => {
            println!("Usage: lox [script]");
            exit(USAGE_EXIT_CODE);
        }
    };

    match result {
        Ok(()) => {}
        Err(LoxError::Exit(code)) => exit(code),
        Err(error) => {
            eprintln!("{}", error);
            exit(error.exit_code());
        }
    }
}
