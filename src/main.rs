fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = kindlebag::cli::Args::parse_from(kindlebag::cli::normalize_args(std::env::args_os()));
    if let Err(e) = kindlebag::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbosity().is_verbose() {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
