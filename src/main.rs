fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = seek_scrape::cli::Args::parse();
    if let Err(e) = seek_scrape::logging::init(args.verbose) {
        eprintln!("Warning: {}", e);
    }
    if let Err(e) = seek_scrape::cli::run(&args) {
        eprintln!("Error: {}", e);
        if args.verbose > 0 {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
