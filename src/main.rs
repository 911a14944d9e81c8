use clap::Parser;

fn main() {
    let cli = waymark_lib::cli::Cli::parse();

    waymark_lib::logging::init_logging();
    waymark_lib::config::init_config();
    std::process::exit(waymark_lib::cli::run_command(cli.command));
}
