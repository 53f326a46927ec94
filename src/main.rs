use clap::Parser;
use keystash::cli::{Cli, Commands};
use keystash::cli::commands;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Add {
            ref name,
            ref value,
            ref labels,
            ref expires,
            inactive,
        } => commands::add::execute(
            &cli,
            name,
            value.as_deref(),
            labels,
            expires.as_deref(),
            inactive,
        ),
        Commands::Get { ref name } => commands::get::execute(&cli, name),
        Commands::Update {
            ref name,
            ref value,
        } => commands::update::execute(&cli, name, value.as_deref()),
        Commands::Remove { ref name, force } => commands::remove::execute(&cli, name, force),
        Commands::List {
            ref labels,
            active_only,
            counts,
        } => commands::list::execute(&cli, labels, active_only, counts),
        Commands::Label {
            ref name,
            ref labels,
            ref expires,
            no_expiry,
        } => commands::label::execute(&cli, name, labels, expires.as_deref(), no_expiry),
        Commands::Next { ref labels, value } => commands::next::execute(&cli, labels, value),
        Commands::Activate { ref name } => commands::activate::execute(&cli, name, true),
        Commands::Deactivate { ref name } => commands::activate::execute(&cli, name, false),
    };

    if let Err(e) = result {
        keystash::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so `keystash get` output stays pipeable.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KEYSTASH_LOG")
        .unwrap_or_else(|_| EnvFilter::new("keystash=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
