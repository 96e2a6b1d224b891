use clap::Parser;
use miette::Result;
use sshinv::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping to `head` exits quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    init_logging(global.verbose);

    match cli.command {
        Commands::Init(args) => sshinv::cli::commands::init::run(args, &global),
        Commands::Cred(cmd) => sshinv::cli::commands::cred::run(cmd, &global),
        Commands::Host(cmd) => sshinv::cli::commands::host::run(cmd, &global),
        Commands::Group(cmd) => sshinv::cli::commands::group::run(cmd, &global),
        Commands::Check(args) => sshinv::cli::commands::check::run(args, &global),
        Commands::Stats => sshinv::cli::commands::stats::run(&global),
        Commands::Config(cmd) => sshinv::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => sshinv::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
