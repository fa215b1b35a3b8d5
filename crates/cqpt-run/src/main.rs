use clap::Parser;

fn main() -> miette::Result<()> {
    cqpt_run::Cli::parse().run()
}
