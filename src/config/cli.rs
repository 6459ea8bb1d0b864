use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "account-purge")]
#[command(about = "Permanently delete the signed-in user's account from every store")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "account-purge.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Confirm the deletion. Without it only the plan is shown.
    #[arg(long)]
    pub yes: bool,

    /// Show the deletion plan without calling any store
    #[arg(long)]
    pub dry_run: bool,

    /// Keep deleting dependent records after a store fails
    #[arg(long)]
    pub best_effort: bool,

    /// Print the deletion summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Deletion only runs when confirmed and not a dry run.
    pub fn should_delete(&self) -> bool {
        self.yes && !self.dry_run
    }
}
