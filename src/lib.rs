pub mod cli;
pub mod core;
pub mod fallback;
pub mod news;
pub mod providers;
pub mod report;
pub mod store;

use anyhow::Result;

#[derive(Debug, Clone, Copy)]
pub enum AppCommand {
    Update,
    Show,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    match command {
        AppCommand::Update => cli::update::run(config_path).await,
        AppCommand::Show => cli::show::run(config_path),
    }
}
