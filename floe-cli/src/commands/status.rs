//! `floe status` command - show applied and pending migrations.

use floe_clickhouse::ChClient;
use floe_migrate::{Migrator, MigratorConfig};

use crate::cli::StatusArgs;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the status command
pub async fn run(args: StatusArgs) -> CliResult<()> {
    output::header("Status");

    let config = args.connection.to_config()?;
    output::kv("Database", &config.database);
    output::kv("Migrations", &args.migrations.display().to_string());
    output::newline();

    let client = ChClient::connect(&config);
    let migrator_config = MigratorConfig::new().migrations_dir(&args.migrations);
    let migrator = Migrator::new(migrator_config, client);

    migrator.initialize().await?;
    let status = migrator.status().await?;

    if status.applied.is_empty() {
        output::list("No migrations applied yet.");
    } else {
        output::list(&format!("{} applied:", status.applied.len()));
        for entry in &status.applied {
            output::list_item(&format!(
                "V{} {} ({})",
                entry.version,
                entry.script,
                entry.applied_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }
    output::newline();

    if status.pending.is_empty() {
        success("Up to date, nothing pending.");
    } else {
        output::list(&format!("{} pending:", status.pending.len()));
        for version in &status.pending {
            output::list_item(&format!("V{version}"));
        }
    }

    Ok(())
}
