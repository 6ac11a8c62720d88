//! `floe migrate` command - apply pending migrations.

use std::time::Duration;

use floe_clickhouse::ChClient;
use floe_migrate::{Migrator, MigratorConfig};

use crate::cli::MigrateArgs;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the migrate command
pub async fn run(args: MigrateArgs) -> CliResult<()> {
    output::header("Migrate");

    let config = args.connection.to_config()?;
    output::kv("Database", &config.database);
    output::kv("Host", &config.http_url());
    output::kv("Migrations", &args.migrations.display().to_string());
    if args.queue {
        output::kv("Queued mode", &format!("on (timeout {}s)", args.timeout));
    }
    output::newline();

    if args.create_db {
        ChClient::create_database(&config).await?;
    }

    let client = ChClient::connect(&config);
    let migrator_config = MigratorConfig::new()
        .migrations_dir(&args.migrations)
        .queue_exec(args.queue)
        .mutation_timeout(Duration::from_secs(args.timeout))
        .poll_interval(Duration::from_secs(args.poll_interval));
    let migrator = Migrator::new(migrator_config, client);

    migrator.initialize().await?;

    let pending = migrator.plan().await?;
    if pending.is_empty() {
        success("Nothing to apply, the database is up to date.");
        return Ok(());
    }

    output::list(&format!("{} pending migrations:", pending.len()));
    for candidate in &pending {
        output::list_item(&format!(
            "V{} {}",
            candidate.version,
            candidate.path.display()
        ));
    }
    output::newline();

    if args.dry_run {
        warn("Dry run, nothing was applied.");
        return Ok(());
    }

    let report = migrator.migrate().await?;
    success(&report.summary());
    Ok(())
}
