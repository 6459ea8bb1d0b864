use account_purge::config::CliArgs;
use account_purge::utils::error::ErrorSeverity;
use account_purge::utils::{logger, validation::Validate};
use account_purge::{build_ports, AccountDeletionOrchestrator, DeletionResult, FailurePolicy, PurgeConfig};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match PurgeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(config.log_level());
    } else {
        logger::init_cli_logger(args.verbose, config.log_level());
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let mut options = config.deletion_options();
    if args.best_effort {
        options.failure_policy = FailurePolicy::BestEffort;
        tracing::info!("🔧 Failure policy overridden to best effort");
    }

    let orchestrator = AccountDeletionOrchestrator::new(build_ports(&config)?).with_options(options);

    if !args.should_delete() {
        display_plan(&orchestrator, &args);
        return Ok(());
    }

    let result = orchestrator.delete_account().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.summary())?);
    } else {
        display_result(&result);
    }

    if let Err(e) = result.into_result() {
        tracing::error!(
            "❌ Account deletion failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        if let Some(cause) = std::error::Error::source(&e) {
            tracing::error!("   Caused by: {}", cause);
        }
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_plan(orchestrator: &AccountDeletionOrchestrator, args: &CliArgs) {
    println!("📋 Deletion plan:");
    for (i, step) in orchestrator.plan().iter().enumerate() {
        println!("  {}. {} ({})", i + 1, step, step.description());
    }
    println!("  Failure policy: {:?}", orchestrator.options().failure_policy);
    println!(
        "  Concurrent dependent stores: {}",
        orchestrator.options().concurrent_dependents
    );
    println!();

    if args.dry_run {
        println!("🔍 Dry run, no store was contacted.");
    } else {
        println!("⚠️ Nothing deleted. Re-run with --yes to permanently delete the signed-in account.");
    }
}

fn display_result(result: &DeletionResult) {
    for outcome in &result.outcomes {
        match &outcome.cause {
            None => println!("  ✅ {} ({:?})", outcome.step, outcome.duration),
            Some(cause) => println!("  ❌ {}: {}", outcome.step, cause),
        }
    }

    if result.succeeded {
        println!("✅ Account deleted.");
    } else if !result.is_not_authenticated() {
        let residual: Vec<&str> = result.residual_steps().iter().map(|s| s.as_str()).collect();
        println!("⚠️ Data may remain in: {}", residual.join(", "));
    }
}
