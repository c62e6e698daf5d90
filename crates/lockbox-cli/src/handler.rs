//! Command handlers.

use crate::commands::{Cli, Commands};
use crate::output;
use anyhow::{Context, bail};
use chrono::{Duration as TimeDelta, Utc};
use lockbox_core::{Credentials, ProviderKind, ValidityWindow};
use lockbox_providers::{ProviderConfig, ProviderRegistry};
use lockbox_service::{
    AccessCodeView, AccessContext, Housekeeper, IssueCodeRequest, LockRegistration,
    ServiceConfig, SmartLockService,
};
use lockbox_storage::models::{ActivityFilter, CodeFilter, PageRequest};
use lockbox_storage::{Database, DatabaseConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

impl Cli {
    fn provider_config(&self) -> ProviderConfig {
        let overrides = [
            (ProviderKind::August, &self.august_api_base),
            (ProviderKind::Yale, &self.yale_api_base),
            (ProviderKind::Schlage, &self.schlage_api_base),
            (ProviderKind::Nuki, &self.nuki_api_base),
            (ProviderKind::Generic, &self.generic_api_base),
        ];
        overrides
            .into_iter()
            .fold(ProviderConfig::default(), |config, (kind, url)| match url {
                Some(url) => config.with_base_url(kind, url.as_str()),
                None => config,
            })
    }

    fn service_config(&self) -> ServiceConfig {
        let config = ServiceConfig::default()
            .code_length(self.code_length)
            .provider_timeout(Duration::from_millis(self.provider_timeout_ms));
        match self.command {
            Commands::Sweep { interval_secs, .. } => {
                config.sweep_interval(Duration::from_secs(interval_secs))
            }
            _ => config,
        }
    }

    /// The CLI acts for the platform unless a user id is given.
    fn context(&self) -> AccessContext {
        match self.user {
            Some(user_id) => AccessContext::owner(user_id),
            None => AccessContext::system(),
        }
    }
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Migrate = cli.command {
        let db = Database::new(DatabaseConfig::new(&cli.database).auto_migrate(false))
            .await
            .with_context(|| format!("opening {}", cli.database))?;
        db.migrate().await.context("running migrations")?;
        println!("Database {} is up to date", cli.database);
        db.close().await;
        return Ok(());
    }

    let db = Database::new(DatabaseConfig::new(&cli.database))
        .await
        .with_context(|| format!("opening {}", cli.database))?;
    let providers = ProviderRegistry::new(cli.provider_config())?;
    let service = Arc::new(SmartLockService::new(&db, providers, cli.service_config())?);

    let result = dispatch(&cli, service).await;
    db.close().await;
    result
}

async fn dispatch(cli: &Cli, service: Arc<SmartLockService>) -> anyhow::Result<()> {
    let ctx = cli.context();
    let format = cli.format;

    match &cli.command {
        Commands::Migrate => Ok(()),

        Commands::AddLock {
            property,
            provider,
            device,
            name,
            location,
            credentials,
            settings,
        } => {
            let mut registration = LockRegistration::new(*property, *provider, device, name);
            if let Some(location) = location {
                registration = registration.with_location(location);
            }
            if let Some(credentials) = credentials {
                registration = registration.with_credentials(Credentials::new(credentials.as_str()));
            }
            if let Some(settings) = settings {
                let settings: serde_json::Value =
                    serde_json::from_str(settings).context("--settings must be valid JSON")?;
                registration = registration.with_settings(settings);
            }

            let lock = service.register_lock(registration, &ctx).await?;
            output::print_lock(&lock, format);
            Ok(())
        }

        Commands::Issue {
            lock,
            code_type,
            from,
            until,
            hours,
            max_uses,
            booking,
            guest,
            notes,
        } => {
            let valid_from = from.unwrap_or_else(Utc::now);
            let valid_until = match (until, hours) {
                (Some(until), _) => Some(*until),
                (None, Some(hours)) if *hours > 0 => Some(valid_from + TimeDelta::hours(*hours)),
                (None, Some(hours)) => bail!("--hours must be positive, got {hours}"),
                (None, None) => None,
            };
            let window = ValidityWindow::new(valid_from, valid_until)?;

            let mut request = IssueCodeRequest::new(*lock, window, *code_type);
            request.max_uses = *max_uses;
            request.booking_id = *booking;
            request.user_id = *guest;
            request.notes = notes.clone();

            let code = service.issue_code(request, &ctx).await?;
            output::print_codes(&[AccessCodeView::revealed(&code, Utc::now())], format);
            Ok(())
        }

        Commands::Revoke { code, booking } => {
            match (code, booking) {
                (Some(code_id), _) => {
                    let provider_ok = service.revoke_code(*code_id, &ctx).await?;
                    output::print_message(
                        &format!(
                            "Code {code_id} revoked{}",
                            if provider_ok { "" } else { " locally (provider removal failed)" }
                        ),
                        format,
                    );
                }
                (None, Some(booking_id)) => {
                    let revoked = service.revoke_codes_for_booking(*booking_id, &ctx).await?;
                    output::print_message(
                        &format!("Revoked {revoked} code(s) of booking {booking_id}"),
                        format,
                    );
                }
                (None, None) => bail!("either --code or --booking is required"),
            }
            Ok(())
        }

        Commands::Lock { lock } => {
            let outcome = service.remote_lock(*lock, &ctx).await?;
            output::print_outcome(&outcome, format);
            Ok(())
        }

        Commands::Unlock { lock } => {
            let outcome = service.remote_unlock(*lock, &ctx).await?;
            output::print_outcome(&outcome, format);
            Ok(())
        }

        Commands::Sync { lock } => {
            let lock = service.sync_lock_status(*lock, &ctx).await?;
            output::print_lock(&lock, format);
            Ok(())
        }

        Commands::Codes {
            lock,
            status,
            code_type,
        } => {
            let filter = CodeFilter {
                status: *status,
                code_type: *code_type,
            };
            let codes = service.list_codes(*lock, filter, &ctx).await?;
            output::print_codes(&codes, format);
            Ok(())
        }

        Commands::Activity {
            lock,
            event,
            since,
            offset,
            limit,
        } => {
            let filter = ActivityFilter {
                event_type: *event,
                from: *since,
                until: None,
            };
            let page = service
                .list_activity(*lock, filter, PageRequest::new(*offset, *limit), &ctx)
                .await?;
            output::print_activity(&page, format);
            Ok(())
        }

        Commands::Sweep { watch, .. } => {
            if !*watch {
                let report = service.sweep(Utc::now(), &ctx).await?;
                output::print_sweep(&report, format);
                return Ok(());
            }

            let handle = Housekeeper::new(service.clone()).start();
            tokio::signal::ctrl_c()
                .await
                .context("waiting for interrupt")?;
            info!("Interrupt received, stopping housekeeper");
            let sweeps = handle.shutdown().await;
            output::print_message(&format!("Stopped after {sweeps} sweep(s)"), format);
            Ok(())
        }
    }
}
