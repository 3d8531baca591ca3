//! Command dispatch and handler modules.

mod downgrade;
mod edit;
mod list;
mod minimize;
mod tree;
mod upgrade;
mod why;

use std::path::Path;
use std::sync::Arc;

use miette::Result;
use mvs_core::config::MvsConfig;
use mvs_core::order::{DottedOrder, OrderByPath, SemverOrder};
use mvs_core::table::RequirementTable;
use mvs_core::{ModuleVersion, VersionOrder};
use mvs_resolver::{ResolveError, Resolver};
use mvs_util::errors::MvsError;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::List { table } => list::exec(&open(&table, &cli.config)?).await,
        Command::Tree { table, depth } => tree::exec(&open(&table, &cli.config)?, depth).await,
        Command::Why { table, path } => why::exec(&open(&table, &cli.config)?, &path).await,
        Command::Minimize { table, base } => {
            minimize::exec(&open(&table, &cli.config)?, &base).await
        }
        Command::Upgrade {
            table,
            all,
            modules,
        } => upgrade::exec(&open(&table, &cli.config)?, all, &modules).await,
        Command::Downgrade { table, modules } => {
            downgrade::exec(&open(&table, &cli.config)?, &modules).await
        }
        Command::Edit { table, add, pin } => {
            edit::exec(&open(&table, &cli.config)?, &add, &pin).await
        }
    }
}

/// A loaded table and a resolver over it.
pub(crate) struct Session {
    pub table: Arc<RequirementTable>,
    pub resolver: Resolver,
    pub target: ModuleVersion,
}

/// Ordinary modules use semantic versions; the `toolchain` pseudo-path
/// uses toolchain-style versions.
fn version_order() -> Arc<dyn VersionOrder> {
    Arc::new(OrderByPath::new(Arc::new(SemverOrder)).with_path("toolchain", Arc::new(DottedOrder)))
}

fn open(table_path: &Path, config_path: &Path) -> Result<Session> {
    let config = MvsConfig::from_path(config_path)?;
    let order = version_order();
    let table = Arc::new(RequirementTable::from_path(table_path, order.clone())?);
    let target = table.targets().first().cloned().ok_or_else(|| MvsError::Table {
        message: format!("{} names no target module", table_path.display()),
    })?;

    // Ctrl-C stops an in-flight resolution.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    tracing::debug!(
        "Resolving {target} from {} with {} jobs, fetch policy {:?}",
        table_path.display(),
        config.resolver.jobs,
        config.resolver.fetch
    );
    let resolver = Resolver::new(table.clone(), order)
        .with_config(config.resolver)
        .with_cancellation(cancel);
    Ok(Session {
        table,
        resolver,
        target,
    })
}

/// Parse `path@version` arguments.
pub(crate) fn parse_modules(args: &[String]) -> Result<Vec<ModuleVersion>> {
    args.iter()
        .map(|arg| {
            ModuleVersion::parse(arg).ok_or_else(|| {
                MvsError::Generic {
                    message: format!("invalid module `{arg}`: expected path@version"),
                }
                .into()
            })
        })
        .collect()
}

/// Turn a resolver failure into a rendered diagnostic.
pub(crate) fn report(err: ResolveError) -> miette::Report {
    match err {
        ResolveError::Cancelled => MvsError::Cancelled.into(),
        other => miette::Report::new(other),
    }
}

pub(crate) fn print_list(list: &[ModuleVersion]) {
    for m in list {
        println!("{m}");
    }
}

/// Status lines for every path whose selection differs between `before`
/// and `after`.
pub(crate) fn print_changes(before: &[ModuleVersion], after: &[ModuleVersion]) -> usize {
    let mut paths: Vec<&str> = before.iter().chain(after).map(|m| m.path.as_str()).collect();
    paths.sort_unstable();
    paths.dedup();
    let version = |list: &[ModuleVersion], path: &str| -> Option<String> {
        list.iter().find(|m| m.path == path).map(|m| m.version.clone())
    };
    let mut changed = 0;
    for path in paths {
        let old = version(before, path);
        let new = version(after, path);
        if old != new {
            changed += 1;
            mvs_util::progress::status(
                "Updating",
                &mvs_util::progress::change_line(path, old.as_deref(), new.as_deref()),
            );
        }
    }
    changed
}
