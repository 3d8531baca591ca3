//! Handler for `mvs edit`.
//!
//! The target is the main module and its declared requirements are the
//! roots. The edited roots are printed as a lock summary.

use miette::Result;
use mvs_core::Pruning;
use mvs_resolver::Requirements;
use mvs_util::errors::MvsError;

use super::{parse_modules, print_changes, report, Session};

pub async fn exec(session: &Session, add: &[String], pin: &[String]) -> Result<()> {
    let add = parse_modules(add)?;
    let pins = parse_modules(pin)?;
    let target = &session.target;
    let roots: Vec<_> = session
        .table
        .modules()
        .find(|(m, _)| *m == target)
        .map(|(_, reqs)| reqs.iter().filter(|m| m.path != target.path).cloned().collect())
        .unwrap_or_default();
    let direct: Vec<String> = roots.iter().map(|m| m.path.clone()).collect();
    let pruning = match session.resolver.config().pruning {
        Pruning::Workspace => Pruning::Pruned,
        other => other,
    };
    let rs = Requirements::new(
        pruning,
        session.resolver.order().clone(),
        vec![target.clone()],
        roots,
        direct,
    );

    let outcome = rs.edit(&session.resolver, &add, &pins).await.map_err(report)?;
    if outcome.changed {
        let before = rs.build_list(&session.resolver).await.map_err(report)?;
        let after = outcome
            .requirements
            .build_list(&session.resolver)
            .await
            .map_err(report)?;
        print_changes(&before, &after);
    } else {
        mvs_util::progress::status_info("Unchanged", "build list");
    }

    let summary = outcome
        .requirements
        .lock_summary()
        .to_toml()
        .map_err(|e| MvsError::Generic {
            message: format!("Failed to render lock summary: {e}"),
        })?;
    print!("{summary}");
    Ok(())
}
