//! Handler for `mvs upgrade`.

use miette::Result;
use mvs_util::errors::MvsError;

use super::{parse_modules, print_changes, print_list, report, Session};

pub async fn exec(session: &Session, all: bool, modules: &[String]) -> Result<()> {
    let resolver = &session.resolver;
    let target = &session.target;
    let before = resolver
        .build_list(std::slice::from_ref(target))
        .await
        .map_err(report)?;

    let after = if all {
        resolver.upgrade_all(target).await.map_err(report)?
    } else {
        let extras = parse_modules(modules)?;
        if extras.is_empty() {
            return Err(MvsError::Generic {
                message: "nothing to upgrade: pass --all or at least one module@version"
                    .to_string(),
            }
            .into());
        }
        resolver.upgrade(target, &extras).await.map_err(report)?
    };

    let changed = print_changes(&before, &after);
    mvs_util::progress::status("Upgraded", &format!("{changed} modules"));
    print_list(&after);
    Ok(())
}
