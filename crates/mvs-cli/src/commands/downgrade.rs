//! Handler for `mvs downgrade`.

use miette::Result;

use super::{parse_modules, print_changes, print_list, report, Session};

pub async fn exec(session: &Session, modules: &[String]) -> Result<()> {
    let resolver = &session.resolver;
    let target = &session.target;
    let extras = parse_modules(modules)?;
    let before = resolver
        .build_list(std::slice::from_ref(target))
        .await
        .map_err(report)?;
    let after = resolver.downgrade(target, &extras).await.map_err(report)?;

    let changed = print_changes(&before, &after);
    mvs_util::progress::status("Downgraded", &format!("{changed} modules"));
    print_list(&after);
    Ok(())
}
