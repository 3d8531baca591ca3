//! Handler for `mvs minimize`.

use miette::Result;

use super::{print_list, report, Session};

pub async fn exec(session: &Session, base: &[String]) -> Result<()> {
    let min = session
        .resolver
        .req(&session.target, base)
        .await
        .map_err(report)?;
    let declared = session
        .table
        .modules()
        .find(|(m, _)| **m == session.target)
        .map(|(_, reqs)| reqs.len())
        .unwrap_or(0);
    mvs_util::progress::status_info(
        "Minimized",
        &format!("{declared} requirements of {} to {}", session.target, min.len()),
    );
    print_list(&min);
    Ok(())
}
