//! Handler for `mvs list`.

use miette::Result;

use super::{print_list, report, Session};

pub async fn exec(session: &Session) -> Result<()> {
    let list = session
        .resolver
        .build_list(std::slice::from_ref(&session.target))
        .await
        .map_err(report)?;
    mvs_util::progress::status("Resolved", &format!("{} modules", list.len()));
    print_list(&list);
    Ok(())
}
