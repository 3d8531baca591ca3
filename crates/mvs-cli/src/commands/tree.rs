//! Handler for `mvs tree`.

use miette::Result;

use super::{report, Session};

pub async fn exec(session: &Session, depth: Option<usize>) -> Result<()> {
    let request = session.resolver.request(vec![session.target.clone()]);
    let resolution = session.resolver.resolve(request).await.map_err(report)?;
    if let Some(err) = &resolution.error {
        mvs_util::progress::status_warn("Warning", &err.to_string());
    }
    print!("{}", resolution.graph.print_tree(depth));
    Ok(())
}
