//! Handler for `mvs why`.

use miette::Result;
use mvs_core::ModuleVersion;
use mvs_util::errors::MvsError;

use super::{report, Session};

pub async fn exec(session: &Session, path: &str) -> Result<()> {
    let request = session.resolver.request(vec![session.target.clone()]);
    let resolution = session.resolver.resolve(request).await.map_err(report)?;
    let graph = &resolution.graph;
    let selected = graph.selected(path).to_string();
    if selected == mvs_core::NONE {
        return Err(MvsError::Resolution {
            message: format!("{path} is not in the build list of {}", session.target),
        }
        .into());
    }

    let chain = graph
        .find_path(|m| m.path == path && m.version == selected)
        .unwrap_or_default();
    for (depth, m) in chain.iter().enumerate() {
        println!("{:indent$}{m}", "", indent = depth * 2);
    }

    // Other modules that would keep the path selected at this version.
    let via = chain.len().checked_sub(2).and_then(|i| chain.get(i));
    let others: Vec<String> = graph
        .required_by_reverse(&ModuleVersion::new(path, selected))
        .into_iter()
        .filter(|m| Some(m) != via)
        .map(|m| m.to_string())
        .collect();
    if !others.is_empty() {
        println!("also required by {}", others.join(", "));
    }
    Ok(())
}
