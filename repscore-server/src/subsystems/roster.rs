//! Roster listing: active legislators with whatever score was last published.

use repscore_core::{CatalogStore, LegislatorFilter, LegislatorSummary, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegislatorPage {
    pub page: u32,
    pub limit: u32,
    pub legislators: Vec<LegislatorSummary>,
}

/// One page of the roster. Legislators never refreshed carry a null score.
pub async fn list_legislators<S>(store: &S, filter: &LegislatorFilter) -> Result<LegislatorPage>
where
    S: CatalogStore + ?Sized,
{
    filter.validate()?;
    let legislators = store.list_legislators(filter).await?;

    tracing::debug!(
        page = filter.page,
        limit = filter.limit,
        returned = legislators.len(),
        "Listed legislators"
    );

    Ok(LegislatorPage {
        page: filter.page,
        limit: filter.limit,
        legislators,
    })
}
