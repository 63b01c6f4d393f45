mod cache_stats;
mod render;

use async_graphql::MergedObject;
use cache_stats::CacheStatsQuery;
use render::RenderQuery;

#[derive(MergedObject, Default)]
pub struct Query(RenderQuery, CacheStatsQuery);
