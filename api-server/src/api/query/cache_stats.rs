use super::super::get_context;
use alignment_render_client::{CacheStats, RenderStats};
use async_graphql::{Context, Object, SimpleObject};
use serde::Serialize;

#[derive(Default)]
pub struct CacheStatsQuery;

#[derive(SimpleObject, Serialize)]
pub struct CacheStatsResponse {
    pub cache_stats: Option<CacheStats>,
    pub cache_backend: String,
}

#[Object]
impl CacheStatsQuery {
    /// Get current cache statistics
    async fn cache_stats<'ctx>(&self, context: &Context<'ctx>) -> CacheStatsResponse {
        let ctx = get_context(context);

        CacheStatsResponse {
            cache_stats: ctx.render_client().cache_stats(),
            cache_backend: ctx.config().cache().backend().to_string(),
        }
    }

    /// Hit/miss counters and in-flight renders
    async fn render_stats<'ctx>(&self, context: &Context<'ctx>) -> RenderStats {
        get_context(context).render_client().stats()
    }
}
