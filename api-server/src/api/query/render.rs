use super::super::{get_context, to_graphql_error};
use alignment_render_client::{Error, Fingerprint, FingerprintState, PollResult};
use async_graphql::{Context, Enum, Object, Result, SimpleObject};

#[derive(Default)]
pub struct RenderQuery;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum PollStatus {
    Cached,
    Pending,
    NotFound,
}

#[derive(SimpleObject)]
pub struct RenderPollResponse {
    pub image_key: String,
    pub status: PollStatus,
    /// Base64 encoded PNG, present once cached
    pub image: Option<String>,
}

fn parse_key(image_key: &str) -> Result<Fingerprint> {
    image_key
        .parse::<Fingerprint>()
        .map_err(|err| to_graphql_error(Error::from(err)))
}

#[Object]
impl RenderQuery {
    /// Poll for the image of a previously submitted alignment
    async fn render<'ctx>(
        &self,
        context: &Context<'ctx>,
        image_key: String,
    ) -> Result<RenderPollResponse> {
        let fingerprint = parse_key(&image_key)?;
        let result = get_context(context)
            .render_client()
            .poll(&fingerprint)
            .await
            .map_err(to_graphql_error)?;

        let (status, image) = match result {
            PollResult::Cached(image) => (PollStatus::Cached, Some(image.into_inner())),
            PollResult::Pending => (PollStatus::Pending, None),
            PollResult::NotFound => (PollStatus::NotFound, None),
        };

        Ok(RenderPollResponse {
            image_key: fingerprint.to_string(),
            status,
            image,
        })
    }

    async fn render_status<'ctx>(
        &self,
        context: &Context<'ctx>,
        image_key: String,
    ) -> Result<FingerprintState> {
        let fingerprint = parse_key(&image_key)?;
        get_context(context)
            .render_client()
            .status(&fingerprint)
            .await
            .map_err(to_graphql_error)
    }
}
