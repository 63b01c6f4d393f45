use super::super::{get_context, to_graphql_error};
use alignment_render_client::{Error, RenderOptions, RenderRequest, Submission};
use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use log::info;

#[derive(InputObject)]
pub struct RenderInput {
    pub alignment: String,
    pub alignment_format: String,
    /// nucleotide (dna, rna) or protein (aa)
    pub alignment_type: String,
    pub options: Option<RenderOptions>,
    pub source_name: Option<String>,
}

impl TryFrom<RenderInput> for RenderRequest {
    type Error = Error;

    fn try_from(input: RenderInput) -> std::result::Result<Self, Self::Error> {
        let mut request =
            RenderRequest::parse(&input.alignment, &input.alignment_format, &input.alignment_type)?
                .with_options(input.options.unwrap_or_default());
        if let Some(source_name) = input.source_name {
            request = request.with_source_name(source_name);
        }
        Ok(request)
    }
}

#[derive(SimpleObject)]
pub struct SubmitRenderResponse {
    pub ok: bool,
    pub image_key: String,
    /// True while the image is being rendered; poll `render` with the key
    pub pending: bool,
    pub image: Option<String>,
}

#[derive(Default)]
pub struct SubmitRenderMutation;

#[Object]
impl SubmitRenderMutation {
    /// Submit an alignment for rendering
    async fn submit_render<'ctx>(
        &self,
        context: &Context<'ctx>,
        input: RenderInput,
    ) -> Result<SubmitRenderResponse> {
        let request = RenderRequest::try_from(input).map_err(to_graphql_error)?;
        if let Some(source_name) = request.source_name() {
            info!("Alignment submitted from {}", source_name);
        }

        let submission = get_context(context)
            .render_client()
            .submit(&request)
            .await
            .map_err(to_graphql_error)?;

        Ok(match submission {
            Submission::ServedFromCache { fingerprint, image } => SubmitRenderResponse {
                ok: true,
                image_key: fingerprint.to_string(),
                pending: false,
                image: Some(image.into_inner()),
            },
            Submission::Pending(fingerprint) => SubmitRenderResponse {
                ok: true,
                image_key: fingerprint.to_string(),
                pending: true,
                image: None,
            },
        })
    }

    /// Clear the cache (useful for debugging/admin)
    async fn clear_cache<'ctx>(&self, context: &Context<'ctx>) -> Result<usize> {
        get_context(context)
            .render_client()
            .clear_cache()
            .await
            .map_err(to_graphql_error)
    }
}
