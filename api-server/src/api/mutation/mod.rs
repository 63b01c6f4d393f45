mod submit_render;

use async_graphql::MergedObject;
use submit_render::SubmitRenderMutation;

#[derive(MergedObject, Default)]
pub struct Mutation(SubmitRenderMutation);
