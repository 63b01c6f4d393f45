mod mutation;
mod query;

use crate::models::context::ContextPointer;
use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};
use mutation::Mutation;
use query::Query;

pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn build_schema(context: ContextPointer) -> AppSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(context)
        .finish()
}

pub fn get_context<'ctx>(context: &Context<'ctx>) -> &'ctx ContextPointer {
    context.data_unchecked::<ContextPointer>()
}

/// GraphQL error carrying the error kind as `extensions.code`.
pub fn to_graphql_error(err: alignment_render_client::Error) -> async_graphql::Error {
    let code = err.kind();
    async_graphql::Error::new(err.to_string()).extend_with(|_, extensions| {
        extensions.set("code", code.as_ref());
    })
}
