use crate::api::AppSchema;
use crate::models::context::ContextPointer;
use alignment_render_client::{ErrorKind, Fingerprint, PollResult};
use async_graphql::http::GraphiQLSource;
use async_graphql_rocket::{GraphQLRequest, GraphQLResponse};
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::{get, post, routes, Responder, Route, State};

#[derive(Responder, Debug)]
pub enum ImageResponse {
    #[response(status = 200, content_type = "image/png")]
    Png(Vec<u8>),
    #[response(status = 202)]
    Pending(&'static str),
}

#[get("/graphql")]
fn graphiql() -> RawHtml<String> {
    RawHtml(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[post("/graphql", data = "<request>", format = "application/json")]
async fn graphql_request(schema: &State<AppSchema>, request: GraphQLRequest) -> GraphQLResponse {
    request.execute(schema.inner()).await
}

/// Decoded PNG for an image key handed out by `submitRender`.
#[get("/image/<key>")]
async fn image(key: &str, context: &State<ContextPointer>) -> Result<ImageResponse, Status> {
    let fingerprint = key.parse::<Fingerprint>().map_err(|err| {
        log::debug!("Rejected image key: {}", err);
        Status::BadRequest
    })?;

    let result = context
        .render_client()
        .poll(&fingerprint)
        .await
        .map_err(|err| {
            log::error!("Error getting image {}: {}", fingerprint, err);
            match err.kind() {
                ErrorKind::InvalidRequest => Status::BadRequest,
                ErrorKind::CacheUnavailable => Status::ServiceUnavailable,
                ErrorKind::UpstreamFailure => Status::BadGateway,
                ErrorKind::InvalidConfig => Status::InternalServerError,
            }
        })?;

    match result {
        PollResult::Cached(image) => image.decode().map(ImageResponse::Png).map_err(|err| {
            log::error!("Cached image {} is not valid base64: {}", fingerprint, err);
            Status::BadGateway
        }),
        PollResult::Pending => Ok(ImageResponse::Pending("pending")),
        PollResult::NotFound => Err(Status::NotFound),
    }
}

pub fn routes() -> Vec<Route> {
    routes![graphiql, graphql_request, image]
}

#[cfg(test)]
mod tests {
    use crate::api::build_schema;
    use crate::models::config::Config;
    use crate::models::context::{Context, ContextPointer};
    use alignment_render_client::cache::MemoryCache;
    use alignment_render_client::{
        CacheConfig, ClientConfig, RenderClient, RenderDispatcher, RenderRequest, RenderedImage,
        UpstreamError,
    };
    use async_trait::async_trait;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{json, Value};
    use std::sync::Arc;

    // "\x89PNG\r\n\x1a\n"
    const PNG_B64: &str = "iVBORw0KGgo=";

    struct FixedDispatcher;

    #[async_trait]
    impl RenderDispatcher for FixedDispatcher {
        async fn render(&self, _request: &RenderRequest) -> Result<RenderedImage, UpstreamError> {
            Ok(RenderedImage::new(PNG_B64))
        }
    }

    async fn client() -> (Client, ContextPointer) {
        let client_config = ClientConfig::default();
        let render_client = RenderClient::with_parts(
            &client_config,
            Arc::new(MemoryCache::new(CacheConfig::default())),
            Arc::new(FixedDispatcher),
        );
        let context = Arc::new(Context::from_parts(render_client, Config::default()));
        let rocket = rocket::build()
            .manage(Arc::clone(&context))
            .manage(build_schema(Arc::clone(&context)))
            .mount("/", super::routes());
        (Client::tracked(rocket).await.unwrap(), context)
    }

    async fn graphql(client: &Client, query: &str, variables: Value) -> Value {
        let response = client
            .post("/graphql")
            .header(ContentType::JSON)
            .body(json!({ "query": query, "variables": variables }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json::<Value>().await.unwrap()
    }

    const SUBMIT: &str = "mutation Submit($input: RenderInput!) {
        submitRender(input: $input) { ok imageKey pending image }
    }";

    #[rocket::async_test]
    async fn test_submit_then_fetch_image() {
        let (client, context) = client().await;
        let input = json!({ "input": {
            "alignment": ">s1\nACGT\n",
            "alignmentFormat": "fasta",
            "alignmentType": "dna",
        }});

        let body = graphql(&client, SUBMIT, input.clone()).await;
        let submitted = &body["data"]["submitRender"];
        assert_eq!(submitted["ok"], true);
        assert_eq!(submitted["pending"], true);
        let key = submitted["imageKey"].as_str().unwrap().to_string();

        let fingerprint = key.parse().unwrap();
        if let Some(completion) = context.render_client().completion(&fingerprint) {
            completion.wait().await;
        }

        let response = client.get(format!("/image/{}", key)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::PNG));
        assert_eq!(response.into_bytes().await.unwrap(), b"\x89PNG\r\n\x1a\n");

        // Same alignment again comes straight from the cache.
        let body = graphql(&client, SUBMIT, input).await;
        assert_eq!(body["data"]["submitRender"]["pending"], false);
        assert_eq!(body["data"]["submitRender"]["image"], PNG_B64);
        assert_eq!(body["data"]["submitRender"]["imageKey"], key.as_str());

        let body = graphql(
            &client,
            "query Poll($key: String!) { render(imageKey: $key) { status image } renderStatus(imageKey: $key) }",
            json!({ "key": key }),
        )
        .await;
        assert_eq!(body["data"]["render"]["status"], "CACHED");
        assert_eq!(body["data"]["renderStatus"], "CACHED");
    }

    #[rocket::async_test]
    async fn test_invalid_submit_reports_code() {
        let (client, _) = client().await;
        let body = graphql(
            &client,
            SUBMIT,
            json!({ "input": { "alignment": "  ", "alignmentFormat": "fasta", "alignmentType": "dna" }}),
        )
        .await;

        assert_eq!(body["errors"][0]["extensions"]["code"], "INVALID_REQUEST");
    }

    #[rocket::async_test]
    async fn test_image_status_codes() {
        let (client, _) = client().await;

        let response = client.get("/image/not-a-key").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        let unknown = "0".repeat(64);
        let response = client.get(format!("/image/{}", unknown)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_stats_queries() {
        let (client, _) = client().await;
        let body = graphql(
            &client,
            "{ cacheStats { cacheBackend cacheStats { totalEntries maxEntries } } renderStats { cacheHits inFlight { pendingRequests } } }",
            json!({}),
        )
        .await;

        assert_eq!(body["data"]["cacheStats"]["cacheBackend"], "memory");
        assert_eq!(body["data"]["cacheStats"]["cacheStats"]["maxEntries"], 1000);
        assert_eq!(body["data"]["renderStats"]["cacheHits"], 0);
        assert_eq!(body["data"]["renderStats"]["inFlight"]["pendingRequests"], 0);
    }
}
