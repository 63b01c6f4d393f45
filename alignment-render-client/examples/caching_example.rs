use alignment_render_client::{
    CacheConfig, ClientConfig, DispatcherConfig, PollResult, RenderClient, RenderRequest,
    Submission,
};
use chrono::Duration;

const ALIGNMENT: &str = ">seq1\nACGT-ACGT\n>seq2\nACGTTACGT\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let renderer_url =
        std::env::var("RENDERER_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());

    let config = ClientConfig {
        cache: CacheConfig::new(Duration::minutes(60), 500),
        dispatcher: DispatcherConfig {
            base_url: renderer_url,
            ..Default::default()
        },
    };
    let client = RenderClient::new(&config)?;
    let request = RenderRequest::parse(ALIGNMENT, "fasta", "dna")?;

    // First submit starts the render in the background
    let fingerprint = match client.submit(&request).await? {
        Submission::ServedFromCache { fingerprint, .. } => fingerprint,
        Submission::Pending(fingerprint) => {
            println!("Render pending for {}", fingerprint);
            fingerprint
        }
    };

    // A duplicate submit does not start a second render
    println!("Duplicate submit: {:?}", client.submit(&request).await?.fingerprint());

    if let Some(completion) = client.completion(&fingerprint) {
        println!("Render finished: {:?}", completion.wait().await);
    }

    match client.poll(&fingerprint).await? {
        PollResult::Cached(image) => {
            let png = image.decode()?;
            println!("Cached image: {} bytes of PNG", png.len());
        }
        other => println!("No image: {:?}", other),
    }

    println!("Stats: {:?}", client.stats());

    Ok(())
}
