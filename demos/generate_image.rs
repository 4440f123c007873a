//! Basic image generation example.
//!
//! Run with: `cargo run --example generate_image`
//!
//! Uses the free Pollinations endpoint. Set `POLLINATIONS_API_KEY` to go
//! through the paid one.

use pollinate::present::resolve_bytes;
use pollinate::{Dispatcher, GenerationRequest, ImageFormat, ImageSize, SessionContext};

#[tokio::main]
async fn main() -> pollinate::Result<()> {
    let dispatcher = Dispatcher::default();
    let key = std::env::var("POLLINATIONS_API_KEY").ok();
    let mut session = SessionContext::new(Default::default(), key);

    let request = GenerationRequest::new("A golden retriever puppy playing in snow")?
        .with_size(ImageSize::new(512, 512)?)
        .with_seed(42);
    let result = dispatcher.dispatch(&mut session, &request).await?.clone();

    let data = resolve_bytes(&result.image_ref, session.objects(), dispatcher.client()).await?;
    let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();
    let filename = format!("output.{}", format.extension());
    std::fs::write(&filename, &data)?;

    println!(
        "Generated image: {} ({} bytes) via {}, {}",
        filename,
        data.len(),
        result.provider_label,
        result.model_label
    );

    Ok(())
}
