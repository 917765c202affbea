use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_openai::types::{CreateImageRequestArgs, ImageModel, ImageResponseFormat, ImageSize};
use log::info;
use tokio::time::{timeout, Duration};

use crate::ai_client::OpenAiClient;

pub const MAX_IMAGES: u8 = 4;

pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub count: u8,
    pub out_dir: &'a Path,
}

pub fn image_model(name: &str) -> ImageModel {
    match name {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        other => ImageModel::Other(other.to_string()),
    }
}

/// Generate images for `request.prompt` and save them under `request.out_dir`.
pub async fn generate_images(
    client: &OpenAiClient,
    model: &str,
    timeout_secs: u64,
    request: &ImageRequest<'_>,
) -> Result<Vec<PathBuf>> {
    if request.prompt.trim().is_empty() {
        return Err(anyhow!("Describe the image to generate"));
    }
    if !(1..=MAX_IMAGES).contains(&request.count) {
        return Err(anyhow!(
            "Number of images must be between 1 and {}, got {}",
            MAX_IMAGES,
            request.count
        ));
    }

    let image_request = CreateImageRequestArgs::default()
        .prompt(request.prompt.trim())
        .model(image_model(model))
        .n(request.count)
        .size(ImageSize::S1024x1024)
        .response_format(ImageResponseFormat::B64Json)
        .build()
        .context("Failed to build image request")?;

    let response = timeout(
        Duration::from_secs(timeout_secs),
        client.images().create(image_request),
    )
    .await
    .map_err(|_| anyhow!("Image generation timed out after {} seconds", timeout_secs))?
    .context("Image generation failed")?;

    tokio::fs::create_dir_all(request.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", request.out_dir.display()))?;

    let paths = response
        .save(request.out_dir)
        .await
        .context("Failed to save generated images")?;
    info!("Saved {} images to {}", paths.len(), request.out_dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_map_to_variants() {
        assert!(matches!(image_model("dall-e-3"), ImageModel::DallE3));
        assert!(matches!(image_model("dall-e-2"), ImageModel::DallE2));
        assert!(matches!(image_model("gpt-image-1"), ImageModel::Other(name) if name == "gpt-image-1"));
    }

    #[tokio::test]
    async fn rejects_bad_requests_before_calling_out() {
        let client = OpenAiClient::new();
        let dir = std::env::temp_dir();

        let empty = ImageRequest {
            prompt: "  ",
            count: 1,
            out_dir: &dir,
        };
        assert!(generate_images(&client, "dall-e-3", 5, &empty).await.is_err());

        let too_many = ImageRequest {
            prompt: "a red coat on a runway",
            count: MAX_IMAGES + 1,
            out_dir: &dir,
        };
        let err = generate_images(&client, "dall-e-3", 5, &too_many).await.unwrap_err();
        assert!(err.to_string().contains("between 1 and 4"));
    }
}
