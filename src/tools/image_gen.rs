//! Image generation and terminal rendering.

use super::{SideEffect, ToolOutput};
use crate::error::{ChatlineError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize,
};
use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fmt::Write;
use tracing::{debug, instrument};

/// Generates images through the OpenAI images API.
pub struct ImageGenerator {
    client: async_openai::Client<OpenAIConfig>,
    http: reqwest::Client,
    model: String,
    size: String,
}

impl ImageGenerator {
    pub fn new(
        client: async_openai::Client<OpenAIConfig>,
        http: reqwest::Client,
        model: &str,
        size: &str,
    ) -> Self {
        Self {
            client,
            http,
            model: model.to_string(),
            size: size.to_string(),
        }
    }

    /// Generate one image. The image itself travels as a side effect, never to the model.
    #[instrument(skip(self))]
    pub async fn generate(&self, description: &str) -> ToolOutput {
        match self.request(description).await {
            Ok(image) => {
                debug!("Generated {}x{} image", image.width(), image.height());
                ToolOutput {
                    content: "Image generated and shown to the user.".to_string(),
                    effect: Some(SideEffect::ShowImage {
                        image,
                        description: description.to_string(),
                    }),
                }
            }
            Err(e) => ToolOutput::text(format!("Image generation failed: {}", e)),
        }
    }

    async fn request(&self, description: &str) -> Result<DynamicImage> {
        let request = CreateImageRequestArgs::default()
            .prompt(description)
            .model(parse_model(&self.model))
            .n(1)
            .size(parse_size(&self.size)?)
            .response_format(ImageResponseFormat::B64Json)
            .build()
            .map_err(|e| ChatlineError::Image(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .images()
            .create(request)
            .await
            .map_err(|e| ChatlineError::OpenAI(format!("Image API error: {}", e)))?;

        let image = response
            .data
            .first()
            .ok_or_else(|| ChatlineError::Image("Empty image response".to_string()))?;

        let bytes = match image.as_ref() {
            Image::B64Json { b64_json, .. } => base64::engine::general_purpose::STANDARD
                .decode(b64_json.as_bytes())
                .map_err(|e| ChatlineError::Image(format!("Invalid image payload: {}", e)))?,
            Image::Url { url, .. } => self.http.get(url).send().await?.bytes().await?.to_vec(),
        };

        image::load_from_memory(&bytes)
            .map_err(|e| ChatlineError::Image(format!("Failed to decode image: {}", e)))
    }
}

fn parse_model(model: &str) -> ImageModel {
    match model {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        other => ImageModel::Other(other.to_string()),
    }
}

fn parse_size(size: &str) -> Result<ImageSize> {
    match size {
        "256x256" => Ok(ImageSize::S256x256),
        "512x512" => Ok(ImageSize::S512x512),
        "1024x1024" => Ok(ImageSize::S1024x1024),
        "1792x1024" => Ok(ImageSize::S1792x1024),
        "1024x1792" => Ok(ImageSize::S1024x1792),
        other => Err(ChatlineError::Config(format!("Unsupported image size: {}", other))),
    }
}

/// Render an image as truecolor half-block characters, at most `max_width` columns wide.
///
/// Each character cell holds two vertically stacked pixels: the upper one as foreground,
/// the lower one as background.
pub fn render_half_blocks(image: &DynamicImage, max_width: u32) -> String {
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 || max_width == 0 {
        return String::new();
    }

    let width = src_width.min(max_width);
    let height = ((src_height as u64 * width as u64) / src_width as u64).max(1) as u32;
    let pixels = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgba8();

    let mut out = String::new();
    for y in (0..height).step_by(2) {
        for x in 0..width {
            let top = pixels.get_pixel(x, y);
            let _ = write!(out, "\x1b[38;2;{};{};{}m", top[0], top[1], top[2]);
            if y + 1 < height {
                let bottom = pixels.get_pixel(x, y + 1);
                let _ = write!(out, "\x1b[48;2;{};{};{}m", bottom[0], bottom[1], bottom[2]);
            } else {
                out.push_str("\x1b[49m");
            }
            out.push('▀');
        }
        out.push_str("\x1b[0m\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai;
    use httptest::{
        matchers::{all_of, contains, request},
        responders::*,
        Expectation, Server,
    };
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    /// PNG bytes of a 2x2 green square.
    fn green_png() -> Vec<u8> {
        let mut png = Vec::new();
        solid(2, 2, [0, 255, 0, 255])
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    fn generator(server: &Server) -> ImageGenerator {
        let client = openai::create_client(&server.url_str("/v1"), "test-key").unwrap();
        ImageGenerator::new(client, reqwest::Client::new(), "dall-e-3", "1024x1024")
    }

    #[tokio::test]
    async fn test_generate_decodes_base64_payload() {
        let server = Server::run();
        let b64 = base64::engine::general_purpose::STANDARD.encode(green_png());
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/images/generations"),
                request::headers(contains(("authorization", "Bearer test-key"))),
            ])
            .respond_with(json_encoded(serde_json::json!({
                "created": 1,
                "data": [{"b64_json": b64}],
            }))),
        );

        let output = generator(&server).generate("a green square").await;
        assert_eq!(output.content, "Image generated and shown to the user.");
        match output.effect {
            Some(SideEffect::ShowImage { image, description }) => {
                assert_eq!(image.dimensions(), (2, 2));
                assert_eq!(description, "a green square");
            }
            None => panic!("Expected an image"),
        }
    }

    #[tokio::test]
    async fn test_generate_fetches_url_payload() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/images/generations"))
                .respond_with(json_encoded(serde_json::json!({
                    "created": 1,
                    "data": [{"url": server.url_str("/files/square.png")}],
                }))),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/files/square.png"))
                .respond_with(status_code(200).body(green_png())),
        );

        let output = generator(&server).generate("a green square").await;
        assert!(matches!(output.effect, Some(SideEffect::ShowImage { .. })));
    }

    #[tokio::test]
    async fn test_generate_failure_is_text_without_effect() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/images/generations"))
                .respond_with(json_encoded(serde_json::json!({"created": 1, "data": []}))),
        );

        let output = generator(&server).generate("nothing").await;
        assert!(output.content.starts_with("Image generation failed:"));
        assert!(output.effect.is_none());
    }

    #[test]
    fn test_render_dimensions() {
        let rendered = render_half_blocks(&solid(4, 4, [255, 0, 0, 255]), 80);
        assert_eq!(rendered.lines().count(), 2);
        // 4 columns, 2 text rows
        assert_eq!(rendered.matches('▀').count(), 8);
        assert!(rendered.contains("\x1b[38;2;255;0;0m"));
    }

    #[test]
    fn test_render_scales_to_max_width() {
        let rendered = render_half_blocks(&solid(100, 50, [0, 0, 255, 255]), 10);
        // 10 columns, 5 pixel rows, 3 text rows
        assert_eq!(rendered.lines().count(), 3);
        assert_eq!(rendered.matches('▀').count(), 30);
        assert!(rendered.lines().last().unwrap().contains("\x1b[49m"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render_half_blocks(&solid(4, 4, [0, 0, 0, 255]), 0).is_empty());
    }

    #[test]
    fn test_parse_size() {
        assert!(matches!(parse_size("1024x1024"), Ok(ImageSize::S1024x1024)));
        assert!(parse_size("3x3").is_err());
        assert!(matches!(parse_model("gpt-image-1"), ImageModel::Other(_)));
    }
}
