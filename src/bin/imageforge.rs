//! CLI for ImageForge - prompt-to-image service and one-shot generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use imageforge::fallback::{generate_with_fallback, FallbackPolicy};
use imageforge::server::{router, AppState};
use imageforge::validate;
use imageforge::{
    AspectRatio, GeminiProvider, GenerationRequest, ImageFormat, ImageProvider, OpenAiProvider,
    QualityHint, Resolution,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:8496";

#[derive(Parser)]
#[command(name = "imageforge")]
#[command(about = "Generate images via Gemini with OpenAI fallback")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Generate a single image from the command line
    Generate(GenerateArgs),

    /// Check provider credentials and reachability
    Check,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address (default: IMAGEFORGE_ADDR or 127.0.0.1:8496)
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Aspect ratio
    #[arg(long, value_enum, default_value = "1:1")]
    aspect_ratio: AspectRatioArg,

    /// Output resolution
    #[arg(long, value_enum, default_value = "1K")]
    resolution: ResolutionArg,

    /// Speed/fidelity trade-off forwarded to the primary provider
    #[arg(long, value_enum)]
    quality_hint: Option<QualityHintArg>,

    /// Input image to edit (path to a png/jpg/webp file)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "3:2")]
    ThreeTwo,
    #[value(name = "2:3")]
    TwoThree,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "21:9")]
    Ultrawide,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::ThreeTwo => AspectRatio::ThreeTwo,
            AspectRatioArg::TwoThree => AspectRatio::TwoThree,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Ultrawide => AspectRatio::Ultrawide,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "1K")]
    OneK,
    #[value(name = "2K")]
    TwoK,
    #[value(name = "4K")]
    FourK,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::OneK => Resolution::OneK,
            ResolutionArg::TwoK => Resolution::TwoK,
            ResolutionArg::FourK => Resolution::FourK,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityHintArg {
    Low,
    High,
}

impl From<QualityHintArg> for QualityHint {
    fn from(arg: QualityHintArg) -> Self {
        match arg {
            QualityHintArg::Low => QualityHint::Low,
            QualityHintArg::High => QualityHint::High,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imageforge=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Check => check(cli.json).await?,
    }

    Ok(())
}

/// Builds the fallback provider when a non-empty credential is present.
fn build_secondary() -> imageforge::Result<Option<OpenAiProvider>> {
    let configured = std::env::var("OPENAI_API_KEY")
        .map(|key| !key.is_empty())
        .unwrap_or(false);
    if configured {
        Ok(Some(OpenAiProvider::builder().build()?))
    } else {
        Ok(None)
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let primary = GeminiProvider::builder().build()?;
    let secondary = build_secondary()?;
    if secondary.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, fallback disabled");
    }

    let addr = args
        .addr
        .or_else(|| {
            std::env::var("IMAGEFORGE_ADDR")
                .ok()
                .filter(|a| !a.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let fallback = if secondary.is_some() {
        "enabled"
    } else {
        "disabled"
    };
    let state = Arc::new(AppState {
        primary,
        secondary,
        policy: FallbackPolicy::default(),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, fallback, "imageforge listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    validate::check_prompt(&args.prompt)?;

    let mut request = GenerationRequest::new(&args.prompt)
        .with_aspect_ratio(args.aspect_ratio.into())
        .with_resolution(args.resolution.into());

    if let Some(hint) = args.quality_hint {
        request = request.with_quality_hint(hint.into());
    }

    if let Some(ref input_path) = args.input {
        let data = std::fs::read(input_path)?;
        validate::check_reference_size(data.len())?;
        let format = input_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .ok_or_else(|| {
                anyhow::anyhow!("unsupported input image format (use png, jpg or webp)")
            })?;
        request = request.with_reference_image(data, format);
    }

    let primary = GeminiProvider::builder().build()?;
    let secondary = build_secondary()?;
    let policy = FallbackPolicy::default();

    let image = generate_with_fallback(&primary, secondary.as_ref(), &policy, &request).await?;

    image.save(&args.output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": args.output.display().to_string(),
            "size_bytes": image.size(),
            "format": image.format.extension(),
            "provider": image.provider.to_string(),
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
            "text_note": image.text_note,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated image: {} ({} bytes) via {}",
            args.output.display(),
            image.size(),
            image.provider
        );
        if let Some(ref note) = image.text_note {
            println!("Note: {}", note);
        }
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

async fn check(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderStatus {
        name: &'static str,
        kind: &'static str,
        env_var: &'static str,
        configured: bool,
        healthy: bool,
        detail: Option<String>,
    }

    let mut statuses = Vec::new();

    match GeminiProvider::builder().build() {
        Ok(provider) => {
            let (healthy, detail) = match provider.health_check().await {
                Ok(()) => (true, None),
                Err(err) => (false, Some(err.to_string())),
            };
            statuses.push(ProviderStatus {
                name: "Gemini (Google)",
                kind: "gemini",
                env_var: "GEMINI_API_KEY",
                configured: true,
                healthy,
                detail,
            });
        }
        Err(err) => statuses.push(ProviderStatus {
            name: "Gemini (Google)",
            kind: "gemini",
            env_var: "GEMINI_API_KEY",
            configured: false,
            healthy: false,
            detail: Some(err.to_string()),
        }),
    }

    match OpenAiProvider::builder().build() {
        Ok(provider) => {
            let (healthy, detail) = match provider.health_check().await {
                Ok(()) => (true, None),
                Err(err) => (false, Some(err.to_string())),
            };
            statuses.push(ProviderStatus {
                name: "OpenAI (gpt-image)",
                kind: "openai",
                env_var: "OPENAI_API_KEY",
                configured: true,
                healthy,
                detail,
            });
        }
        Err(err) => statuses.push(ProviderStatus {
            name: "OpenAI (gpt-image)",
            kind: "openai",
            env_var: "OPENAI_API_KEY",
            configured: false,
            healthy: false,
            detail: Some(err.to_string()),
        }),
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        println!("Provider status:\n");
        for status in &statuses {
            let glyph = if status.healthy { "✓" } else { "✗" };
            println!("  {} {} ({})", glyph, status.name, status.kind);
            println!("    API key: {}", status.env_var);
            if let Some(ref detail) = status.detail {
                println!("    {}", detail);
            }
        }
    }

    Ok(())
}
