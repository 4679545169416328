use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use veo_factory::api::GeminiClient;
use veo_factory::config::{AspectRatio, FactorySettings, GeminiConfig, STYLE_PRESETS};
use veo_factory::host::{DirectorySaver, StdoutClipboard};
use veo_factory::image::ImagePayload;
use veo_factory::row::InputSlot;
use veo_factory::Factory;

#[derive(Parser, Debug)]
#[command(name = "veo-factory")]
#[command(about = "Batch concept images and Veo video scripts for product lines", long_about = None)]
struct Args {
    /// Input images of one line: BACKGROUND,BOX,PRODUCT (repeat for up to 5 lines)
    #[arg(short, long = "line", value_name = "BG,BOX,PRODUCT")]
    lines: Vec<String>,

    /// Creative style label
    #[arg(short, long, default_value = STYLE_PRESETS[0])]
    style: String,

    /// Aspect ratio of generated images
    #[arg(short, long, default_value = "9:16")]
    aspect_ratio: AspectRatio,

    /// Directory for downloaded archives
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Print the prompt of a scene after rendering, as LINE:SCENE
    #[arg(long = "copy-prompt", value_name = "LINE:SCENE")]
    copy_prompts: Vec<String>,

    /// Gemini API key
    #[arg(long)]
    api_key: Option<String>,
}

fn parse_scene_ref(value: &str) -> anyhow::Result<(usize, usize)> {
    let (line, scene) = value
        .split_once(':')
        .with_context(|| format!("expected LINE:SCENE, got {}", value))?;
    Ok((line.trim().parse()?, scene.trim().parse()?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let settings = FactorySettings {
        style: args.style.clone(),
        aspect_ratio: args.aspect_ratio,
        ..FactorySettings::default()
    };

    if args.lines.is_empty() {
        bail!("At least one --line BG,BOX,PRODUCT must be provided");
    }
    if args.lines.len() > settings.row_count {
        bail!("At most {} lines are supported", settings.row_count);
    }

    let config = GeminiConfig::from_env(args.api_key.clone())?;
    let backend = GeminiClient::new(config).context("Failed to create HTTP client")?;
    let factory = Factory::new(
        settings,
        backend,
        DirectorySaver::new(&args.output_dir),
        StdoutClipboard,
    );

    // 1. 读取输入图片
    for (i, line) in args.lines.iter().enumerate() {
        let row_id = i + 1;
        let paths: Vec<&str> = line.split(',').map(str::trim).collect();
        if paths.len() != InputSlot::ALL.len() {
            bail!("Line {} needs exactly 3 images, got {}", row_id, paths.len());
        }
        for (slot, path) in InputSlot::ALL.into_iter().zip(paths) {
            let image = ImagePayload::from_path(Path::new(path))
                .await
                .with_context(|| format!("Failed to read {} image: {}", slot, path))?;
            factory.attach_input(row_id, slot, image).await?;
        }
    }

    // 2. 批量渲染
    info!("Running {} line(s)...", args.lines.len());
    let report = factory.run_batch().await?;
    for (row_id, outcome) in &report.outcomes {
        info!(row = row_id, outcome = ?outcome, "Line finished");
    }

    // 3. 下载压缩包
    for (row_id, _) in &report.outcomes {
        if factory.download_row(*row_id).await?.is_none() {
            warn!(row = row_id, "Line has no complete assets, nothing to download");
        }
    }
    if factory.download_all().await?.is_none() {
        error!("No line finished, nothing to bundle");
    }

    // 4. 复制提示词
    for value in &args.copy_prompts {
        let (row_id, scene) = parse_scene_ref(value)?;
        factory.copy_prompt(row_id, scene).await?;
    }

    info!(
        "Done: {} completed, {} failed",
        report.completed(),
        report.failed()
    );
    Ok(())
}
