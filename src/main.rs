use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use consult_scale::presets::UploadPreset;
use implant_consult::backend::{AuthService, SessionStore, SignupOutcome, SupabaseClient};
use implant_consult::catalog::{CatalogItem, CatalogKind, CatalogService};
use implant_consult::model::{
    AnalysisResult, CameraAngle, DesiredLook, OptionId, PatientMetrics, RenderStyle,
};
use implant_consult::processing::ImagePreprocessor;
use implant_consult::{ConsultConfig, ConsultError, ConsultationSession, GeminiClient};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Implant consultation from the command line:
/// - analyze: metrics + photo → two volume options, optional simulations
/// - catalog / login / signup / logout / whoami: the admin surface
#[derive(Parser, Debug)]
#[command(name = "consult")]
#[command(about = "Breast-implant consultation: AI sizing, simulations and catalog admin")]
#[command(long_about = "Submit body metrics and a photo to get two implant volume suggestions,
render after-simulations per option, style and camera angle, and manage the product/clinic/doctor catalog.
Configuration comes from CONSULT_* environment variables or a .env file.")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a photo and suggest two implant volumes
    Analyze(AnalyzeArgs),
    /// Inspect or edit the catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// Sign in as admin and save the session
    Login(Credentials),
    /// Create an admin account
    Signup(Credentials),
    /// Revoke and delete the saved admin session
    Logout,
    /// Show the saved admin session
    Whoami,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Photo of the chest area (JPEG, PNG, WebP, GIF or BMP, max 5 MB)
    #[arg(short, long)]
    photo: PathBuf,

    /// Height in cm
    #[arg(long)]
    height: f64,

    /// Weight in kg
    #[arg(long)]
    weight: f64,

    #[arg(long)]
    age: u32,

    /// Breast base width in cm
    #[arg(long)]
    breast_width: f64,

    /// Current size label, e.g. "Cup A" or "Ngực phẳng"
    #[arg(long, default_value = "Cup A")]
    current_size: String,

    #[arg(long, value_enum, default_value = "natural")]
    look: DesiredLook,

    /// Upload size preset; overrides CONSULT_MAX_IMAGE_DIM
    #[arg(long, value_enum)]
    preset: Option<UploadPreset>,

    /// JPEG quality preset: low, medium, high, ultra or 1-100
    #[arg(short, long)]
    quality: Option<String>,

    /// Per-request timeout: 30s, 2m, ...
    #[arg(long)]
    timeout: Option<String>,

    /// Also generate simulations into --out
    #[arg(long)]
    simulate: bool,

    /// Options to simulate (default: both)
    #[arg(long = "option", value_enum)]
    options: Vec<OptionId>,

    /// Styles to simulate (default: photorealistic)
    #[arg(long = "style", value_enum)]
    styles: Vec<RenderStyle>,

    /// Angles to simulate (default: front)
    #[arg(long = "angle", value_enum)]
    angles: Vec<CameraAngle>,

    /// Directory for simulation images
    #[arg(short, long, default_value = "simulations")]
    out: PathBuf,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List a collection (or all)
    List {
        #[arg(long, value_enum)]
        kind: Option<CatalogKind>,
        #[arg(long)]
        json: bool,
    },
    /// Insert or replace a row from a JSON file
    Upsert {
        #[arg(long, value_enum)]
        kind: CatalogKind,
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a row by id
    Delete {
        #[arg(long, value_enum)]
        kind: CatalogKind,
        #[arg(long)]
        id: String,
    },
    /// Upload an image and print the URL to put in a row
    Upload {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct Credentials {
    #[arg(long)]
    email: String,
    /// Falls back to CONSULT_ADMIN_PASSWORD
    #[arg(long, env = "CONSULT_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ConsultConfig::from_env().map_err(anyhow::Error::msg)?;
    match run(cli.command, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(consult) = e.downcast_ref::<ConsultError>() {
                error!(category = consult.category(), error = %consult, "command failed");
                eprintln!("{}", consult.user_message());
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("implant_consult=info,consult=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(command: Command, config: ConsultConfig) -> Result<()> {
    match command {
        Command::Analyze(args) => analyze(args, config).await,
        Command::Catalog(command) => catalog(command, &config).await,
        Command::Login(creds) => {
            let gate = auth_service(&config)?.login(&creds.email, &creds.password).await?;
            let session = gate.require()?;
            println!("Đăng nhập thành công: {}", session.user.email.as_deref().unwrap_or(&session.user.id));
            Ok(())
        }
        Command::Signup(creds) => {
            match auth_service(&config)?.signup(&creds.email, &creds.password).await? {
                SignupOutcome::SignedIn(session) => println!("Đã tạo tài khoản {}", session.user.id),
                SignupOutcome::ConfirmationRequired { email } => {
                    println!("Vui lòng kiểm tra email {} để xác nhận tài khoản.", email)
                }
            }
            Ok(())
        }
        Command::Logout => {
            let auth = auth_service(&config)?;
            let gate = auth.restore().await?;
            auth.logout(gate).await?;
            println!("Đã đăng xuất.");
            Ok(())
        }
        Command::Whoami => {
            let gate = auth_service(&config)?.restore().await?;
            match gate.session() {
                Some(session) if gate.is_unlocked() => println!(
                    "{} ({})",
                    session.user.email.as_deref().unwrap_or("-"),
                    session.user.id
                ),
                _ => println!("Chưa đăng nhập."),
            }
            Ok(())
        }
    }
}

async fn analyze(args: AnalyzeArgs, mut config: ConsultConfig) -> Result<()> {
    if let Some(preset) = args.preset {
        config.max_image_dim = preset.max_long_side();
    }
    if let Some(quality) = &args.quality {
        config.jpeg_quality = parse_quality(quality)?;
    }
    if let Some(timeout) = &args.timeout {
        config.ai_timeout_secs = parse_duration(timeout)?;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let ai = GeminiClient::from_config(&config)?;
    let session = ConsultationSession::builder()
        .with_ai(Arc::new(ai))
        .with_preprocessor(ImagePreprocessor::new(config.max_image_dim, config.jpeg_quality))
        .allow_placeholder(config.placeholder_on_quota)
        .build()?;

    let photo = tokio::fs::read(&args.photo)
        .await
        .with_context(|| format!("reading {}", args.photo.display()))?;
    let metrics = PatientMetrics {
        height: args.height,
        weight: args.weight,
        age: args.age,
        breast_width: args.breast_width,
        current_size: args.current_size.clone(),
        desired_look: args.look,
    };

    let result = session.submit(metrics, &photo).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }

    if !args.simulate {
        return Ok(());
    }
    if result.is_placeholder() {
        return Err(anyhow!("simulations need a real analysis; the recommendation is demo data"));
    }

    let options = or_default(args.options, &OptionId::ALL);
    let styles = or_default(args.styles, &[RenderStyle::Photorealistic]);
    let angles = or_default(args.angles, &[CameraAngle::Front]);
    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("creating {}", args.out.display()))?;

    for &option in &options {
        for &style in &styles {
            for &angle in &angles {
                let bytes = session.generate_simulation(option, style, angle).await?;
                let path = simulation_path(&args.out, option, style, angle, &bytes);
                tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), size = bytes.len(), "simulation saved");
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn or_default<T: Copy>(chosen: Vec<T>, default: &[T]) -> Vec<T> {
    if chosen.is_empty() { default.to_vec() } else { chosen }
}

fn simulation_path(dir: &Path, option: OptionId, style: RenderStyle, angle: CameraAngle, bytes: &[u8]) -> PathBuf {
    let ext = image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("bin");
    let option = match option {
        OptionId::First => "option1",
        OptionId::Second => "option2",
    };
    dir.join(format!("{}-{}-{}.{}", option, style.tag(), angle.tag(), ext))
}

fn print_analysis(result: &AnalysisResult) {
    if result.is_placeholder() {
        println!("⚠ Kết quả mẫu (hết quota hoặc chưa cấu hình API key), không dùng để tư vấn.");
    }
    for (label, option) in [("Phương án 1", &result.option1), ("Phương án 2", &result.option2)] {
        println!("{}: {}cc, {} ({})", label, option.volume, option.cup_size, option.style);
    }
    println!("\nPhân tích cơ thể:\n{}", result.body_analysis);
    println!("\nLý do:\n{}", result.reasoning);
    println!("\nGợi ý loại túi:\n{}", result.implants_type_suggestion);
}

async fn catalog(command: CatalogCommand, config: &ConsultConfig) -> Result<()> {
    let mut service = CatalogService::from_config(config)?;
    service.refresh().await?;

    match command {
        CatalogCommand::List { kind, json } => {
            let kinds = kind.map_or_else(|| CatalogKind::ALL.to_vec(), |k| vec![k]);
            for kind in kinds {
                let items = service.store().items(kind);
                if json {
                    let rows = items.iter().map(CatalogItem::to_json).collect::<Result<Vec<_>, _>>()?;
                    let mut doc = serde_json::Map::new();
                    doc.insert(kind.table().to_string(), serde_json::Value::Array(rows));
                    println!("{}", serde_json::to_string_pretty(&doc)?);
                } else {
                    println!("[{}] {} mục", kind, items.len());
                    for item in items {
                        println!("  {:<16} {}", item.id(), item.name());
                    }
                }
            }
        }
        CatalogCommand::Upsert { kind, file } => {
            let gate = auth_service(config)?.restore().await?;
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let item = CatalogItem::from_json(kind, &text)?;
            let outcome = service.save(&gate, item).await?;
            println!("{:?}", outcome);
        }
        CatalogCommand::Delete { kind, id } => {
            let gate = auth_service(config)?.restore().await?;
            let removed = service.delete(&gate, kind, &id).await?;
            println!("{}", if removed { "Đã xoá." } else { "Không tìm thấy, không có gì thay đổi." });
        }
        CatalogCommand::Upload { file } => {
            let gate = auth_service(config)?.restore().await?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("image");
            println!("{}", service.upload_image(&gate, name, bytes).await?);
        }
    }
    Ok(())
}

fn auth_service(config: &ConsultConfig) -> Result<AuthService> {
    let backend = SupabaseClient::from_config(config)?;
    Ok(AuthService::new(backend, SessionStore::new(config.session_path())))
}

/// Parse duration string like "30s", "2m", "1h" into seconds
fn parse_duration(duration: &str) -> Result<u64> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    let Some((split, unit)) = duration.char_indices().last() else {
        return Err(anyhow!("Invalid duration format: {}", duration));
    };
    let num_str = &duration[..split];
    let num: u64 = num_str
        .parse()
        .map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(anyhow!("Invalid duration unit: {}. Use 's', 'm' or 'h'", unit)),
    };
    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow!("Duration too large: {}", duration))
}

/// Parse quality preset into JPEG quality
fn parse_quality(quality: &str) -> Result<u8> {
    match quality.to_lowercase().as_str() {
        "low" => Ok(70),
        "medium" => Ok(85),
        "high" => Ok(92),
        "ultra" => Ok(95),
        _ => quality
            .parse::<u8>()
            .map_err(|_| anyhow!("Invalid quality preset: {}. Use: low, medium, high, ultra or 1-100", quality)),
    }
}
