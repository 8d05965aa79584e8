use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use payslip_pdf::{AssetConfig, Error, OutputTarget, PayslipRecord, PayslipRenderer};

/// Render an employee payslip record (JSON) to PDF.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Payslip record as JSON, or `-` to read standard input
    input: PathBuf,

    /// Output PDF path
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for a timestamped `payslip_<id>_<time>.pdf`
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Directory holding `static/fonts` and `static/images`
    /// [default: $PAYSLIP_ASSETS_DIR or the working directory]
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn read_record(input: &Path) -> Result<PayslipRecord, Error> {
    if input.as_os_str() == "-" {
        let mut json = String::new();
        std::io::stdin().read_to_string(&mut json)?;
        PayslipRecord::from_json(&json)
    } else {
        let file = std::fs::File::open(input)?;
        PayslipRecord::from_reader(std::io::BufReader::new(file))
    }
}

fn run(args: Args) -> Result<PathBuf, Error> {
    let record = read_record(&args.input)?;

    let assets = args
        .assets
        .map(AssetConfig::new)
        .unwrap_or_else(AssetConfig::from_env);
    let fonts = payslip_pdf::shared_fonts(&assets.base_dir);
    let renderer = PayslipRenderer::new(fonts, &assets);

    let path = match args.output {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&args.out_dir)?;
            let now = chrono::Local::now().naive_local();
            let name = payslip_pdf::payslip_filename(&record.employee_id, now);
            args.out_dir.join(name)
        }
    };
    renderer.render(OutputTarget::File(&path), &record)?;
    Ok(path)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(args) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
