use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use redmask::api::{isolate_video, DEFAULT_OUTPUT};
use redmask::{PipelineConfig, PipelineError, RunReport};

/// 分离视频中的红色物体，输出原图与黑白掩膜并排的对比视频
#[derive(Parser, Debug)]
#[command(name = "redmask", version, long_about = None)]
struct Args {
    /// 输入视频路径
    input: Option<PathBuf>,

    /// 输出视频路径（MJPG/AVI）
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn run(args: Args) -> Result<RunReport, PipelineError> {
    let input = args.input.ok_or(PipelineError::MissingArgument("input video path"))?;
    info!("{} → {}", input.display(), args.output.display());
    isolate_video(&input, &args.output, PipelineConfig::default())
}

fn main() -> ExitCode {
    let args = Args::parse();
    redmask::init_logging();

    match run(args) {
        Ok(report) => {
            info!(
                "Done: {} frames at {}x{}",
                report.frames_written, report.output_width, report.output_height
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
