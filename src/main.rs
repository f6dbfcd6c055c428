use std::io::Read;

use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use serde_json::Value;
use tracing::{error, info};

use model_harness::config::{Config, DEFAULT_CONFIG_FILE};
use model_harness::telemetry::init_telemetry;
use model_harness::{load_model_with, run};

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Loads the model once and answers a single request, printing the JSON result on stdout.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Do not load a model, the predictor receives no handle
    #[arg(long)]
    skip_load: bool,

    /// Request payload, read from stdin when omitted
    input: Option<String>,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            error!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == DEFAULT_CONFIG_FILE {
                Config::default().merge(args.opt_config)
            } else {
                init_telemetry("info");
                exit_err!(
                    1,
                    "Failed to read configuration file {} with error: {}",
                    args.config_file,
                    err
                );
            }
        }
    };
    init_telemetry(&config.log_level);
    info!(
        "Supported features: avx: {}, neon: {}, simd128: {}, f16c: {}",
        candle_core::utils::with_avx(),
        candle_core::utils::with_neon(),
        candle_core::utils::with_simd128(),
        candle_core::utils::with_f16c()
    );

    let raw = match args.input {
        Some(input) => input,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let model = if args.skip_load {
        None
    } else {
        match load_model_with(&config) {
            Ok(model) => Some(model),
            Err(err) => exit_err!(2, "Failed to load {}: {}", config.checkpoint, err),
        }
    };

    let prediction = match config.input_type.payload(&raw) {
        Ok(payload) => run(config.mode, &payload, model.as_ref()),
        Err(err) => err.into_prediction(),
    };

    let failed = prediction.contains_key("error");
    println!("{}", serde_json::to_string(&Value::Object(prediction))?);
    if failed {
        std::process::exit(1);
    }
    Ok(())
}
