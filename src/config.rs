use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "OpenAI-compatible gateway for a local LLM runtime")]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8081)]
    pub port: u16,

    /// Path to the model file. Without one the gateway serves mock responses.
    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Number of layers to offload to GPU (-1 for all).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub gpu_layers: i32,

    /// Context window size in tokens.
    #[arg(long, default_value_t = 2048)]
    pub context_window: u32,
}

/// Runtime construction options, consumed once at boot.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub gpu_layers: i32,
    pub context_window: u32,
}

impl From<&Args> for RuntimeOptions {
    fn from(args: &Args) -> Self {
        Self {
            gpu_layers: args.gpu_layers,
            context_window: args.context_window,
        }
    }
}
