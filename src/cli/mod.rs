use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address the HTTP API binds to.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Base URL of the Ollama server.
    #[arg(long, env = "OLLAMA_BASE_URL", default_value = "http://localhost:11434")]
    pub ollama_base_url: String,

    /// Model name used for generation.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    pub ollama_model: String,

    /// Timeout in seconds for the structured invocation path. The raw
    /// fallback path uses its own fixed 30 second timeout.
    #[arg(long, env = "OLLAMA_TIMEOUT", default_value = "300")]
    pub ollama_timeout: u64,

    /// Temperature applied when a request does not specify one.
    #[arg(long, env = "DEFAULT_TEMPERATURE", default_value = "0.7")]
    pub default_temperature: f32,

    /// Conversation window, in user/assistant exchanges, fed back to the
    /// model on each turn. Older messages stay stored but leave the prompt.
    #[arg(long, env = "MEMORY_WINDOW", default_value = "10")]
    pub memory_window: usize,

    /// Token cap passed to the backend as num_predict.
    #[arg(long, env = "NUM_PREDICT", default_value = "1000")]
    pub num_predict: u32,
}
