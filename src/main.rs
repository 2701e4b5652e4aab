use anyhow::{anyhow, bail, Context, Result};
use std::env;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lesson_quiz::config::LoggingConfig;
use lesson_quiz::{
    log_system_event, Config, Difficulty, GenerationRequest, LLMService, RecordKind,
    SchemaDescriptor,
};

const USAGE: &str = "usage:
  lesson-quiz recover  <lesson|question> <topic> <easy|hard> [FILE]
  lesson-quiz generate <lesson|question> <topic> <easy|hard> <PROMPT_FILE>";

#[derive(Debug)]
enum Command {
    Recover { input: Option<String> },
    Generate { prompt_file: String },
}

#[derive(Debug)]
struct Invocation {
    command: Command,
    kind: RecordKind,
    request: GenerationRequest,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = setup_logging(&config.logging)?;
    config.validate()?;

    let invocation = parse_args(env::args().skip(1).collect())?;
    log_system_event!(startup, component = "cli", format!("{:?} {}", invocation.kind, invocation.request.topic));

    let service = LLMService::new_with_provider(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.provider,
        config.llm.model.clone(),
        config.recovery.clone(),
    );
    let schema = SchemaDescriptor::for_kind(invocation.kind);

    let content = match invocation.command {
        Command::Recover { input } => {
            let raw = read_input(input.as_deref()).await?;
            service.recover_only(&raw, &invocation.request, &schema)
        }
        Command::Generate { prompt_file } => {
            let prompt = tokio::fs::read_to_string(&prompt_file)
                .await
                .with_context(|| format!("reading prompt file {}", prompt_file))?;
            info!(provider = service.provider_name(), model = service.model_name(), "Generating content");
            service.generate(&invocation.request, &schema, None, &prompt).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&content)?);
    log_system_event!(shutdown, component = "cli", format!("strategy={} degraded={}", content.strategy, content.degraded));

    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Invocation> {
    let [command, kind, topic, difficulty, rest @ ..] = args.as_slice() else {
        bail!("{}", USAGE);
    };

    let kind: RecordKind = kind.parse()?;
    let difficulty: Difficulty = difficulty.parse()?;
    let request = GenerationRequest::new(topic.as_str(), difficulty)?;

    let command = match (command.as_str(), rest) {
        ("recover", []) => Command::Recover { input: None },
        ("recover", [file]) => Command::Recover { input: Some(file.clone()) },
        ("generate", [prompt_file]) => Command::Generate {
            prompt_file: prompt_file.clone(),
        },
        _ => return Err(anyhow!("{}", USAGE)),
    };

    Ok(Invocation { command, kind, request })
}

async fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading model output from {}", path)),
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            Ok(raw)
        }
    }
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info,lesson_quiz=debug"));

    // Console output goes to stderr so stdout carries only the JSON record
    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
    });

    let (file_layer, guard) = if config.file_enabled {
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });

        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "lesson-quiz.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_recover_from_stdin() {
        let invocation = parse_args(args(&["recover", "question", "Ownership", "easy"])).unwrap();
        assert!(matches!(invocation.command, Command::Recover { input: None }));
        assert_eq!(invocation.kind, RecordKind::Question);
        assert_eq!(invocation.request.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_parse_generate_requires_prompt_file() {
        assert!(parse_args(args(&["generate", "lesson", "Traits", "hard"])).is_err());
        let invocation = parse_args(args(&["generate", "lesson", "Traits", "hard", "prompt.txt"])).unwrap();
        assert!(matches!(invocation.command, Command::Generate { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(parse_args(args(&["recover", "essay", "Traits", "hard"])).is_err());
        assert!(parse_args(args(&["recover", "lesson", "Traits", "medium"])).is_err());
        assert!(parse_args(args(&["recover", "lesson", "  ", "easy"])).is_err());
        assert!(parse_args(args(&["recover"])).is_err());
    }
}
