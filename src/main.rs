use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use voxnotes::{
    llm, Config, FileSecretStore, LlmService, MicrophoneCapture, ObjectStore, Profile,
    RecordingSession, SecretStore, SessionConfig,
};

#[derive(Parser)]
#[command(name = "voxnotes", about = "Voice notes with live transcription")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/voxnotes")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone until Ctrl-C
    Record {
        /// Stream audio to the transcription service while recording
        #[arg(long)]
        transcribe: bool,
    },
    /// List stored recordings
    List,
    /// Post-process a recording's transcript with an LLM profile
    Process {
        /// Recording id
        recording: Uuid,
        /// Profile name
        profile: String,
    },
    /// Store an API key for a service (e.g. deepgram, openai, anthropic)
    SetKey { service: String, key: String },
    /// Create an LLM profile
    AddProfile {
        name: String,
        /// One of: openai, anthropic, custom
        service: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        system_prompt: Option<String>,
        /// Chat-completions URL, required for the custom service
        #[arg(long)]
        endpoint: Option<String>,
    },
}

fn build_profile(
    name: String,
    service: &str,
    model: Option<String>,
    system_prompt: Option<String>,
    endpoint: Option<String>,
) -> Result<Profile> {
    let service = match service {
        "openai" => LlmService::OpenAi,
        "anthropic" => LlmService::Anthropic,
        "custom" => LlmService::Custom,
        other => return Err(anyhow!("Unknown service '{}'", other)),
    };
    if service == LlmService::Custom && endpoint.is_none() {
        return Err(anyhow!("--endpoint is required for the custom service"));
    }

    let mut profile = Profile::new(name, service);
    if let Some(model) = model {
        profile.model = model;
    }
    if let Some(system_prompt) = system_prompt {
        profile.system_prompt = system_prompt;
    }
    profile.custom_endpoint = endpoint;

    Ok(profile)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|_| {
        info!("No config file at {}; using defaults", cli.config);
        Config::default()
    });

    let store = Arc::new(ObjectStore::open(ObjectStore::default_path())?);
    let secrets = Arc::new(FileSecretStore::open(FileSecretStore::default_path())?);

    match cli.command {
        Command::Record { transcribe } => {
            let mut session_config = SessionConfig::from_config(&config);
            if transcribe {
                session_config.transcription_enabled = true;
            }

            let mut session = RecordingSession::new(session_config, store, secrets);
            session.start(Box::new(MicrophoneCapture::new())).await?;

            info!("Recording... press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to wait for Ctrl-C")?;

            match session.stop().await? {
                Some(recording) => {
                    println!(
                        "Saved '{}': {:.1}s, {} chunks",
                        recording.title,
                        recording.duration_secs,
                        recording.chunks.len()
                    );
                    if let Some(transcript) = recording.transcript {
                        println!("Transcript:\n{}", transcript.raw_text);
                    }
                }
                None => println!("Nothing was recorded"),
            }
        }

        Command::List => {
            for recording in store.recordings() {
                println!(
                    "{}  {}  {:.1}s  {} chunks  transcript: {}",
                    recording.id,
                    recording.title,
                    recording.duration_secs,
                    recording.chunks.len(),
                    if recording.transcript.is_some() { "yes" } else { "no" }
                );
            }
        }

        Command::Process { recording, profile } => {
            let recording = store
                .recording(recording)
                .ok_or_else(|| anyhow!("No recording with id {}", recording))?;
            let transcript = recording
                .transcript
                .as_ref()
                .ok_or_else(|| anyhow!("Recording has no transcript"))?;
            let profile = store
                .profiles()
                .into_iter()
                .find(|p| p.name == profile)
                .ok_or_else(|| anyhow!("No profile named '{}'", profile))?;

            let result = llm::process_transcript(
                secrets.as_ref(),
                &profile,
                &transcript.raw_text,
                Some(recording.id),
            )
            .await
            .map_err(|e| anyhow!("{}", e))?;

            println!("{}", result.text);
            info!(
                "Processed with {} in {:.2}s",
                result.model, result.latency_secs
            );

            store.insert_result(result);
            store.save()?;
        }

        Command::SetKey { service, key } => {
            secrets.set(&service, &key)?;
            println!("Stored key for {}", service);
        }

        Command::AddProfile {
            name,
            service,
            model,
            system_prompt,
            endpoint,
        } => {
            let profile = build_profile(name, &service, model, system_prompt, endpoint)?;
            println!("Created profile '{}' ({})", profile.name, profile.id);
            store.upsert_profile(profile);
            store.save()?;
        }
    }

    Ok(())
}
