use anyhow::Result;
use engenheiro::config::AppConfig;
use engenheiro::llm::client::GeminiClient;
use engenheiro::messages::GenerationMode;
use engenheiro::report::{bold_runs, FilterKey, Section};
use engenheiro::session::ChatSession;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engenheiro=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = dotenvy::dotenv();

    info!("Starting Engenheiro expert assistant");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    let client = GeminiClient::new(config.generation.clone())?;
    let session = ChatSession::new(Arc::new(client));

    #[cfg(feature = "audio-io")]
    let mut live: Option<engenheiro::live::LiveSession> = None;

    // Welcome report
    for message in session.log().get_all() {
        render_report(&session.visible_report(&message.text));
    }
    print_help();

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let (mode, prompt) = match input {
            "/sair" => break,
            "/ajuda" => {
                print_help();
                continue;
            }
            _ if input.starts_with("/filtro ") => {
                toggle_filter(&session, input.trim_start_matches("/filtro ").trim());
                continue;
            }
            "/voz" => {
                #[cfg(feature = "audio-io")]
                {
                    start_voice(&mut live, &config);
                }
                #[cfg(not(feature = "audio-io"))]
                println!("Compilado sem suporte de áudio.");
                continue;
            }
            "/encerrar" => {
                #[cfg(feature = "audio-io")]
                if let Some(mut session) = live.take() {
                    session.disconnect();
                    println!("Sessão de voz encerrada.");
                }
                continue;
            }
            _ if input.starts_with("/pensar ") => (
                GenerationMode::Thinking,
                input.trim_start_matches("/pensar ").trim(),
            ),
            _ if input.starts_with("/buscar ") => (
                GenerationMode::Search,
                input.trim_start_matches("/buscar ").trim(),
            ),
            prompt => (GenerationMode::Plain, prompt),
        };

        match session.submit(prompt, Vec::new(), mode).await {
            Ok(id) => {
                if let Some(message) = session.log().get(id) {
                    render_report(&session.visible_report(&message.text));
                }
                render_visual(&session);
            }
            Err(e) => println!("{}", e.user_message()),
        }
    }

    #[cfg(feature = "audio-io")]
    if let Some(mut session) = live.take() {
        session.disconnect();
    }

    info!("Shutting down");
    Ok(())
}

fn print_help() {
    println!("Comandos: /pensar <consulta>  /buscar <consulta>  /filtro <nome>  /voz  /encerrar  /sair");
}

fn toggle_filter(session: &ChatSession, name: &str) {
    let key = FilterKey::ALL
        .iter()
        .copied()
        .find(|key| key.label().eq_ignore_ascii_case(name));

    match key {
        Some(key) => {
            let active = session.toggle_filter(key);
            println!(
                "Filtro {}: {}",
                key.label(),
                if active { "ativo" } else { "inativo" }
            );
        }
        None => {
            let labels: Vec<_> = FilterKey::ALL.iter().map(|k| k.label()).collect();
            println!("Filtro desconhecido. Opções: {}", labels.join(", "));
        }
    }
}

fn render_report(sections: &[Section]) {
    for section in sections {
        println!();
        if !section.title.is_empty() {
            println!("═══ {} ═══", section.title);
        }
        for line in section.content.lines() {
            let rendered: String = bold_runs(line)
                .into_iter()
                .map(|run| {
                    if run.emphasized {
                        format!("\x1b[1m{}\x1b[0m", run.text)
                    } else {
                        run.text
                    }
                })
                .collect();
            println!("{}", rendered);
        }
    }
    println!();
}

fn render_visual(session: &ChatSession) {
    let visual = session.visual_data();
    if let Some(table) = &visual.table {
        println!("── Dados dimensionais ──");
        println!("{}", table);
        println!();
    }
    if visual.svg.is_some() {
        println!("(Esboço vetorial disponível no painel visual.)");
    }
}

#[cfg(feature = "audio-io")]
fn start_voice(live: &mut Option<engenheiro::live::LiveSession>, config: &AppConfig) {
    use engenheiro::live::LiveSession;

    if live.as_ref().map(|s| s.is_connected()).unwrap_or(false) {
        println!("Sessão de voz já ativa.");
        return;
    }

    let mut session = LiveSession::new(config.live.clone());
    let result = session.connect(
        Arc::new(|text: &str| {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }),
        Arc::new(|| {
            println!("\n[sessão de voz encerrada]");
        }),
    );

    match result {
        Ok(()) => {
            println!("Sessão de voz ativa. Use /encerrar para terminar.");
            *live = Some(session);
        }
        Err(e) => println!("{}", e.user_message()),
    }
}
