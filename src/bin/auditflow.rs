use anyhow::{anyhow, bail, Context, Result};
use auditflow::asm::{ActorKind, Asm, AsmEvent, Endpoint};
use auditflow::config::Config;
use auditflow::core::{Event, State};
use auditflow::logging;
use auditflow::store::MachineKey;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "auditflow")]
#[command(about = "Inspect the audit workflow definition and stored machines")]
struct Cli {
    /// Configuration file (defaults to $AUDITFLOW_CONFIG or auditflow.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and validate the transition tables and the event-endpoint relation
    Validate,
    /// Endpoints that may raise an event, given as KIND/NAME or NAME
    Endpoints { event: String },
    /// Events an endpoint may raise
    Events { endpoint: String },
    /// Every (event, endpoint) pair
    Relation,
    /// Stored state and history of one machine instance
    State { kind: String, identity: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let asm = Asm::new().context("workflow definition is invalid")?;

    match cli.command {
        Command::Validate => {
            for kind in ActorKind::ALL {
                println!("{kind}: {} edges", edge_count(&asm, *kind));
            }
            println!("relation: {} pairs", asm.relation().len());
            for event in asm.relation().placeholder_only_events() {
                println!("warning: {event} is only raised by {}", Endpoint::Unimplemented);
            }
            println!("ok");
        }
        Command::Endpoints { event } => {
            let event = parse_event(&event)?;
            for endpoint in asm.relation().endpoints_for(&event) {
                println!("{endpoint}");
            }
        }
        Command::Events { endpoint } => {
            let endpoint = Endpoint::from_name(&endpoint)
                .ok_or_else(|| anyhow!("unknown endpoint {endpoint:?}"))?;
            for event in asm.relation().events_for(endpoint) {
                println!("{event}");
            }
        }
        Command::Relation => {
            for (event, endpoint) in asm.relation().pairs() {
                println!("{event}\t{endpoint}");
            }
        }
        Command::State { kind, identity } => {
            let kind = ActorKind::from_name(&kind.to_uppercase())
                .ok_or_else(|| anyhow!("unknown actor kind {kind:?}"))?;
            let key = MachineKey::new(kind, identity)?;
            let config = load_config(cli.config.as_ref())?;
            let store = config.storage.open();

            match store.load(&key).await? {
                None => println!(
                    "{key}: not created yet (initial state {})",
                    asm.initial_state(kind).name()
                ),
                Some(instance) => {
                    println!(
                        "{key}: {} (version {}, instance {})",
                        instance.state().name(),
                        instance.version(),
                        instance.instance_id()
                    );
                    if let Some(elapsed) = instance.history().duration() {
                        println!("  first to last transition: {}s", elapsed.as_secs());
                    }
                    for transition in instance.history().transitions() {
                        println!(
                            "  {}  {} --{}--> {}",
                            transition.timestamp.to_rfc3339(),
                            transition.from.name(),
                            transition.event.name(),
                            transition.to.name()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::load()?);
    };
    let mut config = Config::from_file(&path.to_string_lossy())?;
    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

fn edge_count(asm: &Asm, kind: ActorKind) -> usize {
    match kind {
        ActorKind::StateAuthority => asm.dos().len(),
        ActorKind::CountyAuthority => asm.county().len(),
        ActorKind::AuditBoard => asm.audit_board().len(),
    }
}

/// `KIND/NAME`, or a bare name that only one actor kind uses.
fn parse_event(input: &str) -> Result<AsmEvent> {
    if let Some((kind, name)) = input.split_once('/') {
        let kind = ActorKind::from_name(kind).ok_or_else(|| anyhow!("unknown actor kind {kind:?}"))?;
        return AsmEvent::from_name(kind, name)
            .ok_or_else(|| anyhow!("{kind} has no event {name:?}"));
    }

    let matches: Vec<AsmEvent> = AsmEvent::all().filter(|e| e.name() == input).collect();
    match matches.as_slice() {
        [event] => Ok(*event),
        [] => bail!("unknown event {input:?}"),
        _ => bail!("event {input:?} is ambiguous; qualify it as KIND/NAME"),
    }
}
