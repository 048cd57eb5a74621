use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use immortal_sect::core::world::{Game, Snapshot, TurnSummary};
use immortal_sect::data::rules::load_game_rules;
use immortal_sect::persistence::{JsonSlotStore, SaveRepository, SqliteSlotStore};
use immortal_sect::simulation::events::Event;
use immortal_sect::simulation::npc::NpcRole;

const HELP: &str = "Commands: status | dispatch <mining|recruiting> <n> | recall <mining|recruiting> <n> | upgrade <vault|cave> | cultivate | meditate | refine <n> | use <item> | npc <master|merchant|friend> <action> [item] | talk <npc> <text> | choose <option> | end | save <slot> | load <slot> | delete <slot> | slots | log | help | quit";

#[derive(Debug)]
struct Options {
    saves: PathBuf,
    store: StoreKind,
    seed: u64,
    rules: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Json,
    Sqlite,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let options = parse_options(env::args().skip(1).collect());
    let rules = load_game_rules(options.rules.as_deref());

    let mut repo: Box<dyn SaveRepository> = match options.store {
        StoreKind::Json => {
            let store = JsonSlotStore::new(&options.saves);
            tracing::info!(target: "sect::persistence", dir = %store.dir().display(), "store.opened");
            Box::new(store)
        }
        StoreKind::Sqlite => {
            if let Err(err) = std::fs::create_dir_all(&options.saves) {
                eprintln!("Failed to create {}: {}", options.saves.display(), err);
                std::process::exit(1);
            }
            match SqliteSlotStore::open(options.saves.join("saves.db")) {
                Ok(store) => Box::new(store),
                Err(err) => {
                    eprintln!("Failed to open save database: {}", err);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut game = Game::with_rules(options.seed, rules);
    println!("The sect gate opens. Type 'help' for commands.");
    print_snapshot(&game.snapshot());
    if let Some(event) = game.begin_turn() {
        print_event(&event);
    }

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();
        let had_event = game.pending_event().is_some();

        match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "status" => print_snapshot(&game.snapshot()),
            "log" => {
                for line in game.state().message_log.recent(20) {
                    println!("  {}", line);
                }
            }
            "choose" => match parts.next().map(str::parse::<u8>) {
                Some(Ok(option)) => match game.resolve_event(option) {
                    Ok(resolution) => {
                        println!("{}", resolution.message);
                        if let Some(role) = resolution.hand_off {
                            report(game.talk(role, "Master, please help me."));
                        }
                    }
                    Err(err) => println!("! {}", err),
                },
                _ => println!("Usage: choose <option>"),
            },
            "end" => match game.end_turn() {
                Ok(summary) => print_turn(&summary),
                Err(err) => println!("! {}", err),
            },
            "talk" => {
                let role = parts.next().map(str::parse::<NpcRole>);
                let text = parts.collect::<Vec<_>>().join(" ");
                match role {
                    Some(Ok(role)) => report(game.talk(role, &text)),
                    Some(Err(err)) => println!("! {}", err),
                    None => println!("Usage: talk <npc> <text>"),
                }
            }
            "save" | "load" | "delete" => {
                let Some(Ok(slot)) = parts.next().map(str::parse::<u8>) else {
                    println!("Usage: {} <slot 1-3>", cmd);
                    continue;
                };
                let result = match cmd.as_str() {
                    "save" => game.save_to(repo.as_mut(), slot),
                    "load" => game.load_from(repo.as_ref(), slot),
                    _ => game.delete_from(repo.as_mut(), slot),
                };
                match result {
                    Ok(()) => {
                        if let Some(line) = game.state().message_log.last() {
                            println!("{}", line);
                        }
                    }
                    Err(err) => println!("! {}", err),
                }
            }
            "slots" => match game.list_slots(repo.as_ref()) {
                Ok(slots) if slots.is_empty() => println!("No saves."),
                Ok(slots) => {
                    for summary in slots {
                        println!(
                            "  Slot {}: saved {}, turn {}",
                            summary.slot, summary.save_time, summary.game_time
                        );
                    }
                }
                Err(err) => println!("! {}", err),
            },
            _ => match game.execute(trimmed) {
                Ok(outcome) => println!("{}", outcome.message),
                Err(err) => println!("! {}", err),
            },
        }

        if (!had_event || cmd == "load") && cmd != "end" {
            if let Some(event) = game.pending_event() {
                print_event(event);
            }
        }
    }
}

fn report(result: Result<String, immortal_sect::SimError>) {
    match result {
        Ok(line) => println!("{}", line),
        Err(err) => println!("! {}", err),
    }
}

fn parse_options(args: Vec<String>) -> Options {
    let mut options = Options {
        saves: PathBuf::from("./saves"),
        store: StoreKind::Json,
        seed: 0,
        rules: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--saves" => {
                if let Some(value) = iter.next() {
                    options.saves = PathBuf::from(value);
                }
            }
            "--store" => match iter.next().map(String::as_str) {
                Some("sqlite") => options.store = StoreKind::Sqlite,
                Some("json") => options.store = StoreKind::Json,
                other => eprintln!("Unknown store {:?}, using json", other),
            },
            "--seed" => {
                if let Some(value) = iter.next() {
                    match value.parse() {
                        Ok(seed) => options.seed = seed,
                        Err(_) => eprintln!("Invalid seed {}, using entropy", value),
                    }
                }
            }
            "--rules" => {
                if let Some(value) = iter.next() {
                    options.rules = Some(PathBuf::from(value));
                }
            }
            _ => {}
        }
    }
    options
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("== {} | turn {} ==", snapshot.calendar, snapshot.turn);
    println!(
        "{} | {} ({:.0}%) | cultivation {}{}",
        snapshot.cultivator_name,
        snapshot.realm.name,
        snapshot.realm.progress * 100.0,
        snapshot.cultivation,
        snapshot
            .realm
            .next_threshold
            .map(|next| format!(" / {}", next))
            .unwrap_or_default()
    );
    println!(
        "Spiritual power {}/{} | Health {}/{}",
        snapshot.spiritual_power.0,
        snapshot.spiritual_power.1,
        snapshot.health.0,
        snapshot.health.1
    );
    let d = &snapshot.disciples;
    println!(
        "Spirit stones {}/{} (vault lv {}) | Disciples {}/{} (cave lv {}): mining {}, recruiting {}, idle {}",
        snapshot.wealth.0,
        snapshot.wealth.1,
        snapshot.vault_level,
        d.total,
        d.capacity,
        snapshot.cave_level,
        d.mining,
        d.recruiting,
        d.idle
    );
    if !snapshot.buffs.is_empty() {
        println!("Next cultivation x{:.2}", snapshot.cultivation_multiplier);
        let buffs: Vec<String> = snapshot
            .buffs
            .iter()
            .map(|(name, multiplier, remaining)| {
                format!("{} x{} ({} left)", name, multiplier, remaining)
            })
            .collect();
        println!("Buffs: {}", buffs.join(", "));
    }
    if !snapshot.inventory.is_empty() {
        let items: Vec<String> = snapshot
            .inventory
            .iter()
            .map(|(name, count)| format!("{} x{}", name, count))
            .collect();
        println!("Inventory: {}", items.join(", "));
    }
    if !snapshot.npcs.is_empty() {
        println!("Nearby: {}", snapshot.npcs.join(", "));
    }
    if let Some(title) = &snapshot.pending_event {
        println!("Pending event: {}", title);
    }
}

fn print_event(event: &Event) {
    println!("*** {} ***", event.title);
    println!("{}", event.description);
    for option in &event.options {
        println!("  [{}] {}", option.id, option.text);
    }
    println!("Answer with: choose <option>");
}

fn print_turn(summary: &TurnSummary) {
    let settlement = &summary.settlement;
    println!(
        "Turn {} closes: mined {} stones ({} stored), {} recruiting rolls, {} new disciples.",
        settlement.turn.saturating_sub(1),
        settlement.mining.produced,
        settlement.mining.stored,
        settlement.recruitment.rolls,
        settlement.recruitment.recruited
    );
    if settlement.recruitment.capacity_reached {
        println!("The cave is full.");
    }
    if let Some(event) = &summary.event {
        print_event(event);
    }
}
