use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use menukit_core::{Action, Cell, RawKind, ViewerId};
use menukit_engine::{preset, GridSurfaces, Menu, MenuEngine, RawInteraction};

#[derive(Parser, Debug)]
#[command(about = "Scripted game-selector session driving the menu engine", version)]
struct Args {
    /// Extra ticks to pump after the scripted interactions.
    #[arg(long, default_value_t = 8)]
    ticks: u64,

    /// Write the engine event log as pretty-printed JSON.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    event_log: Option<PathBuf>,
}

const GAMES: [&str; 12] = [
    "game.skywars",
    "game.bedwars",
    "game.parkour",
    "game.duels",
    "game.murder",
    "game.build",
    "game.bridge",
    "game.uhc",
    "game.tag",
    "game.quake",
    "game.arcade",
    "game.paintball",
];

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let provider = GridSurfaces::new();
    let engine = MenuEngine::new(Box::new(provider.clone()));

    let selector = build_selector(&engine);
    let alice = ViewerId::new("alice");
    let bob = ViewerId::new("bob");

    engine.open(&alice, &selector);
    engine.open(&bob, &selector);
    engine.tick();

    // Alice drills into the first game lobby, watches the beacon blink for
    // a few ticks, then backs out while Bob pages through the catalog.
    click(&engine, &selector, &alice, 10);
    engine.run_ticks(4);
    let lobby = engine.menu_of(&alice).context("alice lost her menu")?;
    click(&engine, &lobby, &alice, 8);
    engine.tick();

    click(&engine, &selector, &bob, 26);
    click(&engine, &selector, &bob, 18);
    engine.run_ticks(args.ticks);

    print_menu(&engine, &selector);
    info!("session finished at tick {}", engine.now());

    if let Some(path) = args.event_log.as_deref() {
        write_event_log(path, &engine.events())?;
        info!("event log written to {}", path.display());
    }
    Ok(())
}

/// Three-row selector: framed filler, one game per interior slot across
/// two pages, pagination on the bottom row.
fn build_selector(engine: &MenuEngine) -> Menu {
    let selector = Menu::new(3, 9, "Game Selector");
    selector.add_preset(preset::fill_frame(Cell::new(preset::icons::FILLER)));
    selector.add_preset(preset::pagination_row(2, false, &[Action::Click]));

    let interior: Vec<i32> = (10..17).collect();
    for (index, game) in GAMES.iter().enumerate() {
        let slot = selector.absolute(
            index as i32 / interior.len() as i32,
            interior[index % interior.len()],
        );
        let lobby = build_lobby(engine, game);
        selector.set_cell_and_handler(
            slot,
            Cell::new(*game),
            Action::Click,
            Rc::new(move |engine, _, ctx| {
                ctx.set_cancelled(true);
                engine.open_sub_menu(ctx.viewer(), &lobby);
                Ok(())
            }),
        );
    }
    selector
}

fn build_lobby(engine: &MenuEngine, game: &str) -> Menu {
    let lobby = Menu::new(1, 9, format!("Lobby: {game}"));
    lobby.add_preset(preset::fill(Cell::new(preset::icons::FILLER)));
    lobby.add_preset(preset::back(8, &[Action::Click]));

    let game = game.to_string();
    lobby.set_cell_and_handler(
        4,
        Cell::new("lobby.join"),
        Action::Click,
        Rc::new(move |engine, _, ctx| {
            ctx.set_cancelled(true);
            engine.log_event(format!("joined game={game} viewer={}", ctx.viewer()));
            Ok(())
        }),
    );
    engine.play_animation(
        &lobby,
        0,
        None,
        2,
        Rc::new(|ctx| {
            Ok(Cell::new(if ctx.interval % 2 == 0 {
                "beacon.lit"
            } else {
                "beacon.dim"
            }))
        }),
    );
    lobby
}

fn click(engine: &MenuEngine, menu: &Menu, viewer: &ViewerId, slot: i32) -> bool {
    let Some(surface) = menu.surface_id() else {
        return false;
    };
    engine.handle_raw(&RawInteraction {
        viewer: viewer.clone(),
        surface,
        slot,
        kind: RawKind::Primary,
        shift: false,
    })
}

fn print_menu(engine: &MenuEngine, menu: &Menu) {
    let snapshot = engine.snapshot(menu);
    println!(
        "{} (page {} of {}..={}) viewers: {}",
        snapshot.title,
        snapshot.page,
        snapshot.min_page,
        snapshot.max_page,
        snapshot.viewers.join(", ")
    );
    let columns = menu.columns();
    for row in 0..menu.rows() {
        let line: Vec<String> = (row * columns..(row + 1) * columns)
            .map(|slot| {
                snapshot
                    .cells
                    .get(&slot)
                    .cloned()
                    .unwrap_or_else(|| ".".to_string())
            })
            .collect();
        println!("  {}", line.join(" | "));
    }
}

fn write_event_log(path: &Path, events: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(events).context("serializing event log")?;
    fs::write(path, json).with_context(|| format!("writing event log to {}", path.display()))?;
    Ok(())
}
