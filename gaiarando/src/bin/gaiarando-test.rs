use anyhow::{bail, Context, Result};
use clap::Parser;
use gaiarando::randomize::{randomize_with_retries, Randomizer};
use gaiarando::settings::{
    parse_randomizer_settings, Difficulty, Goal, LogicMode, RandomizerSettings,
};
use gaiarando_game::GameData;
use log::{error, info};
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 100)]
    test_cycles: usize,

    #[arg(long, default_value_t = 0)]
    start_seed: u64,

    // Built-in world if not given.
    #[arg(long)]
    world: Option<PathBuf>,

    // JSON settings file; the flags below override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    logic_mode: Option<LogicMode>,

    #[arg(long)]
    goal: Option<Goal>,

    #[arg(long)]
    difficulty: Option<Difficulty>,

    #[arg(long)]
    output_spoilers: Option<PathBuf>,
}

fn load_settings(args: &Args) -> Result<RandomizerSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let settings_str = std::fs::read_to_string(path)
                .with_context(|| format!("unable to read {}", path.display()))?;
            parse_randomizer_settings(&settings_str)
                .with_context(|| format!("unable to parse {}", path.display()))?
        }
        None => RandomizerSettings::default(),
    };
    if let Some(logic_mode) = args.logic_mode {
        settings.logic_mode = logic_mode;
    }
    if let Some(goal) = args.goal {
        settings.goal = goal;
    }
    if let Some(difficulty) = args.difficulty {
        settings.difficulty = difficulty;
    }
    Ok(settings)
}

fn perform_test_cycle(
    game_data: &GameData,
    base_settings: &RandomizerSettings,
    seed: u64,
    output_dir: Option<&Path>,
) -> Result<()> {
    let settings = RandomizerSettings {
        seed,
        ..base_settings.clone()
    };
    let randomizer = Randomizer::new(game_data, &settings)?;
    let randomization = randomize_with_retries(game_data, &settings)?;
    randomizer
        .verify(&randomization)
        .with_context(|| format!("verification failed for seed {seed}"))?;
    info!(
        "Seed {seed}: succeeded on attempt {} with {} placements",
        randomization.attempt_num + 1,
        randomization.placement_log.len()
    );
    if let Some(dir) = output_dir {
        let path = dir.join(format!("spoiler-{seed}.json"));
        let spoiler_str = serde_json::to_string_pretty(&randomization.spoiler_log)?;
        std::fs::write(&path, spoiler_str)
            .with_context(|| format!("unable to write {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let game_data = match &args.world {
        Some(path) => GameData::load(path)?,
        None => GameData::builtin()?,
    };
    let settings = load_settings(&args)?;
    if let Some(dir) = &args.output_spoilers {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("unable to create {}", dir.display()))?;
    }

    let mut num_failed = 0;
    for test_cycle in 0..args.test_cycles {
        let seed = args.start_seed + test_cycle as u64;
        if let Err(e) =
            perform_test_cycle(&game_data, &settings, seed, args.output_spoilers.as_deref())
        {
            error!("Seed {seed}: {e:#}");
            num_failed += 1;
        }
    }
    info!(
        "{} of {} seeds succeeded",
        args.test_cycles - num_failed,
        args.test_cycles
    );
    if num_failed > 0 {
        bail!("{num_failed} seeds failed");
    }
    Ok(())
}
