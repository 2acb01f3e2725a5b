use clap::Parser;
use std::path::PathBuf;

use cherrygrove_core::{run, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(
    name = "cherrygrove",
    version,
    about = "Trainer party randomiser for extracted HGSS-engine ROM dumps"
)]
struct Args {
    /// Directory holding the extracted dump (trainer_party/, trainer_data/,
    /// mondata/, name tables and pool files).
    #[arg(long)]
    input: PathBuf,

    /// Directory to write the per-seed output folder into.
    #[arg(long)]
    output: PathBuf,

    #[arg(long)]
    seed: u64,

    /// Grow or trim boss and rival rosters to the target size.
    #[arg(long, default_value_t = true)]
    adjust_boss_teams: bool,

    /// Target roster size for bosses (1-6).
    #[arg(long, default_value_t = 6)]
    boss_team_size: u8,

    /// Keep early bosses and rival battles at story-sized rosters.
    #[arg(long, default_value_t = false)]
    scale_boss_teams: bool,

    /// Pick substitutes near the original's base stat total instead of
    /// fully at random.
    #[arg(long, default_value_t = true)]
    use_bst: bool,

    /// Randomise the rosters of ordinary trainers.
    #[arg(long, default_value_t = true)]
    randomize_trainers: bool,

    #[arg(long, default_value_t = false)]
    mimics: bool,

    #[arg(long, default_value_t = false)]
    pivots: bool,

    #[arg(long, default_value_t = false)]
    fulcrums: bool,

    /// Draw a fresh random type per gym and persist the assignment for
    /// later pipeline stages.
    #[arg(long, default_value_t = false)]
    randomize_gym_types: bool,

    /// Theme every gym trainer's substitutions around the gym's type.
    #[arg(long, default_value_t = false)]
    theme_gyms: bool,

    /// Write the spoiler log next to the output dump.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.boss_team_size < 1 || args.boss_team_size > 6 {
        eprintln!("Error: boss team size must be between 1 and 6");
        std::process::exit(1);
    }

    let settings = RandomiserSettings {
        seed: args.seed,
        adjust_boss_teams: args.adjust_boss_teams,
        boss_team_size: args.boss_team_size,
        scale_boss_teams: args.scale_boss_teams,
        use_bst: args.use_bst,
        randomize_trainers: args.randomize_trainers,
        use_mimics: args.mimics,
        use_pivots: args.pivots,
        use_fulcrums: args.fulcrums,
        randomize_gym_types: args.randomize_gym_types,
        theme_gyms: args.theme_gyms,
        debug: args.debug,
        input_path: args.input,
        output_path: args.output,
    };

    if let Err(err) = run(settings) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
