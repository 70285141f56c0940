//! mapedit - command-line front end for the map document edit core

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mapedit::{
    core::{alpha_to_waypoint, EntityId, EntityRef, WaypointId},
    edit::{clone_for_easier_difficulties, find_usages, OutputMode, VerbosityLevel},
    snapshot::DocumentSnapshot,
    EditorConfig, MapDocument,
};
use std::path::{Path, PathBuf};

/// Entity kind accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    House,
    HouseType,
    TaskForce,
    TeamType,
    Script,
    Trigger,
    Tag,
    AiTrigger,
    Waypoint,
    LocalVariable,
}

/// Verbosity level (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

#[derive(Parser)]
#[command(name = "mapedit")]
#[command(about = "Map document edit core - inspect and transform map snapshots", long_about = None)]
struct Cli {
    /// Editor config file (JSON); built-in defaults when omitted
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output verbosity (0=silent, 1=minimal, 2=normal, 3=verbose)
    #[arg(long, short = 'v', global = true, default_value = "normal")]
    verbosity: VerbosityArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print collection counts of a document
    Summary {
        /// Document snapshot (.json)
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,
    },

    /// List every place an entity is referenced
    Usages {
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Kind of the entity to look up
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Entity key: 8-digit id, waypoint number or letters, or variable index
        #[arg(long)]
        key: String,
    },

    /// Split a Hard AI trigger into Hard/Medium/Easy versions (not undoable)
    CloneDifficulty {
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Key of the source AI trigger
        #[arg(long)]
        ai: String,

        /// Write the result here instead of overwriting DOCUMENT
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn parse_id(key: &str) -> anyhow::Result<EntityId> {
    EntityId::parse_key(key).ok_or_else(|| anyhow!("'{key}' is not a numeric entity key"))
}

fn parse_ref(kind: KindArg, key: &str) -> anyhow::Result<EntityRef> {
    let target = match kind {
        KindArg::House => EntityRef::House(parse_id(key)?),
        KindArg::HouseType => EntityRef::HouseType(parse_id(key)?),
        KindArg::TaskForce => EntityRef::TaskForce(parse_id(key)?),
        KindArg::TeamType => EntityRef::TeamType(parse_id(key)?),
        KindArg::Script => EntityRef::Script(parse_id(key)?),
        KindArg::Trigger => EntityRef::Trigger(parse_id(key)?),
        KindArg::Tag => EntityRef::Tag(parse_id(key)?),
        KindArg::AiTrigger => EntityRef::AiTrigger(parse_id(key)?),
        KindArg::Waypoint => {
            let n = key
                .parse::<u32>()
                .ok()
                .or_else(|| alpha_to_waypoint(key))
                .ok_or_else(|| anyhow!("'{key}' is not a waypoint number"))?;
            EntityRef::Waypoint(WaypointId::new(n))
        }
        KindArg::LocalVariable => EntityRef::LocalVariable(
            key.parse()
                .with_context(|| format!("'{key}' is not a local variable index"))?,
        ),
    };
    Ok(target)
}

fn load_document(path: &Path, config: EditorConfig, verbosity: VerbosityLevel) -> anyhow::Result<MapDocument> {
    let snapshot = DocumentSnapshot::load_from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let mut doc = snapshot.into_document(config);
    doc.logger.set_verbosity(verbosity);
    doc.logger.set_output_mode(OutputMode::Stdout);
    Ok(doc)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity.0;

    let config = match &cli.config {
        Some(path) => EditorConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Summary { document } => {
            let doc = load_document(&document, config, verbosity)?;
            println!("{}", doc.summary());
        }

        Commands::Usages {
            document,
            kind,
            key,
        } => {
            let doc = load_document(&document, config, verbosity)?;
            let target = parse_ref(kind, &key)?;
            if !doc.contains(target) {
                bail!("{target} does not exist in {}", document.display());
            }
            let usages = find_usages(&doc, target);
            if usages.is_empty() {
                println!("{target} is not used");
            }
            for usage in usages {
                println!("{usage}");
            }
        }

        Commands::CloneDifficulty {
            document,
            ai,
            output,
        } => {
            let mut doc = load_document(&document, config, verbosity)?;
            // The clone engine reports its own summary through the logger
            clone_for_easier_difficulties(&mut doc, parse_id(&ai)?)?;
            let out = output.unwrap_or(document);
            DocumentSnapshot::new(doc)
                .save_to_file(&out)
                .with_context(|| format!("writing {}", out.display()))?;
        }
    }

    Ok(())
}
